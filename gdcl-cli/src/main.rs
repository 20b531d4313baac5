use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gdcl_core::group::{dict_root, group_index, list_groups, resolve_group};
use gdcl_core::{SearchConfig, SearchResult, SearchSession};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

mod cmd;
mod config;

#[derive(Parser, Debug)]
#[command(
    name = "gdcl",
    about = "Command-line search for GoldenDict DSL dictionary groups",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search headwords in a dictionary group
    Search {
        /// Group to search (subdirectory of the dictionary root)
        #[arg(long)]
        group: Option<String>,
        /// Search keyword; omit for an interactive prompt loop
        #[arg(long)]
        keyword: Option<String>,
        /// Interpret the keyword as a regular expression
        #[arg(long, default_value_t = false)]
        regex: bool,
        /// Fold case when matching headwords
        #[arg(long, default_value_t = false)]
        case_insensitive: bool,
        /// Suppress dictionary headers, footers and the summary line
        #[arg(long, default_value_t = false)]
        no_header: bool,
        /// Markup spans to delete from entry bodies (regex)
        #[arg(long)]
        markup: Option<String>,
        /// Replacement for deleted markup spans
        #[arg(long)]
        markup_replace: Option<String>,
        /// Dictionary file names to skip (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Print the result envelope as JSON instead of streaming text
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Override the dictionary root directory
        #[arg(long)]
        dict_dir: Option<PathBuf>,
    },
    /// List available dictionary groups
    Groups {
        #[arg(long, default_value_t = false)]
        json: bool,
        #[arg(long)]
        dict_dir: Option<PathBuf>,
    },
    /// List dictionaries in a group with their display names
    Dicts {
        #[arg(long)]
        group: String,
        #[arg(long, default_value_t = false)]
        json: bool,
        #[arg(long)]
        dict_dir: Option<PathBuf>,
    },
    /// Fetch and play Forvo pronunciations
    Forvo {
        /// Use mp3 files instead of ogg
        #[arg(long, default_value_t = false)]
        mp3: bool,
        /// List all pronunciations
        #[arg(long, default_value_t = false)]
        list: bool,
        /// Print audio urls instead of playing
        #[arg(long, default_value_t = false)]
        urls: bool,
        /// Play all pronunciations without interaction
        #[arg(long, default_value_t = false)]
        play_all: bool,
        /// Save all audio files to disk
        #[arg(long, default_value_t = false)]
        save: bool,
        /// Language code (prompted for when omitted)
        lang: Option<String>,
        /// Word or phrase to pronounce (prompted for when omitted)
        word: Option<String>,
    },
}

#[derive(Serialize)]
struct GroupsEnvelope {
    root: String,
    groups: Vec<String>,
}

fn prompt(msg: &str) -> anyhow::Result<String> {
    println!("{}", msg);
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Pipes the rendered buffer through `less`; falls back silently when no
/// pager is available.
fn page(buffer: &str) {
    let child = Command::new("less").stdin(Stdio::piped()).spawn();
    match child {
        Ok(mut c) => {
            if let Some(stdin) = c.stdin.as_mut() {
                let _ = stdin.write_all(buffer.as_bytes());
            }
            let _ = c.wait();
        }
        Err(e) => eprintln!("[gdcl] pager unavailable: {}", e),
    }
}

fn run_query(
    cfg: &SearchConfig,
    root: &std::path::Path,
    group: &str,
    keyword: &str,
    exclude: &[String],
    json: bool,
) -> anyhow::Result<SearchResult> {
    let files = resolve_group(root, group, exclude)?;
    let session = SearchSession::new(cfg, group, files);
    let result = if json {
        // JSON mode: the envelope carries the rendered text, nothing streams
        session.run(keyword, std::io::sink())?
    } else {
        let stdout = std::io::stdout();
        session.run(keyword, stdout.lock())?
    };
    config::append_history(keyword);
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(result)
}

#[allow(clippy::too_many_arguments)]
fn cmd_search(
    group: Option<String>,
    keyword: Option<String>,
    regex: bool,
    case_insensitive: bool,
    no_header: bool,
    markup: Option<String>,
    markup_replace: Option<String>,
    mut exclude: Vec<String>,
    json: bool,
    dict_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let user = config::load();
    let root = dict_dir.unwrap_or_else(dict_root);

    let mut cfg = SearchConfig::default();
    if let Some(cs) = user.case_sensitive {
        cfg.case_sensitive = cs;
    }
    if case_insensitive {
        cfg.case_sensitive = false;
    }
    cfg.raw_regex = regex;
    if let Some(hf) = user.header_footer {
        cfg.header_footer = hf;
    }
    if no_header {
        cfg.header_footer = false;
    }
    if let Some(p) = markup.or(user.markup_pattern) {
        cfg.markup_pattern = p;
    }
    if let Some(r) = markup_replace.or(user.markup_replace) {
        cfg.markup_replacement = r;
    }
    if exclude.is_empty() {
        exclude = user.exclude;
    }

    let one_shot = keyword.is_some();
    let mut group = match group.or(user.default_group) {
        Some(g) => g,
        None => {
            let avail = list_groups(&root)
                .iter()
                .map(|g| format!("[{}]", g))
                .collect::<Vec<_>>()
                .join(", ");
            prompt(&format!(
                "  Please select a dictionary group to search from the following available groups:\n  {}",
                avail
            ))?
        }
    };

    let mut keyword = match keyword {
        Some(k) => k,
        None => prompt(&format!(
            "Enter a search term (currently searching in group [{}]):",
            group
        ))?,
    };

    loop {
        let result = run_query(&cfg, &root, &group, &keyword, &exclude, json)?;
        if one_shot {
            return Ok(());
        }

        if prompt("Display results in pager? (y/n)")? == "y" {
            page(&result.rendered);
        } else {
            println!("Search complete.");
        }

        keyword = prompt(&format!(
            "\nSearch again in [{}] or enter 'q' to quit, or 'g' to change group:",
            group
        ))?;
        if keyword == "q" {
            return Ok(());
        }
        if keyword == "g" {
            group = prompt(&format!(
                "Please select a new group to search in (current group is [{}])",
                group
            ))?;
            println!("Now searching in group [{}]", group);
            keyword = prompt("Please enter search term:")?;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Search {
            group,
            keyword,
            regex,
            case_insensitive,
            no_header,
            markup,
            markup_replace,
            exclude,
            json,
            dict_dir,
        } => cmd_search(
            group,
            keyword,
            regex,
            case_insensitive,
            no_header,
            markup,
            markup_replace,
            exclude,
            json,
            dict_dir,
        )?,
        Commands::Groups { json, dict_dir } => {
            let root = dict_dir.unwrap_or_else(dict_root);
            let groups = list_groups(&root);
            if json {
                let env = GroupsEnvelope {
                    root: root.to_string_lossy().to_string(),
                    groups,
                };
                println!("{}", serde_json::to_string_pretty(&env)?);
            } else {
                for g in groups {
                    println!("{}", g);
                }
            }
        }
        Commands::Dicts {
            group,
            json,
            dict_dir,
        } => {
            let root = dict_dir.unwrap_or_else(dict_root);
            let files = resolve_group(&root, &group, &[])
                .with_context(|| format!("resolving group [{}]", group))?;
            let infos = group_index(&files);
            if json {
                println!("{}", serde_json::to_string_pretty(&infos)?);
            } else {
                for i in infos {
                    println!("{}\t{}", i.name, i.path);
                }
            }
        }
        Commands::Forvo {
            mp3,
            list,
            urls,
            play_all,
            save,
            lang,
            word,
        } => {
            let user = config::load();
            let Some(key) = user.forvo_key else {
                bail!("forvo_key not set in {}", config::config_dir().join("config.json").display());
            };
            cmd::forvo::run(
                cmd::forvo::ForvoArgs {
                    mp3,
                    list,
                    urls,
                    play_all,
                    save_all: save,
                    lang,
                    word,
                },
                &key,
            )?;
        }
    }
    Ok(())
}
