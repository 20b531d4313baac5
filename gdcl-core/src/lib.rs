//! Search engine for GoldenDict DSL dictionary collections.
//!
//! A group of compressed `.dsl.dz` sources is streamed per query: each file
//! is gunzipped, decoded from UTF-16LE, scanned for headwords matching an
//! anchored pattern, and the tab-indented entry bodies are emitted with DSL
//! markup stripped. Results are mirrored to a sink as they are found and
//! returned as one aggregated buffer with per-dictionary counts.

pub mod aggregate;
pub mod decoder;
pub mod error;
pub mod group;
pub mod markup;
pub mod scanner;

use crate::aggregate::ResultAggregator;
use crate::decoder::DictionarySource;
use crate::error::DslError;
use crate::markup::{MarkupStripper, DEFAULT_MARKUP_PATTERN};
use crate::scanner::EntryScanner;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Immutable per-session configuration. Constructed by the caller (config
/// file / flags) and passed into each `SearchSession`; nothing here is
/// ambient or shared.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Exact-case matching when true (the historical default).
    pub case_sensitive: bool,
    /// Treat the keyword as a regular expression instead of a literal
    /// prefix. Off by default so terms like `c++` search literally.
    pub raw_regex: bool,
    /// Render dictionary headers, footers and the group summary.
    pub header_footer: bool,
    /// Markup spans to delete from entry bodies; empty keeps markup.
    pub markup_pattern: String,
    pub markup_replacement: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            case_sensitive: true,
            raw_regex: false,
            header_footer: true,
            markup_pattern: DEFAULT_MARKUP_PATTERN.to_string(),
            markup_replacement: String::new(),
        }
    }
}

/// A compiled headword query, always anchored to the start of the line.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    keyword: String,
    pattern: Regex,
}

impl SearchQuery {
    /// Compiles a keyword per config. The default path escapes the keyword
    /// so regex metacharacters match literally; `raw_regex` interpolates it
    /// after the `^` anchor unchanged.
    pub fn compile(keyword: &str, config: &SearchConfig) -> Result<SearchQuery, DslError> {
        if keyword.trim().is_empty() {
            return Err(DslError::EmptyQuery);
        }
        let body = if config.raw_regex {
            keyword.to_string()
        } else {
            regex::escape(keyword)
        };
        let anchored = format!("^{}", body);
        let pattern = RegexBuilder::new(&anchored)
            .case_insensitive(!config.case_sensitive)
            .build()
            .map_err(|e| DslError::BadQueryPattern {
                pattern: anchored.clone(),
                source: e,
            })?;
        Ok(SearchQuery {
            keyword: keyword.to_string(),
            pattern,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct DictionaryHits {
    pub name: String,
    pub path: String,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct SearchFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of one query over one group. `total` covers successfully
/// streamed dictionaries only; skipped files are named in `failures`.
#[derive(Serialize, Debug, Clone)]
pub struct SearchResult {
    pub group: String,
    pub keyword: String,
    pub total: usize,
    pub dictionaries: Vec<DictionaryHits>,
    pub failures: Vec<SearchFailure>,
    pub rendered: String,
}

/// One query across an ordered list of dictionary files. Stateless between
/// runs; interactive callers build a fresh session (or call `run` again)
/// per keyword.
pub struct SearchSession<'a> {
    config: &'a SearchConfig,
    group: String,
    files: Vec<PathBuf>,
}

impl<'a> SearchSession<'a> {
    /// `files` as produced by `group::resolve_group` (sorted-path order).
    pub fn new(config: &'a SearchConfig, group: &str, files: Vec<PathBuf>) -> SearchSession<'a> {
        SearchSession {
            config,
            group: group.to_string(),
            files,
        }
    }

    /// Streams every dictionary for `keyword`, mirroring output to `sink`.
    /// Per-file decode failures are logged and skipped; the rest of the
    /// group still runs.
    pub fn run<W: Write>(&self, keyword: &str, sink: W) -> Result<SearchResult, DslError> {
        let query = SearchQuery::compile(keyword, self.config)?;
        let markup =
            MarkupStripper::new(&self.config.markup_pattern, &self.config.markup_replacement)?;
        let mut agg = ResultAggregator::new(sink, self.config.header_footer);

        let mut total = 0usize;
        let mut dictionaries = Vec::new();
        let mut failures = Vec::new();

        for path in &self.files {
            let src = match DictionarySource::open(path) {
                Ok(src) => src,
                Err(e) => {
                    eprintln!("[gdcl] skipping {}: {}", path.display(), e);
                    failures.push(SearchFailure {
                        path: path.to_string_lossy().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let name = src.display_name();
            agg.dictionary_header(&name)?;
            let mut scanner = EntryScanner::new(query.pattern(), &markup);
            for line in src.lines() {
                if let Some(out) = scanner.scan_line(line) {
                    agg.entry_line(&out)?;
                }
            }
            let count = scanner.count();
            total += count;
            agg.dictionary_footer(&name, count)?;
            dictionaries.push(DictionaryHits {
                name,
                path: path.to_string_lossy().to_string(),
                count,
            });
        }

        agg.group_summary(total, &self.group, query.keyword())?;

        Ok(SearchResult {
            group: self.group.clone(),
            keyword: query.keyword().to_string(),
            total,
            dictionaries,
            failures,
            rendered: agg.into_buffer(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::write_dz;
    use std::path::Path;

    fn session_files(dir: &Path) -> Vec<PathBuf> {
        group::resolve_group(dir.parent().unwrap(), dir.file_name().unwrap().to_str().unwrap(), &[])
            .unwrap()
    }

    fn make_group(specs: &[(&str, &str)]) -> (tempfile::TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let g = dir.path().join("test");
        std::fs::create_dir_all(&g).unwrap();
        for (file, content) in specs {
            write_dz(&g.join(file), content);
        }
        let files = session_files(&g);
        (dir, files)
    }

    #[test]
    fn single_dictionary_scenario() {
        let (_dir, files) = make_group(&[(
            "a.dsl.dz",
            "#NAME \"Alpha\"\ncat\n\tfeline\n\ndog\n\tcanine\n",
        )]);
        let cfg = SearchConfig::default();
        let session = SearchSession::new(&cfg, "test", files);
        let mut sink = Vec::new();
        let res = session.run("cat", &mut sink).unwrap();

        assert_eq!(res.total, 1);
        assert_eq!(res.dictionaries.len(), 1);
        assert_eq!(res.dictionaries[0].name, "Alpha");
        assert_eq!(res.dictionaries[0].count, 1);
        assert!(res.rendered.contains("== Alpha ==\n"));
        assert!(res.rendered.contains("cat\n\tfeline\n"));
        assert!(!res.rendered.contains("canine"));
        assert!(res.rendered.contains("1 result found in [Alpha]"));
        assert!(res
            .rendered
            .contains("A total of 1 result(s) found in [test] for the term \"cat\"."));
        assert_eq!(String::from_utf8(sink).unwrap(), res.rendered);
    }

    #[test]
    fn zero_match_query_still_renders_footers() {
        let (_dir, files) = make_group(&[
            ("a.dsl.dz", "#NAME \"Alpha\"\ncat\n\tfeline\n"),
            ("b.dsl.dz", "#NAME \"Beta\"\ndog\n\tcanine\n"),
        ]);
        let cfg = SearchConfig::default();
        let res = SearchSession::new(&cfg, "test", files)
            .run("zebra", &mut Vec::new())
            .unwrap();
        assert_eq!(res.total, 0);
        assert!(res.dictionaries.iter().all(|d| d.count == 0));
        assert!(!res.rendered.contains("feline"));
        assert!(res.rendered.contains("0 results found in [Alpha]"));
        assert!(res.rendered.contains("0 results found in [Beta]"));
    }

    #[test]
    fn total_is_sum_of_per_dictionary_counts() {
        let (_dir, files) = make_group(&[
            ("a.dsl.dz", "#NAME \"A\"\ncat\n\tone\n\ncatfish\n\ttwo\n"),
            ("b.dsl.dz", "#NAME \"B\"\ncattle\n\tthree\n"),
        ]);
        let cfg = SearchConfig::default();
        let res = SearchSession::new(&cfg, "test", files)
            .run("cat", &mut Vec::new())
            .unwrap();
        assert_eq!(res.dictionaries[0].count, 2);
        assert_eq!(res.dictionaries[1].count, 1);
        assert_eq!(
            res.total,
            res.dictionaries.iter().map(|d| d.count).sum::<usize>()
        );
    }

    #[test]
    fn corrupt_dictionary_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let g = dir.path().join("test");
        std::fs::create_dir_all(&g).unwrap();
        write_dz(&g.join("a.dsl.dz"), "#NAME \"A\"\ncat\n\tfeline\n");
        std::fs::write(g.join("b.dsl.dz"), [0x1f, 0x8b, 0xff, 0x00]).unwrap();
        write_dz(&g.join("c.dsl.dz"), "#NAME \"C\"\ncat\n\tchat\n");
        let files = session_files(&g);
        assert_eq!(files.len(), 3);

        let cfg = SearchConfig::default();
        let res = SearchSession::new(&cfg, "test", files)
            .run("cat", &mut Vec::new())
            .unwrap();
        assert_eq!(res.total, 2);
        assert_eq!(res.dictionaries.len(), 2);
        assert_eq!(res.failures.len(), 1);
        assert!(res.failures[0].path.ends_with("b.dsl.dz"));
    }

    #[test]
    fn case_sensitivity_toggle() {
        let (_dir, files) = make_group(&[("a.dsl.dz", "#NAME \"A\"\nCat\n\tfeline\n")]);
        let cfg = SearchConfig::default();
        let res = SearchSession::new(&cfg, "test", files.clone())
            .run("cat", &mut Vec::new())
            .unwrap();
        assert_eq!(res.total, 0);

        let folded = SearchConfig {
            case_sensitive: false,
            ..SearchConfig::default()
        };
        let res = SearchSession::new(&folded, "test", files)
            .run("cat", &mut Vec::new())
            .unwrap();
        assert_eq!(res.total, 1);
    }

    #[test]
    fn literal_query_with_metacharacters() {
        let (_dir, files) = make_group(&[(
            "a.dsl.dz",
            "#NAME \"A\"\nc++\n\tlanguage\n\ncat\n\tfeline\n",
        )]);
        let cfg = SearchConfig::default();
        let res = SearchSession::new(&cfg, "test", files)
            .run("c++", &mut Vec::new())
            .unwrap();
        assert_eq!(res.total, 1);
        assert!(res.rendered.contains("\tlanguage"));
    }

    #[test]
    fn raw_regex_opt_in() {
        let (_dir, files) = make_group(&[(
            "a.dsl.dz",
            "#NAME \"A\"\ncat\n\tfeline\n\ncot\n\tbed\n\ncut\n\tslice\n",
        )]);
        let cfg = SearchConfig {
            raw_regex: true,
            ..SearchConfig::default()
        };
        let res = SearchSession::new(&cfg, "test", files)
            .run("c[ao]t", &mut Vec::new())
            .unwrap();
        assert_eq!(res.total, 2);
    }

    #[test]
    fn matching_is_prefix_anchored() {
        let (_dir, files) = make_group(&[(
            "a.dsl.dz",
            "#NAME \"A\"\nbobcat\n\twild\n\ncat\n\tfeline\n",
        )]);
        let cfg = SearchConfig::default();
        let res = SearchSession::new(&cfg, "test", files)
            .run("cat", &mut Vec::new())
            .unwrap();
        assert_eq!(res.total, 1);
        assert!(!res.rendered.contains("bobcat"));
    }

    #[test]
    fn empty_query_is_fatal() {
        let (_dir, files) = make_group(&[("a.dsl.dz", "#NAME \"A\"\ncat\n\tx\n")]);
        let cfg = SearchConfig::default();
        let err = SearchSession::new(&cfg, "test", files)
            .run("  ", &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, DslError::EmptyQuery));
    }

    #[test]
    fn plain_and_compressed_sources_agree() {
        let dir = tempfile::tempdir().unwrap();
        let g = dir.path().join("test");
        std::fs::create_dir_all(&g).unwrap();
        let content = "#NAME \"A\"\ncat\n\t[b]feline[/b], see \\[sic\\]\n";
        write_dz(&g.join("a.dsl.dz"), content);
        std::fs::write(g.join("b.dsl"), crate::test_util::utf16le_bytes(content)).unwrap();
        let files = session_files(&g);
        assert_eq!(files.len(), 2);

        let cfg = SearchConfig::default();
        let res = SearchSession::new(&cfg, "test", files)
            .run("cat", &mut Vec::new())
            .unwrap();
        assert_eq!(res.dictionaries[0].count, res.dictionaries[1].count);
        assert_eq!(
            res.rendered.matches("\tfeline, see [sic]").count(),
            2
        );
    }

    #[test]
    fn result_envelope_serializes() {
        let (_dir, files) = make_group(&[("a.dsl.dz", "#NAME \"A\"\ncat\n\tfeline\n")]);
        let cfg = SearchConfig::default();
        let res = SearchSession::new(&cfg, "test", files)
            .run("cat", &mut Vec::new())
            .unwrap();
        let v: serde_json::Value = serde_json::to_value(&res).unwrap();
        assert_eq!(v["group"], "test");
        assert_eq!(v["total"], 1);
        assert_eq!(v["dictionaries"][0]["name"], "A");
        assert!(v["rendered"].as_str().unwrap().contains("feline"));
    }

    #[test]
    fn first_line_is_not_exempt_from_matching() {
        // a name line that happens to match the query is still a headword
        let (_dir, files) = make_group(&[("a.dsl.dz", "#NAME \"cats\"\ncat\n\tfeline\n")]);
        let cfg = SearchConfig {
            raw_regex: true,
            ..SearchConfig::default()
        };
        let res = SearchSession::new(&cfg, "test", files)
            .run("#NAME", &mut Vec::new())
            .unwrap();
        assert_eq!(res.total, 1);
    }
}
