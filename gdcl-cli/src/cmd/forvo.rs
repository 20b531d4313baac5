use crate::config::cache_dir;
use anyhow::{bail, Context};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

const API_BASE: &str = "https://apifree.forvo.com";

pub(crate) fn http_client() -> &'static reqwest::blocking::Client {
    static CLI: OnceLock<reqwest::blocking::Client> = OnceLock::new();
    CLI.get_or_init(|| {
        reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap()
    })
}

pub(crate) fn cache_path_for(url: &str) -> PathBuf {
    use sha1::Digest;
    let mut hasher = sha1::Sha1::new();
    hasher.update(url.as_bytes());
    let h = hasher.finalize();
    let dir = cache_dir().join("forvo");
    let _ = std::fs::create_dir_all(&dir);
    dir.join(format!("{:x}.xml", h))
}

fn fetch_xml(url: &str) -> anyhow::Result<String> {
    let cache = cache_path_for(url);
    if let Ok(t) = std::fs::read_to_string(&cache) {
        return Ok(t);
    }
    let mut backoff = 500u64;
    let mut last_err = None;
    for _ in 0..3 {
        match http_client().get(url).send() {
            Ok(r) if r.status().is_success() => {
                let xml = r.text()?;
                let _ = std::fs::write(&cache, &xml);
                return Ok(xml);
            }
            Ok(r) => last_err = Some(format!("HTTP {}", r.status())),
            Err(e) => last_err = Some(e.to_string()),
        }
        std::thread::sleep(std::time::Duration::from_millis(backoff));
        backoff = (backoff * 2).min(8000);
    }
    bail!(
        "forvo request failed: {}",
        last_err.unwrap_or_else(|| "unknown".to_string())
    )
}

/// One `<item>` of a word-pronunciations response.
#[derive(Serialize, Debug, Clone, Default)]
pub(crate) struct Pronunciation {
    pub id: String,
    pub username: String,
    pub sex: String,
    pub country: String,
    pub rate: i64,
    pub num_votes: i64,
    pub num_positive_votes: i64,
    pub pathogg: String,
    pub pathmp3: String,
}

impl Pronunciation {
    fn audio_url(&self, format: AudioFormat) -> &str {
        match format {
            AudioFormat::Ogg => &self.pathogg,
            AudioFormat::Mp3 => &self.pathmp3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AudioFormat {
    Ogg,
    Mp3,
}

impl AudioFormat {
    fn ext(self) -> &'static str {
        match self {
            AudioFormat::Ogg => "ogg",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

/// Parses a word-pronunciations XML response: the `total` attribute of
/// `<items>` plus one record per `<item>`.
pub(crate) fn parse_pronunciations(xml: &str) -> anyhow::Result<(usize, Vec<Pronunciation>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;
    let mut buf = Vec::new();
    let mut total: usize = 0;
    let mut items: Vec<Pronunciation> = Vec::new();
    let mut current: Option<Pronunciation> = None;
    let mut field: Option<Vec<u8>> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_owned();
                if name == b"items" {
                    for a in e.attributes().with_checks(false).flatten() {
                        if a.key.as_ref() == b"total" {
                            let v = String::from_utf8_lossy(&a.value).into_owned();
                            total = v.trim().parse().unwrap_or(0);
                        }
                    }
                } else if name == b"item" {
                    current = Some(Pronunciation::default());
                } else if current.is_some() {
                    field = Some(name);
                }
            }
            Ok(Event::Empty(e)) => {
                // self-closing tags carry no text; an empty field keeps its
                // default value
                if e.name().as_ref() == b"items" {
                    for a in e.attributes().with_checks(false).flatten() {
                        if a.key.as_ref() == b"total" {
                            let v = String::from_utf8_lossy(&a.value).into_owned();
                            total = v.trim().parse().unwrap_or(0);
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name().as_ref().to_owned();
                if name == b"item" {
                    if let Some(p) = current.take() {
                        items.push(p);
                    }
                } else if field.as_deref() == Some(name.as_slice()) {
                    field = None;
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(p), Some(f)) = (current.as_mut(), field.as_deref()) {
                    let text = t.decode().unwrap_or_default().into_owned();
                    match f {
                        b"id" => p.id = text,
                        b"username" => p.username = text,
                        b"sex" => p.sex = text,
                        b"country" => p.country = text,
                        b"rate" => p.rate = text.trim().parse().unwrap_or(0),
                        b"num_votes" => p.num_votes = text.trim().parse().unwrap_or(0),
                        b"num_positive_votes" => {
                            p.num_positive_votes = text.trim().parse().unwrap_or(0)
                        }
                        b"pathogg" => p.pathogg = text,
                        b"pathmp3" => p.pathmp3 = text,
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("bad forvo response: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok((total, items))
}

pub(crate) fn build_request_url(key: &str, word: &str, lang: &str) -> String {
    format!(
        "{}/key/{}/format/xml/action/word-pronunciations/word/{}/language/{}",
        API_BASE,
        key,
        urlencoding::encode(word),
        urlencoding::encode(lang)
    )
}

/// Download target name: `<lang>_<word>_<n>.<ext>`, spaces folded to `-`.
pub(crate) fn save_filename(lang: &str, word: &str, index: usize, format: AudioFormat) -> String {
    let word = word.split_whitespace().collect::<Vec<_>>().join("-");
    format!("{}_{}_{}.{}", lang, word, index + 1, format.ext())
}

fn checked_url(raw: &str) -> anyhow::Result<String> {
    let u = url::Url::parse(raw).with_context(|| format!("bad audio url {:?}", raw))?;
    if !matches!(u.scheme(), "http" | "https") {
        bail!("refusing non-http audio url {:?}", raw);
    }
    Ok(u.to_string())
}

fn play(url: &str, index: usize) -> anyhow::Result<()> {
    let url = checked_url(url)?;
    println!("Now playing pronunciation #{}...", index + 1);
    let status = Command::new("mplayer")
        .args(["-really-quiet", &url])
        .status()
        .context("failed to launch mplayer")?;
    if !status.success() {
        bail!("mplayer exited with {}", status);
    }
    Ok(())
}

fn save(url: &str, filename: &str) -> anyhow::Result<()> {
    let url = checked_url(url)?;
    let resp = http_client().get(&url).send()?;
    if !resp.status().is_success() {
        bail!("download failed: HTTP {}", resp.status());
    }
    let bytes = resp.bytes()?;
    let mut f = std::fs::File::create(filename)?;
    f.write_all(&bytes)?;
    println!("Audio saved to {}.", filename);
    Ok(())
}

fn print_list(items: &[Pronunciation]) {
    for (i, p) in items.iter().enumerate() {
        let rating = if p.num_votes != 0 {
            let neg = p.rate - p.num_positive_votes;
            format!("\t\t{} [+{} {}]", p.rate, p.num_positive_votes, neg)
        } else {
            String::new()
        };
        println!(
            "  {}. by {} ({} from {}){}",
            i + 1,
            p.username,
            p.sex,
            p.country,
            rating
        );
    }
    println!();
}

fn prompt(msg: &str) -> anyhow::Result<String> {
    println!("{}", msg);
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub(crate) struct ForvoArgs {
    pub mp3: bool,
    pub list: bool,
    pub urls: bool,
    pub play_all: bool,
    pub save_all: bool,
    pub lang: Option<String>,
    pub word: Option<String>,
}

pub(crate) fn run(args: ForvoArgs, key: &str) -> anyhow::Result<()> {
    let lang = match args.lang {
        Some(l) => l,
        None => prompt("Enter language code:")?,
    };
    let word = match args.word {
        Some(w) => w,
        None => prompt("Enter word to pronounce:")?,
    };
    if lang.is_empty() || word.is_empty() {
        bail!("insufficient information provided");
    }

    let format = if args.mp3 {
        AudioFormat::Mp3
    } else {
        AudioFormat::Ogg
    };

    let xml = fetch_xml(&build_request_url(key, &word, &lang))?;
    let (total, items) = parse_pronunciations(&xml)?;

    if !args.urls || args.list {
        let plural = if total == 1 { "" } else { "s" };
        let punct = if total == 0 { "." } else { ":" };
        println!(
            "{} pronunciation{} found for \"{}\" in {}{}",
            total, plural, word, lang, punct
        );
        println!();
    }

    if args.play_all {
        for (i, p) in items.iter().enumerate() {
            play(p.audio_url(format), i)?;
        }
        return Ok(());
    }

    if args.list {
        print_list(&items);
        if !args.urls {
            return Ok(());
        }
    }

    if args.urls {
        for p in &items {
            println!("{}", p.audio_url(format));
        }
        return Ok(());
    }

    if args.save_all {
        if items.is_empty() {
            println!("No matching pronunciations found for \"{}\" in {}", word, lang);
            return Ok(());
        }
        for (i, p) in items.iter().enumerate() {
            save(p.audio_url(format), &save_filename(&lang, &word, i, format))?;
        }
        return Ok(());
    }

    if items.is_empty() {
        return Ok(());
    }

    print_list(&items);
    let selection = prompt(
        "Select a number to hear the corresponding pronunciation, or press \"a\" to hear all available pronunciations.",
    )?;
    if selection == "a" {
        for (i, p) in items.iter().enumerate() {
            play(p.audio_url(format), i)?;
        }
    } else if let Ok(n) = selection.parse::<usize>() {
        match items.get(n.wrapping_sub(1)) {
            Some(p) => play(p.audio_url(format), n - 1)?,
            None => bail!("no pronunciation #{}", n),
        }
    } else {
        bail!("nothing selected");
    }

    let pick = prompt("Enter a number to save pronunciation to disk, or any other key to quit")?;
    if let Ok(n) = pick.parse::<usize>() {
        if let Some(p) = items.get(n.wrapping_sub(1)) {
            save(p.audio_url(format), &save_filename(&lang, &word, n - 1, format))?;
        }
    }
    Ok(())
}
