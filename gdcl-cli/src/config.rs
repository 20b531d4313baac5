use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;

/// User configuration, `~/.config/gdcl/config.json`. Every field is
/// optional; command-line flags override whatever is set here.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UserConfig {
    pub forvo_key: Option<String>,
    pub default_group: Option<String>,
    pub exclude: Vec<String>,
    pub markup_pattern: Option<String>,
    pub markup_replace: Option<String>,
    pub case_sensitive: Option<bool>,
    pub header_footer: Option<bool>,
}

pub fn config_dir() -> PathBuf {
    if let Ok(p) = std::env::var("GDCL_CONFIG_DIR") {
        return PathBuf::from(p);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("gdcl")
}

pub fn cache_dir() -> PathBuf {
    config_dir().join("cache")
}

/// Loads the config file when present. A malformed file is reported and
/// treated as absent rather than aborting the search.
pub fn load() -> UserConfig {
    let path = config_dir().join("config.json");
    match std::fs::read_to_string(&path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("[gdcl] ignoring bad config {}: {}", path.display(), e);
                UserConfig::default()
            }
        },
        Err(_) => UserConfig::default(),
    }
}

/// Appends a searched keyword to the history file. Best-effort: history
/// must never break a search.
pub fn append_history(keyword: &str) {
    let dir = config_dir();
    let _ = std::fs::create_dir_all(&dir);
    if let Ok(mut f) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("history"))
    {
        let _ = writeln!(f, "{}", keyword);
    }
}
