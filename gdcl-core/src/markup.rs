use crate::error::DslError;
use regex::Regex;

/// Default markup pattern: minimal bracketed span, e.g. `[b]`, `[/b]`, `[c]`.
pub const DEFAULT_MARKUP_PATTERN: &str = r"\[.*?\]";

/// DSL headword back-reference inside entry bodies.
const HEADWORD_REF: char = '~';

// Private-use sentinels protecting escaped characters from the markup
// deletion pass. They never occur in dictionary text.
const SENT_OPEN: char = '\u{e000}';
const SENT_CLOSE: char = '\u{e001}';
const SENT_TILDE: char = '\u{e002}';

/// Strips DSL markup from continuation lines and substitutes the headword
/// back-reference. Compiled once per session; a bad pattern is a
/// configuration error, not a per-search one.
#[derive(Debug, Clone)]
pub struct MarkupStripper {
    markup: Option<Regex>,
    replacement: String,
}

impl MarkupStripper {
    /// `pattern` empty means "leave markup in place" (only escapes and the
    /// headword reference are still processed).
    pub fn new(pattern: &str, replacement: &str) -> Result<MarkupStripper, DslError> {
        let markup = if pattern.is_empty() {
            None
        } else {
            Some(
                Regex::new(pattern).map_err(|e| DslError::BadMarkupPattern {
                    pattern: pattern.to_string(),
                    source: e,
                })?,
            )
        };
        Ok(MarkupStripper {
            markup,
            replacement: replacement.to_string(),
        })
    }

    pub fn with_defaults() -> MarkupStripper {
        // The default pattern is known-good.
        MarkupStripper::new(DEFAULT_MARKUP_PATTERN, "").unwrap()
    }

    /// Cleans one continuation line. `headword` is the raw matched headword
    /// line of the active entry, substituted for each unescaped `~`.
    ///
    /// Order matters: escaped brackets are hidden behind sentinels before
    /// markup deletion and restored after it, so literal `\[` text that
    /// looks like markup survives.
    pub fn transform(&self, line: &str, headword: &str) -> String {
        let mut s = line
            .replace("\\[", &SENT_OPEN.to_string())
            .replace("\\]", &SENT_CLOSE.to_string())
            .replace("\\~", &SENT_TILDE.to_string());
        if let Some(re) = &self.markup {
            s = re.replace_all(&s, self.replacement.as_str()).into_owned();
        }
        s = s.replace(SENT_OPEN, "[").replace(SENT_CLOSE, "]");
        if s.contains(HEADWORD_REF) {
            s = s.replace(HEADWORD_REF, headword);
        }
        // escaped tildes come back only after substitution, or they would be
        // rewritten as headwords themselves
        s.replace(SENT_TILDE, "~")
    }
}
