use crate::markup::MarkupStripper;
use regex::Regex;

/// Classification of one decoded DSL line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Unindented: a headword candidate.
    Headword,
    /// Tab- or space-indented: body text of the preceding headword.
    Continuation,
    /// Empty: terminates the current entry.
    Blank,
}

pub fn classify(line: &str) -> LineClass {
    if line.is_empty() {
        LineClass::Blank
    } else if line.starts_with('\t') || line.starts_with(' ') {
        LineClass::Continuation
    } else {
        LineClass::Headword
    }
}

/// Streaming entry scanner for one dictionary file.
///
/// Two states: idle, or capturing the body of the last matched headword.
/// A blank line always drops back to idle; a non-matching headword line
/// does too. Two adjacent matching headwords leave the first entry with an
/// empty body, which is the historical boundary rule and is kept as is.
pub struct EntryScanner<'a> {
    pattern: &'a Regex,
    markup: &'a MarkupStripper,
    /// Raw matched headword line while capturing, `None` when idle.
    headword: Option<String>,
    count: usize,
}

impl<'a> EntryScanner<'a> {
    pub fn new(pattern: &'a Regex, markup: &'a MarkupStripper) -> EntryScanner<'a> {
        EntryScanner {
            pattern,
            markup,
            headword: None,
            count: 0,
        }
    }

    /// Feeds one line through the state machine; returns the line to emit,
    /// if any. Matched headword lines are emitted raw; captured continuation
    /// lines come back markup-stripped with `~` resolved.
    pub fn scan_line(&mut self, line: &str) -> Option<String> {
        match classify(line) {
            LineClass::Blank => {
                self.headword = None;
                None
            }
            LineClass::Continuation => {
                let hw = self.headword.as_deref()?;
                Some(self.markup.transform(line, hw))
            }
            LineClass::Headword => {
                if self.pattern.is_match(line) {
                    self.count += 1;
                    self.headword = Some(line.to_string());
                    Some(line.to_string())
                } else {
                    self.headword = None;
                    None
                }
            }
        }
    }

    /// Matched-entry count so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(pattern: &str, lines: &[&str]) -> (Vec<String>, usize) {
        let re = Regex::new(pattern).unwrap();
        let markup = MarkupStripper::with_defaults();
        let mut scanner = EntryScanner::new(&re, &markup);
        let out = lines
            .iter()
            .filter_map(|l| scanner.scan_line(l))
            .collect();
        (out, scanner.count())
    }

    #[test]
    fn captures_body_of_matched_headword() {
        let (out, count) = scan("^cat", &["cat", "\tfeline", "", "dog", "\tcanine"]);
        assert_eq!(out, vec!["cat", "\tfeline"]);
        assert_eq!(count, 1);
    }

    #[test]
    fn idle_continuations_never_emitted() {
        let (out, count) = scan("^dog", &["\torphan body", "cat", "\tfeline"]);
        assert!(out.is_empty());
        assert_eq!(count, 0);
    }

    #[test]
    fn blank_line_ends_capture() {
        let (out, _) = scan("^cat", &["cat", "\tone", "", "\ttwo"]);
        assert_eq!(out, vec!["cat", "\tone"]);
    }

    #[test]
    fn non_matching_headword_resets_capture() {
        let (out, _) = scan("^cat", &["cat", "\tone", "dog", "\tcanine"]);
        assert_eq!(out, vec!["cat", "\tone"]);
    }

    #[test]
    fn adjacent_matches_leave_first_entry_bodyless() {
        // boundary rule: no blank between "cat" and "catfish", the second
        // capture starts immediately
        let (out, count) = scan("^cat", &["cat", "catfish", "\tbody"]);
        assert_eq!(out, vec!["cat", "catfish", "\tbody"]);
        assert_eq!(count, 2);
    }

    #[test]
    fn headword_reference_uses_raw_matched_line() {
        let (out, _) = scan("^cat ", &["cat (n.)", "\t~ is short", ""]);
        assert_eq!(out, vec!["cat (n.)", "\tcat (n.) is short"]);
    }

    #[test]
    fn whitespace_indent_is_a_continuation() {
        assert_eq!(classify("  spaced"), LineClass::Continuation);
        assert_eq!(classify("\ttabbed"), LineClass::Continuation);
        assert_eq!(classify(""), LineClass::Blank);
        assert_eq!(classify("word"), LineClass::Headword);
    }
}
