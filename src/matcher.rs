use regex::Regex;

use crate::entry::Entry;
use crate::error::RummageError;
use crate::traits::Matcher;

/// Full-string regular expression over an entry's base name.
///
/// The pattern is anchored on both ends, so `.*\.txt` matches `notes.txt`
/// but not `notes.txt.bak`, and `txt` matches nothing but a file literally
/// named `txt`. Matching is case-sensitive unless the pattern says otherwise
/// (e.g. `(?i)readme.*`).
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    source: String,
    regex:  Regex,
}

impl RegexMatcher {
    /// Compile `pattern`. Syntax errors surface here, never mid-walk.
    pub fn new(pattern: &str) -> Result<Self, RummageError> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| RummageError::InvalidPattern(describe(&e)))?;

        Ok(Self {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// The pattern as the caller wrote it, without the anchors.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a bare file name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl Matcher for RegexMatcher {
    fn is_match(&self, entry: &Entry) -> bool {
        self.matches_name(&entry.name)
    }
}

/// Test one file name against `pattern` with full-match semantics.
///
/// Compiles the pattern on every call; hold a [`RegexMatcher`] when testing
/// many names.
pub fn matches(name: &str, pattern: &str) -> Result<bool, RummageError> {
    Ok(RegexMatcher::new(pattern)?.matches_name(name))
}

// The anchored wrapper shows up in regex's multi-line diagnostics, which would
// confuse anyone reading the error. Keep the one-line summary.
fn describe(err: &regex::Error) -> String {
    match err {
        regex::Error::Syntax(msg) => msg
            .lines()
            .rev()
            .find(|l| l.starts_with("error:"))
            .map(|l| l.trim_start_matches("error:").trim().to_owned())
            .unwrap_or_else(|| msg.clone()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_name_must_match() {
        assert!(matches("a.txt", r".*\.txt").unwrap());
        assert!(!matches("a.txt.bak", r".*\.txt").unwrap());
        assert!(!matches("b.log", r".*\.txt").unwrap());
        assert!(!matches("report.txt", "report").unwrap());
    }

    #[test]
    fn alternation_is_anchored_as_a_group() {
        // Without the non-capturing group, `^a|b$` would match "abc".
        assert!(!matches("abc", "a|b").unwrap());
        assert!(matches("b", "a|b").unwrap());
    }

    #[test]
    fn no_case_folding() {
        assert!(!matches("README.md", "readme.md").unwrap());
        assert!(matches("README.md", "(?i)readme.md").unwrap());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = RegexMatcher::new("(unclosed").unwrap_err();
        assert!(matches!(err, RummageError::InvalidPattern(_)));
        assert!(!err.to_string().contains("^(?:"));
    }

    #[test]
    fn matcher_trait_uses_base_name() {
        let m = RegexMatcher::new(r"c\.txt").unwrap();
        assert!(m.is_match(&Entry::file("/root/sub/c.txt", 2)));
        assert!(!m.is_match(&Entry::file("/root/c.txt/other", 2)));
        assert_eq!(m.as_str(), r"c\.txt");
    }
}
