//! User-agent matching logic.
//!
//! # Responsibilities
//! - Match a user-agent prefix (case-sensitive)
//! - Capture a fixed number of dotted numeric version components after it
//! - Detect browser-like agents by keyword
//!
//! # Design Decisions
//! - Prefix and substring checks only, no regex
//! - A required version that is missing or malformed means no match

/// Trait for matching a user-agent string.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns `Some(version)` on a match; the inner value is the captured
    /// version, if this matcher captures one.
    fn matches(&self, user_agent: &str) -> Option<Option<String>>;
}

/// Matches one of several prefixes, optionally followed by a version.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    prefixes: &'static [&'static str],
    version_parts: usize,
}

impl PrefixMatcher {
    /// Match any of `prefixes` with no version capture.
    pub fn new(prefixes: &'static [&'static str]) -> Self {
        Self {
            prefixes,
            version_parts: 0,
        }
    }

    /// Require `parts` dotted numeric components right after the prefix.
    pub fn with_version(mut self, parts: usize) -> Self {
        self.version_parts = parts;
        self
    }
}

impl Matcher for PrefixMatcher {
    fn matches(&self, user_agent: &str) -> Option<Option<String>> {
        let rest = self
            .prefixes
            .iter()
            .find_map(|prefix| user_agent.strip_prefix(prefix))?;

        if self.version_parts == 0 {
            return Some(None);
        }
        extract_version(rest, self.version_parts).map(Some)
    }
}

/// Matches when any keyword occurs anywhere in the agent.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: &'static [&'static str],
}

impl KeywordMatcher {
    pub fn new(keywords: &'static [&'static str]) -> Self {
        Self { keywords }
    }
}

impl Matcher for KeywordMatcher {
    fn matches(&self, user_agent: &str) -> Option<Option<String>> {
        self.keywords
            .iter()
            .any(|keyword| user_agent.contains(keyword))
            .then_some(None)
    }
}

/// Read exactly `parts` groups of ASCII digits joined by `.` from the start
/// of `input`. Trailing text is ignored.
fn extract_version(input: &str, parts: usize) -> Option<String> {
    let bytes = input.as_bytes();
    let mut end = 0;

    for part in 0..parts {
        if part > 0 {
            if bytes.get(end) != Some(&b'.') {
                return None;
            }
            end += 1;
        }
        let start = end;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        if end == start {
            return None;
        }
    }

    Some(input[..end].to_string())
}
