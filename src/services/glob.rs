//! Restricted glob matching for skip-rule patterns.
//!
//! Matches branch names and environment hosts against stored patterns.
//! Deliberately small syntax, bounded for worst-case matching cost:
//!
//! - `*` matches any run of characters except `/`
//! - `**` matches any run of characters including `/`
//! - `?` matches exactly one character except `/`
//! - `\` escapes the next character (`\*` is a literal asterisk)
//! - matching is case-insensitive and anchored (full-string)
//! - no brace expansion, no extended-glob operators, no character classes
//!
//! Pattern and input lengths are capped, and matching walks the input once
//! per pattern segment, so cost is bounded by pattern size times input size
//! with no backtracking.

use std::fmt;

const MAX_PATTERN_LENGTH: usize = 256;
const MAX_INPUT_LENGTH: usize = 1024;
const MAX_SEGMENTS: usize = 32;

/// Error returned when a glob pattern is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobError {
    pub pattern: String,
    pub message: String,
}

impl fmt::Display for GlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid glob pattern '{}': {}",
            self.pattern, self.message
        )
    }
}

impl std::error::Error for GlobError {}

/// Compiled glob pattern for efficient matching.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    /// Literal text, stored lowercased
    Literal(String),
    /// `*` - any chars except slash
    Star,
    /// `**` - any chars including slash
    DoubleStar,
    /// `?` - exactly one char except slash
    AnyChar,
}

impl GlobPattern {
    /// Compile a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns error for invalid patterns (trailing escape, too long).
    pub fn new(pattern: &str) -> Result<Self, GlobError> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(GlobError {
                pattern: pattern.chars().take(50).collect::<String>() + "...",
                message: format!(
                    "pattern length {} exceeds maximum {}",
                    pattern.len(),
                    MAX_PATTERN_LENGTH
                ),
            });
        }

        let segments = parse_pattern(pattern)?;

        if segments.len() > MAX_SEGMENTS {
            return Err(GlobError {
                pattern: pattern.to_string(),
                message: format!(
                    "pattern has {} segments, exceeds maximum {}",
                    segments.len(),
                    MAX_SEGMENTS
                ),
            });
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    /// Check if the pattern matches the given input.
    ///
    /// Case-insensitive and anchored. Returns `false` for inputs exceeding
    /// the length cap.
    pub fn matches(&self, input: &str) -> bool {
        if input.len() > MAX_INPUT_LENGTH {
            return false;
        }
        let lowered = input.to_lowercase();
        match_segments(&self.segments, &lowered)
    }

    /// Get the original pattern string.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

/// Compile-and-match convenience for stored rule patterns.
///
/// A pattern that fails to compile never matches; the rule evaluator must
/// not raise on bad stored data.
pub fn matches_pattern(pattern: &str, input: &str) -> bool {
    match GlobPattern::new(pattern) {
        Ok(glob) => glob.matches(input),
        Err(e) => {
            tracing::warn!("Skipping unmatchable pattern: {}", e);
            false
        }
    }
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, GlobError> {
    let mut segments = Vec::new();
    let mut current_literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current_literal.extend(escaped.to_lowercase()),
                None => {
                    return Err(GlobError {
                        pattern: pattern.to_string(),
                        message: "trailing backslash".to_string(),
                    });
                }
            },
            '*' => {
                if !current_literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                }

                if chars.peek() == Some(&'*') {
                    chars.next(); // consume second *
                    segments.push(Segment::DoubleStar);
                } else {
                    segments.push(Segment::Star);
                }
            }
            '?' => {
                if !current_literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                }
                segments.push(Segment::AnyChar);
            }
            _ => {
                current_literal.extend(c.to_lowercase());
            }
        }
    }

    if !current_literal.is_empty() {
        segments.push(Segment::Literal(current_literal));
    }

    Ok(segments)
}

/// Match by propagating the set of reachable input positions through the
/// segments, one pass per segment. Wildcards widen the set in a single
/// left-to-right sweep, so the cost stays linear in the input per segment.
fn match_segments(segments: &[Segment], input: &str) -> bool {
    let chars: Vec<char> = input.chars().collect();
    let n = chars.len();

    // reachable[j]: the segments consumed so far can end at position j
    let mut reachable = vec![false; n + 1];
    reachable[0] = true;

    for segment in segments {
        let mut next = vec![false; n + 1];
        match segment {
            Segment::Literal(lit) => {
                let lit: Vec<char> = lit.chars().collect();
                let m = lit.len();
                if m <= n {
                    for j in 0..=n - m {
                        if reachable[j] && chars[j..j + m] == lit[..] {
                            next[j + m] = true;
                        }
                    }
                }
            }
            Segment::AnyChar => {
                for j in 0..n {
                    if reachable[j] && chars[j] != '/' {
                        next[j + 1] = true;
                    }
                }
            }
            Segment::Star => {
                // open: some reachable start lies at or before j with no
                // slash in between, so the star can end here
                let mut open = false;
                for j in 0..=n {
                    if j > 0 && chars[j - 1] == '/' {
                        open = false;
                    }
                    open = open || reachable[j];
                    next[j] = open;
                }
            }
            Segment::DoubleStar => {
                let mut open = false;
                for j in 0..=n {
                    open = open || reachable[j];
                    next[j] = open;
                }
            }
        }
        reachable = next;
    }

    reachable[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let glob = GlobPattern::new("main").unwrap();
        assert!(glob.matches("main"));
        assert!(!glob.matches("main-2"));
        assert!(!glob.matches("feature/main"));
    }

    #[test]
    fn test_case_insensitive() {
        let glob = GlobPattern::new("Release/*").unwrap();
        assert!(glob.matches("release/2.0"));
        assert!(glob.matches("RELEASE/2.0"));

        let glob = GlobPattern::new("staging.example.com").unwrap();
        assert!(glob.matches("Staging.Example.COM"));
    }

    #[test]
    fn test_star_within_segment() {
        let glob = GlobPattern::new("release/*").unwrap();
        assert!(glob.matches("release/2.0"));
        assert!(glob.matches("release/"));
        assert!(!glob.matches("main"));
        assert!(!glob.matches("release")); // slash is literal
        assert!(!glob.matches("release/2.0/hotfix")); // * stops at slash
    }

    #[test]
    fn test_double_star_crosses_segments() {
        let glob = GlobPattern::new("release/**").unwrap();
        assert!(glob.matches("release/2.0"));
        assert!(glob.matches("release/2.0/hotfix"));
        assert!(!glob.matches("main"));
    }

    #[test]
    fn test_star_in_host_patterns() {
        let glob = GlobPattern::new("*.staging.example.com").unwrap();
        assert!(glob.matches("eu.staging.example.com"));
        assert!(glob.matches("us-west.staging.example.com"));
        assert!(!glob.matches("example.com"));
        assert!(!glob.matches("staging.example.com.evil.net"));
    }

    #[test]
    fn test_any_char() {
        let glob = GlobPattern::new("shard-?").unwrap();
        assert!(glob.matches("shard-1"));
        assert!(glob.matches("shard-a"));
        assert!(!glob.matches("shard-"));
        assert!(!glob.matches("shard-12"));
        assert!(!glob.matches("shard-/"));
    }

    #[test]
    fn test_anchoring() {
        let glob = GlobPattern::new("main*").unwrap();
        assert!(glob.matches("main"));
        assert!(glob.matches("main-backup"));
        assert!(!glob.matches("not-main"));
    }

    #[test]
    fn test_escaping() {
        let glob = GlobPattern::new(r"literal\*").unwrap();
        assert!(glob.matches("literal*"));
        assert!(!glob.matches("literally"));
    }

    #[test]
    fn test_no_brace_expansion() {
        // Braces are ordinary characters, not alternation
        let glob = GlobPattern::new("{main,develop}").unwrap();
        assert!(!glob.matches("main"));
        assert!(glob.matches("{main,develop}"));
    }

    #[test]
    fn test_no_extglob_operators() {
        // Extended-glob syntax like +(a|b) is treated literally
        let glob = GlobPattern::new("+(main|develop)").unwrap();
        assert!(!glob.matches("main"));
        assert!(glob.matches("+(main|develop)"));
    }

    #[test]
    fn test_trailing_backslash_error() {
        assert!(GlobPattern::new(r"branch\").is_err());
    }

    #[test]
    fn test_length_caps() {
        let long_pattern = "a".repeat(MAX_PATTERN_LENGTH + 1);
        assert!(GlobPattern::new(&long_pattern).is_err());

        let glob = GlobPattern::new("**").unwrap();
        let long_input = "b".repeat(MAX_INPUT_LENGTH + 1);
        assert!(!glob.matches(&long_input));
    }

    #[test]
    fn test_pathological_pattern_stays_cheap() {
        // Segment cap rejects wildcard-heavy patterns outright
        let pattern = "?".repeat(MAX_SEGMENTS + 1);
        assert!(GlobPattern::new(&pattern).is_err());

        // At the cap, matching a non-matching input must terminate quickly
        let pattern = "a*".repeat(MAX_SEGMENTS / 2);
        let glob = GlobPattern::new(&pattern).unwrap();
        assert!(!glob.matches(&"b".repeat(200)));
    }

    #[test]
    fn test_wildcard_heavy_pattern_matches_in_linear_time() {
        // Star-dense pattern against a long near-matching input; must
        // finish promptly rather than exploring every expansion split
        let pattern = format!("{}b", "a*".repeat(14));
        let glob = GlobPattern::new(&pattern).unwrap();
        let input = "a".repeat(300);

        let started = std::time::Instant::now();
        assert!(!glob.matches(&input));
        assert!(glob.matches(&format!("{}b", input)));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_matches_pattern_swallows_bad_patterns() {
        assert!(!matches_pattern(r"broken\", "anything"));
        assert!(matches_pattern("release/*", "release/2.0"));
    }
}
