//! Text normalization for title/artist equivalence checks.
//!
//! Titles and artists go through the same pipeline so that every strategy
//! comparing "normalized" values compares like with like.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Parenthetical featuring credit: "(feat. Someone)", "(featuring Someone)"
pub static FEAT_PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\((?:feat\.?|featuring)\s+[^)]*\)").unwrap());

/// Trailing featuring credit: "Song feat. Someone", "Artist featuring Other"
pub static FEAT_TRAILING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\b(?:feat\.?|featuring)\s+.+$").unwrap());

/// Anything that is not a lowercase ASCII letter, digit or space
pub static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9 ]").unwrap());

pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Canonicalize a title or artist for equivalence comparison.
///
/// Lowercases, drops featuring credits, maps punctuation and non-ASCII
/// characters to spaces and collapses whitespace.
/// e.g., "HELLO (feat. X)" → "hello", "  The   Song   Name  " → "the song name"
pub fn normalize(text: &str) -> String {
    let mut result = text.to_lowercase();

    result = FEAT_PARENTHETICAL.replace_all(&result, "").to_string();
    result = FEAT_TRAILING.replace(&result, "").to_string();
    result = NON_ALPHANUMERIC.replace_all(&result, " ").to_string();
    result = MULTI_SPACE.replace_all(&result, " ").to_string();

    result.trim().to_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_lowercases() {
        assert_eq!(normalize("Hello!!!"), "hello");
        assert_eq!(normalize("Don't Stop Me Now"), "don t stop me now");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  The   Song   Name  "), "the song name");
        assert_eq!(normalize("Tab\tSeparated\nWords"), "tab separated words");
    }

    #[test]
    fn test_normalize_removes_feat() {
        assert_eq!(normalize("HELLO (feat. X)"), normalize("hello"));
        assert_eq!(normalize("Song (featuring Someone Else) Remix"), "song remix");
        assert_eq!(normalize("Drake feat. Rihanna"), "drake");
        assert_eq!(normalize("Artist featuring Other, Third"), "artist");
    }

    #[test]
    fn test_normalize_keeps_feat_inside_words() {
        assert_eq!(normalize("Defeat Me Now"), "defeat me now");
    }

    #[test]
    fn test_normalize_non_ascii_becomes_space() {
        assert_eq!(normalize("Beyoncé"), "beyonc");
        assert_eq!(normalize("AC/DC"), "ac dc");
    }

    #[test]
    fn test_normalize_is_total() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("!!!"), "");
        assert_eq!(normalize("   "), "");
    }
}
