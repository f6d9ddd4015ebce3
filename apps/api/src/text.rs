//! Small text helpers shared by the ingestion paths.

use std::sync::OnceLock;

use regex::Regex;

/// Chat UI citation markers: everything from U+E200 to the next U+E201.
fn citation_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("\u{E200}.*?\u{E201}").unwrap())
}

/// Removes citation markers left by chat-based parsers, then trims.
pub fn strip_citations(text: &str) -> String {
    citation_marker().replace_all(text, "").trim().to_string()
}

/// Splits a comma-separated list, trimming and dropping blanks.
pub fn split_csv(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn join_list(items: &[String]) -> String {
    items.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_citations_removes_markers() {
        let raw = "Build APIs \u{E200}cite\u{E202}turn0search1\u{E201} and services.  ";
        assert_eq!(strip_citations(raw), "Build APIs  and services.");
    }

    #[test]
    fn test_strip_citations_is_non_greedy() {
        let raw = "a\u{E200}x\u{E201}b\u{E200}y\u{E201}c";
        assert_eq!(strip_citations(raw), "abc");
    }

    #[test]
    fn test_split_and_join() {
        let items = split_csv(" 5 years Java ,, SQL ,");
        assert_eq!(items, vec!["5 years Java", "SQL"]);
        assert_eq!(join_list(&items), "5 years Java, SQL");
        assert!(split_csv("  ").is_empty());
    }
}
