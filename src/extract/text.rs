//! Cleaning of extracted page text before enrichment.

use regex::Regex;
use std::sync::LazyLock;

/// `Page N of M` footers, tolerant of the whitespace pdftotext leaves behind.
static PAGE_FOOTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Page\s+\d+\s+of\s+\d+").unwrap());

/// Runs of two or more spaces.
static EXCESS_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Runs of three or more newlines.
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Clean extracted text for model processing.
///
/// Strips `Page N of M` footers, collapses space runs to one space and
/// newline runs to one blank line, and trims. Idempotent:
/// `clean_text(clean_text(s)) == clean_text(s)`.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // Footer removal first: it can leave behind space and newline runs,
    // which the following passes then collapse.
    let text = PAGE_FOOTER.replace_all(text, "");
    let text = EXCESS_SPACES.replace_all(&text, " ");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// Bound text to `max_chars` characters for the model prompt, appending a
/// visible truncation marker when anything was dropped.
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }

    // Find a valid UTF-8 boundary at or before max_chars
    let mut end = max_chars;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}\n\n[Document truncated...]", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_newlines() {
        assert_eq!(clean_text("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_collapse_spaces() {
        assert_eq!(clean_text("a    b"), "a b");
    }

    #[test]
    fn test_strip_page_footer() {
        assert_eq!(clean_text("before\nPage 3 of 12\nafter"), "before\n\nafter");
        assert_eq!(clean_text("x Page 1 of 2 y"), "x y");
    }

    #[test]
    fn test_trims() {
        assert_eq!(clean_text("  \n hello \n  "), "hello");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "a\n\n\n\nb",
            "x Page 1 of 2 y",
            "a\n\nPage 1 of 2\n\nb",
            "Page 1  of  2 end",
            "  mixed   spaces\n\n\nand newlines\nPage 9 of 9  ",
        ];
        for input in inputs {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_truncate_for_prompt() {
        assert_eq!(truncate_for_prompt("short", 100), "short");

        let truncated = truncate_for_prompt(&"x".repeat(200), 100);
        assert!(truncated.starts_with(&"x".repeat(100)));
        assert!(truncated.ends_with("[Document truncated...]"));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // 'é' is two bytes; cutting at byte 1 would split it
        let truncated = truncate_for_prompt("ééé", 1);
        assert!(truncated.ends_with("[Document truncated...]"));
    }
}
