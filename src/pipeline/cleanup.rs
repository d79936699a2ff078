//! Deterministic cleanup of raw OCR output before it is written.
//!
//! Tesseract's text is mostly right but carries engine artefacts: a form feed
//! after every page, CRLF on Windows builds, runs of trailing spaces from
//! justified columns, zero-width characters, and typographic ligatures that
//! break search and diffing. Each rule is a pure `&str → String` pass.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule only sees `\n`.
//! The final-newline pass runs last because earlier rules may leave trailing
//! blank lines behind.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of OCR output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Drop form feeds and NULs
/// 3. Strip invisible Unicode (zero-width space, BOM, soft hyphen, joiners)
/// 4. Expand typographic ligatures (`ﬁ` → `fi`)
/// 5. Trim trailing whitespace per line
/// 6. Collapse 3+ consecutive blank lines down to 2
/// 7. End with exactly one newline; a page with no text stays empty
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_control_chars(&s);
    let s = remove_invisible_chars(&s);
    let s = expand_ligatures(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_control_chars(input: &str) -> String {
    input.replace(['\u{c}', '\0'], "")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn expand_ligatures(input: &str) -> String {
    const LIGATURES: [(char, &str); 7] = [
        ('\u{FB00}', "ff"),
        ('\u{FB01}', "fi"),
        ('\u{FB02}', "fl"),
        ('\u{FB03}', "ffi"),
        ('\u{FB04}', "ffl"),
        ('\u{FB05}', "st"),
        ('\u{FB06}', "st"),
    ];
    if !input.chars().any(|c| ('\u{FB00}'..='\u{FB06}').contains(&c)) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match LIGATURES.iter().find(|(lig, _)| *lig == c) {
            Some((_, expanded)) => out.push_str(expanded),
            None => out.push(c),
        }
    }
    out
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_form_feed_removed() {
        assert_eq!(clean_text("Hello world\n\u{c}"), "Hello world\n");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("a   \nb\t\n c "), "a\nb\n c");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("in\u{200B}voice\u{FEFF}"), "invoice");
    }

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("e\u{FB03}cient \u{FB01}le"), "efficient file");
        assert_eq!(expand_ligatures("plain"), "plain");
    }

    #[test]
    fn test_empty_page_stays_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text(" \n\u{c}\n  "), "");
    }

    #[test]
    fn test_clean_text_full_pipeline() {
        let raw = "Chapter 1  \r\n\r\n\r\n\r\n\r\nThe \u{FB01}rst line.\u{200B}\r\n\u{c}";
        assert_eq!(clean_text(raw), "Chapter 1\n\n\nThe first line.\n");
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        let once = clean_text("a \r\n\n\n\n\nb\u{c}");
        assert_eq!(clean_text(&once), once);
    }
}
