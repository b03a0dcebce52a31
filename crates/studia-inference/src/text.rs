//! Line and paragraph counting shared by the parser and validator.

use std::sync::OnceLock;

use regex::Regex;

fn bullet_regex() -> &'static Regex {
    static BULLET: OnceLock<Regex> = OnceLock::new();
    BULLET.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*•‣◦▪]|\d{1,3}[.)])\s+\S").expect("bullet pattern is valid")
    })
}

/// Whether a line starts with a bullet marker (`-`, `*`, `•`, `1.`, `2)`, ...).
pub(crate) fn is_bulleted_line(line: &str) -> bool {
    bullet_regex().is_match(line)
}

/// Number of bulleted lines in a newline-joined summary.
pub(crate) fn count_bullets(text: &str) -> usize {
    text.lines().filter(|l| is_bulleted_line(l)).count()
}

/// Number of blank-line-separated paragraphs longer than `min_chars`.
pub(crate) fn count_paragraphs(text: &str, min_chars: usize) -> usize {
    paragraphs(text)
        .filter(|p| p.chars().count() > min_chars)
        .count()
}

fn paragraphs(text: &str) -> impl Iterator<Item = String> + '_ {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        blocks.push(current.join(" "));
    }
    blocks.into_iter()
}
