//! Text normalization for raw OCR output.
//!
//! Canonicalizes scanner text before any pattern runs against it: horizontal
//! whitespace runs collapse to single spaces, runs of blank lines collapse to
//! one, and a small fixed table of known OCR misreads is corrected. Line
//! breaks survive normalization because the extractors are line-aware.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Normalize raw OCR text. Deterministic, and a no-op on its own output.
/// Empty or whitespace-only input yields an empty string.
pub fn normalize_text(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    // Vertical bars are the most common OCR misread of the letter I.
    let text = text.replace('|', "I");

    let mut collapsed: Vec<String> = Vec::new();
    let mut previous_blank = false;
    for line in text.split('\n') {
        let line = collapse_spacing(line);
        if line.is_empty() {
            if !collapsed.is_empty() && !previous_blank {
                collapsed.push(String::new());
            }
            previous_blank = true;
        } else {
            collapsed.push(line);
            previous_blank = false;
        }
    }
    while collapsed.last().is_some_and(|l| l.is_empty()) {
        collapsed.pop();
    }

    tighten_currency(&collapsed.join("\n"))
}

/// Trim a line and collapse interior space and tab runs to single spaces.
fn collapse_spacing(line: &str) -> String {
    static HORIZONTAL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
    HORIZONTAL_WS.replace_all(line.trim(), " ").into_owned()
}

/// Join a currency symbol to the amount that follows it ("$ 100" -> "$100").
fn tighten_currency(text: &str) -> String {
    static CURRENCY_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$[ \t]+").unwrap());
    CURRENCY_GAP.replace_all(text, "$$").into_owned()
}

/// Counts reported in extraction-stage audit metadata.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TextStatistics {
    pub character_count: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub number_count: usize,
    pub email_count: usize,
    pub phone_count: usize,
    pub date_count: usize,
    pub currency_count: usize,
}

/// Character, word and pattern-hit counts for a block of text.
pub fn text_statistics(text: &str) -> TextStatistics {
    static NUMBERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\.?\d*\b").unwrap());
    static EMAILS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[a-zA-Z]{2,}\b").unwrap()
    });
    static PHONES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+?[1-9]?[0-9]{7,15}").unwrap());
    static DATES: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b\d{2,4}[/-]\d{1,2}[/-]\d{1,2}\b").unwrap()
    });
    static CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)[$€£¥₹]\s*\d+\.?\d*|\b\d+\.?\d*\s*(?:USD|EUR|GBP|JPY|INR)\b").unwrap()
    });

    if text.is_empty() {
        return TextStatistics::default();
    }

    TextStatistics {
        character_count: text.chars().count(),
        word_count: text.split_whitespace().count(),
        line_count: text.split('\n').count(),
        number_count: NUMBERS.find_iter(text).count(),
        email_count: EMAILS.find_iter(text).count(),
        phone_count: PHONES.find_iter(text).count(),
        date_count: DATES.find_iter(text).count(),
        currency_count: CURRENCY.find_iter(text).count(),
    }
}
