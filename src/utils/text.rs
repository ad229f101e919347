// src/utils/text.rs

//! Text normalization helpers shared by adapters and the deduplicator.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use unicode_segmentation::UnicodeSegmentation;

/// Replace diacritics with their base letters.
///
/// Letters that do not decompose (`ø`, `æ`, `ß`, ...) are mapped explicitly.
pub fn fold_diacritics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        match c {
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'ß' => out.push_str("ss"),
            'đ' => out.push('d'),
            'Đ' => out.push('D'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("TH"),
            _ => out.push(c),
        }
    }
    out
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase, fold diacritics, drop punctuation, collapse whitespace.
///
/// Word boundaries follow Unicode segmentation, so `"Career-Day: Oslo!"`
/// becomes `"career day oslo"`.
pub fn normalize_words(text: &str) -> String {
    let folded = fold_diacritics(&text.to_lowercase());
    folded.unicode_words().collect::<Vec<_>>().join(" ")
}

/// URL-safe slug: `"Karrieredag på Høgskolen!"` → `"karrieredag-pa-hogskolen"`.
pub fn slugify(text: &str) -> String {
    let folded = fold_diacritics(&text.to_lowercase());
    let mut slug = String::with_capacity(folded.len());
    let mut pending_dash = false;

    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}
