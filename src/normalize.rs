//! String normalization for track mentions.
//!
//! Titles and artists arrive straight from comment text, so besides casing and
//! punctuation we strip user commentary ("(banger)", "(ID?)"), emoji and
//! trailing label markers, and split collaboration credits into tokens.
//!
//! Everything here is a pure function of its input.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{ReconcileError, Result};

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Parenthetical reactions people append to a title. Optional trailing "!"/"?"
/// and emoji inside the brackets are tolerated.
pub static COMMENTARY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // "(banger)", "(absolute banger!!)", "[fire]", "(what a tune)"
        Regex::new(r"(?i)\s*[\(\[]\s*(?:absolute\s+|massive\s+|such\s+a\s+)?(?:banger|fire|heater|tune|what\s+a\s+tune|anthem|classic|bomb|insane|goat)\s*[!?.]*\s*[\)\]]").unwrap(),
        // Unknown/unreleased markers: "(ID?)", "[ID]", "(unreleased)", "(forthcoming)", "(dub?)"
        Regex::new(r"(?i)\s*[\(\[]\s*(?:id|unreleased|forthcoming|unknown|not\s+sure|anyone\s+know|dub\s*\?)\s*[!?.]*\s*[\)\]]").unwrap(),
        // Featured artists belong to the artist credit: "(feat. Artist)", "[ft. Someone]"
        Regex::new(r"(?i)\s*[\(\[](?:feat\.?|ft\.?|featuring)\s+[^)\]]+[\)\]]").unwrap(),
        // Brackets that held nothing but emoji/punctuation once emoji are gone: "()", "[!!]"
        Regex::new(r"\s*[\(\[]\s*[!?.]*\s*[\)\]]").unwrap(),
    ]
});

/// Trailing bracketed label marker: "Losing It [Catch & Release]"
pub static LABEL_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\[([^\]]+)\]\s*$").unwrap());

/// Emoji and the joiners/selectors that glue them together
pub static EMOJI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{Extended_Pictographic}\u{FE0F}\u{200D}]").unwrap());

/// Collaboration separators between credited artists:
/// &, ',', +, ×, and spaced x / vs / feat / ft / featuring / b2b
pub static ARTIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:[&,+×]|\s(?:x|vs\.?|feat\.?|ft\.?|featuring|b2b)\s)\s*").unwrap()
});

/// Anything that is neither a word character nor whitespace
pub static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Regex to collapse runs of whitespace into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII: NFKD, drop combining marks, then
/// transliterate whatever is left.
/// e.g., "Âme" → "ame", "Dixon & Âme" → "dixon & ame"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

fn strip_emoji(s: &str) -> String {
    EMOJI.replace_all(s, " ").to_string()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Lowercase, fold diacritics, strip punctuation, collapse whitespace.
pub fn normalize(s: &str) -> String {
    let folded = fold_to_ascii(&strip_emoji(s));
    let bare = PUNCTUATION.replace_all(&folded, "");
    MULTI_SPACE.replace_all(&bare, " ").trim().to_string()
}

/// Title with commentary removed, plus the label marker if one trailed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedTitle {
    /// Normalized residual title
    pub cleaned: String,
    /// Normalized label token, e.g. "catch release"
    pub label: Option<String>,
}

/// Raw title minus emoji and commentary, casing and label kept.
/// e.g., "losing it (banger) 🔥" → "losing it"
pub fn strip_commentary(raw: &str) -> String {
    let mut result = strip_emoji(raw);
    for pattern in COMMENTARY_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }
    MULTI_SPACE.replace_all(&result, " ").trim().to_string()
}

pub fn clean_title(raw: &str) -> CleanedTitle {
    let mut result = strip_commentary(raw);

    let mut label = None;
    if let Some(caps) = LABEL_SUFFIX.captures(&result) {
        let token = normalize(&caps[1]);
        if !token.is_empty() {
            label = Some(token);
        }
        result = LABEL_SUFFIX.replace(&result, "").to_string();
    }

    CleanedTitle {
        cleaned: normalize(&result),
        label,
    }
}

/// Artist credit split into normalized tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedArtist {
    /// First credited artist
    pub primary: String,
    /// All credited artists in credit order, without duplicates
    pub all: Vec<String>,
    /// Space-joined tokens, for substring checks
    pub normalized: String,
}

impl CleanedArtist {
    pub fn credit_count(&self) -> usize {
        self.all.len()
    }
}

/// Split a credit like "Dixon & Âme feat. Rampa" into ["dixon", "ame", "rampa"].
pub fn clean_artist(raw: &str) -> CleanedArtist {
    let unbracketed = strip_emoji(raw).replace(['(', ')', '[', ']'], " ");
    let padded = format!(" {} ", unbracketed.trim());

    let mut all: Vec<String> = Vec::new();
    for part in ARTIST_SEPARATOR.split(&padded) {
        let token = normalize(part);
        if !token.is_empty() && !all.contains(&token) {
            all.push(token);
        }
    }

    CleanedArtist {
        primary: all.first().cloned().unwrap_or_default(),
        normalized: all.join(" "),
        all,
    }
}

/// Number of distinct artists credited in a raw artist string.
pub fn credited_artist_count(raw: &str) -> usize {
    clean_artist(raw).credit_count()
}

/// Capitalize words that were typed all-lowercase; words with any capital
/// ("DJ", "MK", "deadMau5") keep their casing.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            if word.chars().any(|c| c.is_uppercase()) {
                return word.to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a cue like "1:23:45", "47:30" or "95" to seconds.
pub fn parse_timestamp(cue: &str) -> Result<u32> {
    let invalid = || ReconcileError::InvalidTimestamp(cue.to_string());
    let trimmed = cue.trim().trim_start_matches('[').trim_end_matches(']');
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let parts = trimmed
        .split(':')
        .map(|p| p.trim().parse::<u32>().map_err(|_| invalid()))
        .collect::<Result<Vec<u32>>>()?;

    let total = match parts.as_slice() {
        [secs] => Some(*secs),
        [mins, secs] if *secs < 60 => mins.checked_mul(60).and_then(|m| m.checked_add(*secs)),
        [hours, mins, secs] if *mins < 60 && *secs < 60 => hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(mins * 60 + secs)),
        _ => None,
    };
    total.ok_or_else(invalid)
}

// ============================================================================
// TESTS
// ============================================================================
