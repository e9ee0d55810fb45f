//! Scoring functions for mention reconciliation.
//!
//! This module contains all scoring-related functions including:
//! - String similarity (exact / containment / word overlap / edit distance)
//! - Pairwise mention similarity with artist and cross-field checks
//! - Version scoring for picking the best record inside a cluster
//! - Quality scoring for picking the survivor among near-duplicates

use crate::config::{QualityWeights, SimilarityConfig, VersionWeights};
use crate::models::{CanonicalTrack, Platform, TrackMention};
use crate::normalize::{clean_artist, clean_title, credited_artist_count, normalize, CleanedArtist, CleanedTitle};

// ============================================================================
// Word Filtering
// ============================================================================

/// Words that carry no identity: version tags and articles.
pub const STOP_WORDS: &[&str] = &[
    "the",
    "a",
    "mix",
    "remix",
    "edit",
    "version",
    "original",
    "extended",
    "dub",
    "instrumental",
];

fn content_words(s: &str) -> Vec<&str> {
    let mut words: Vec<&str> = Vec::new();
    for word in s.split_whitespace() {
        if !STOP_WORDS.contains(&word) && !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

// ============================================================================
// String Similarity
// ============================================================================

/// Levenshtein similarity normalized by the longer string (0.0 to 1.0).
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Word-overlap score: exact word matches count 1, near-miss spellings
/// (edit similarity above `fuzzy_threshold`) count 0.5.
pub fn word_overlap(a: &str, b: &str, fuzzy_threshold: f64) -> f64 {
    let words_a = content_words(a);
    let words_b = content_words(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let mut used = vec![false; words_b.len()];
    let mut unmatched: Vec<&str> = Vec::new();
    let mut exact = 0usize;
    for &word in &words_a {
        match words_b.iter().position(|w| *w == word) {
            Some(j) => {
                used[j] = true;
                exact += 1;
            }
            None => unmatched.push(word),
        }
    }

    let mut fuzzy = 0usize;
    for word in unmatched {
        let hit = words_b
            .iter()
            .enumerate()
            .find(|(j, w)| !used[*j] && edit_similarity(word, w) > fuzzy_threshold)
            .map(|(j, _)| j);
        if let Some(j) = hit {
            used[j] = true;
            fuzzy += 1;
        }
    }

    let longest = words_a.len().max(words_b.len()) as f64;
    (exact as f64 + 0.5 * fuzzy as f64) / longest
}

/// Similarity between two free-text strings (0.0 to 1.0).
pub fn string_similarity_with(a: &str, b: &str, fuzzy_threshold: f64) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if longer.contains(shorter.as_str()) {
        let ratio = shorter.chars().count() as f64 / longer.chars().count() as f64;
        return 0.7 + 0.3 * ratio;
    }

    word_overlap(&a, &b, fuzzy_threshold)
}

pub fn string_similarity(a: &str, b: &str) -> f64 {
    string_similarity_with(a, b, SimilarityConfig::default().high_similarity)
}

// ============================================================================
// Artist Similarity
// ============================================================================

/// Best pairwise similarity across every credited artist on both sides,
/// lifted to the containment floor when one credit names the other's primary.
pub fn artist_similarity(a: &CleanedArtist, b: &CleanedArtist, config: &SimilarityConfig) -> f64 {
    if a.all.is_empty() || b.all.is_empty() {
        return 0.0;
    }

    let mut best: f64 = 0.0;
    for token_a in &a.all {
        for token_b in &b.all {
            best = best.max(string_similarity_with(token_a, token_b, config.high_similarity));
        }
    }

    let contains_primary = (!b.primary.is_empty() && a.normalized.contains(b.primary.as_str()))
        || (!a.primary.is_empty() && b.normalized.contains(a.primary.as_str()));
    if contains_primary {
        best = best.max(config.artist_containment_floor);
    }
    best
}

// ============================================================================
// Mention Similarity
// ============================================================================

/// Cleaned title/artist pair, computed once per mention or track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionKey {
    pub title: CleanedTitle,
    pub artist: CleanedArtist,
}

impl MentionKey {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: clean_title(title),
            artist: clean_artist(artist),
        }
    }

    pub fn of_mention(mention: &TrackMention) -> Self {
        Self::new(&mention.title, &mention.artist)
    }

    pub fn of_track(track: &CanonicalTrack) -> Self {
        Self::new(&track.title, &track.artist)
    }

    fn joined(&self) -> String {
        format!("{} {}", self.title.cleaned, self.artist.normalized)
    }
}

/// Component scores behind one similarity verdict, for debug logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityBreakdown {
    pub title: f64,
    pub artist: f64,
    pub cross: f64,
    pub label_match: bool,
    pub score: f64,
}

pub fn similarity_breakdown(a: &MentionKey, b: &MentionKey, config: &SimilarityConfig) -> SimilarityBreakdown {
    let fuzzy = config.high_similarity;
    let title = string_similarity_with(&a.title.cleaned, &b.title.cleaned, fuzzy);
    let artist = artist_similarity(&a.artist, &b.artist, config);

    let mut score = config.title_weight * title + config.artist_weight * artist;

    // Extraction sometimes swaps which half of "X - Y" is the artist
    let cross = string_similarity_with(&a.title.cleaned, &b.artist.normalized, fuzzy)
        .max(string_similarity_with(&a.artist.normalized, &b.title.cleaned, fuzzy))
        .max(string_similarity_with(&a.joined(), &b.joined(), fuzzy));
    if cross > config.cross_field_trigger {
        score = score.max(config.cross_field_weight * cross);
    }

    let label_match = match (&a.title.label, &b.title.label) {
        (Some(la), Some(lb)) => string_similarity_with(la, lb, fuzzy) > config.high_similarity,
        _ => false,
    };
    if label_match {
        score += config.label_bonus;
    }

    // near-identical titles floor the score regardless of artist
    if title > config.high_similarity {
        score = score.max(config.title_floor);
    }

    SimilarityBreakdown {
        title,
        artist,
        cross,
        label_match,
        score: score.min(1.0),
    }
}

pub fn similarity_with(a: &MentionKey, b: &MentionKey, config: &SimilarityConfig) -> f64 {
    similarity_breakdown(a, b, config).score
}

/// Similarity of two (title, artist) claims with default weights (0.0 to 1.0).
pub fn similarity(title1: &str, artist1: &str, title2: &str, artist2: &str) -> f64 {
    similarity_with(
        &MentionKey::new(title1, artist1),
        &MentionKey::new(title2, artist2),
        &SimilarityConfig::default(),
    )
}

// ============================================================================
// Record Selection Scores
// ============================================================================

fn title_len_in(title: &str, min: usize, max: usize) -> bool {
    let len = title.trim().chars().count();
    (min..=max).contains(&len)
}

/// How well-written a mention is, for choosing a cluster's base record.
pub fn version_score(mention: &TrackMention, weights: &VersionWeights) -> f64 {
    let mut score = mention.confidence;
    if title_len_in(&mention.title, weights.title_len_min, weights.title_len_max) {
        score += weights.title_len_bonus;
    }
    if credited_artist_count(&mention.artist) >= 2 {
        score += weights.multi_artist_bonus;
    }
    if mention.platform == Platform::Description {
        score += weights.description_bonus;
    }
    if mention.likes > weights.likes_threshold {
        score += weights.likes_bonus;
    }
    score
}

/// Completeness/reliability of a resolved track, for choosing which of two
/// near-duplicates survives.
pub fn quality_score(track: &CanonicalTrack, weights: &QualityWeights) -> f64 {
    let mut score = track.confidence;
    if title_len_in(&track.title, weights.title_len_min, weights.title_len_max) {
        score += weights.title_len_bonus;
    }
    if credited_artist_count(&track.artist) >= 2 {
        score += weights.multi_artist_bonus;
    }
    if track.platform == Platform::Description {
        score += weights.description_bonus;
    }
    if track.likes > weights.likes_threshold {
        score += weights.likes_bonus;
    }
    if track.likes > weights.high_likes_threshold {
        score += weights.high_likes_bonus;
    }
    if track.timestamp_seconds > weights.late_timestamp_secs {
        score -= weights.late_timestamp_penalty;
    }
    score
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn mention(title: &str, artist: &str, platform: Platform, likes: u32, confidence: f64) -> TrackMention {
        TrackMention {
            title: title.to_string(),
            artist: artist.to_string(),
            timestamp_seconds: 0,
            platform,
            source_author: "someone".to_string(),
            likes,
            confidence,
            position: None,
        }
    }

    #[test]
    fn test_string_similarity_exact_and_contains() {
        assert_eq!(string_similarity("Losing It", "losing it!"), 1.0);
        // "rave" inside "rave track": 0.7 + 0.3 * 4/10
        assert!((string_similarity("Rave", "Rave Track") - 0.82).abs() < EPS);
        assert_eq!(string_similarity("", "anything"), 0.0);
    }

    #[test]
    fn test_string_similarity_fuzzy_word() {
        // "it" exact, "losing"/"losin" fuzzy: (1 + 0.5) / 2
        assert!((string_similarity("losing it", "losin it") - 0.75).abs() < EPS);
    }

    #[test]
    fn test_string_similarity_ignores_stop_words() {
        assert_eq!(string_similarity("Strobe (Original Mix)", "Strobe (Extended Mix)"), 1.0);
        assert_eq!(string_similarity("Remix", "Edit"), 0.0);
    }

    #[test]
    fn test_edit_similarity() {
        assert!((edit_similarity("losing", "losin") - (1.0 - 1.0 / 6.0)).abs() < EPS);
        assert_eq!(edit_similarity("abc", "abc"), 1.0);
    }

    #[test]
    fn test_similarity_identical_claims() {
        let score = similarity("Losing It", "Fisher", "losing it", "FISHER");
        assert!((score - 1.0).abs() < EPS);
    }

    #[test]
    fn test_similarity_unrelated_claims() {
        assert!(similarity("Losing It", "Fisher", "Stay", "The Kid Laroi") < 0.55);
    }

    #[test]
    fn test_similarity_swapped_fields() {
        let score = similarity("Fisher", "Losing It", "Losing It", "Fisher");
        assert!((score - 0.85).abs() < EPS);
    }

    #[test]
    fn test_similarity_title_floor() {
        // Same title, unrelated artist credit: 0.7 lifted to the 0.75 floor
        let score = similarity("Losing It", "Fisher", "Losing It", "Someone Else");
        assert!((score - 0.75).abs() < EPS);
    }

    #[test]
    fn test_similarity_artist_containment() {
        let a = clean_artist("Adam Beyer & Bart Skils");
        let b = clean_artist("Adam Beyer");
        assert_eq!(artist_similarity(&a, &b, &SimilarityConfig::default()), 1.0);

        let c = clean_artist("Beyer");
        let d = clean_artist("Adam Beyer");
        // containment score 0.85 beats the 0.8 floor
        assert!((artist_similarity(&c, &d, &SimilarityConfig::default()) - 0.85).abs() < EPS);
    }

    #[test]
    fn test_similarity_label_bonus() {
        let with_label = similarity("Rave [Drumcode]", "Adam Beyer", "Rave Track [Drumcode]", "Beyer");
        let without_label = similarity("Rave", "Adam Beyer", "Rave Track", "Beyer");
        assert!((with_label - without_label - 0.1).abs() < EPS);
    }

    #[test]
    fn test_similarity_is_symmetric_enough_for_identity() {
        let ab = similarity("Losing It", "Fisher", "Losin It", "Fisher");
        let ba = similarity("Losin It", "Fisher", "Losing It", "Fisher");
        assert!((ab - ba).abs() < EPS);
    }

    #[test]
    fn test_version_score() {
        let weights = VersionWeights::default();
        let plain = mention("Losing It", "Fisher", Platform::Youtube, 0, 0.5);
        // 0.5 + title length bonus
        assert!((version_score(&plain, &weights) - 0.6).abs() < EPS);

        let rich = mention("Losing It", "Fisher & Chris Lake", Platform::Description, 10, 0.5);
        // 0.5 + 0.1 + 0.1 + 0.15 + 0.05
        assert!((version_score(&rich, &weights) - 0.9).abs() < EPS);

        let short = mention("Go", "Fisher", Platform::Youtube, 0, 0.5);
        assert!((version_score(&short, &weights) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_quality_score() {
        let weights = QualityWeights::default();
        let mut track = CanonicalTrack {
            title: "Losing It".to_string(),
            artist: "Fisher".to_string(),
            timestamp_seconds: 600,
            is_interpolated: false,
            confidence: 0.5,
            sources: vec![],
            has_conflict: false,
            conflict_id: None,
            platform: Platform::Description,
            likes: 60,
            aliases: vec![],
            duration_seconds: None,
        };
        // 0.5 + 0.1 (title) + 0.2 (description) + 0.1 + 0.1 (likes)
        assert!((quality_score(&track, &weights) - 1.0).abs() < EPS);

        track.timestamp_seconds = 8000;
        assert!((quality_score(&track, &weights) - 0.95).abs() < EPS);
    }
}
