//! Tunable thresholds for the reconciliation pipeline.
//!
//! Every heuristic literal used by the scorer, resolver, deduplicator and gap
//! finder lives here so it can be overridden per run. `Default` reproduces the
//! calibrated values; a JSON override file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReconcileError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconcileConfig {
    /// Max gap between consecutive mentions of one segment (seconds)
    pub segment_window_secs: u32,
    /// Pairwise similarity needed to join a cluster inside a segment
    pub min_similarity: f64,
    /// Similarity at which two resolved tracks count as the same track
    pub dedupe_similarity: f64,
    /// Bonus per extra cluster member on the merged confidence
    pub corroboration_bonus: f64,
    pub max_conflict_options: usize,
    pub similarity: SimilarityConfig,
    pub dominance: DominanceConfig,
    pub version: VersionWeights,
    pub quality: QualityWeights,
    pub gaps: GapConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            segment_window_secs: 45,
            min_similarity: 0.55,
            dedupe_similarity: 0.85,
            corroboration_bonus: 0.1,
            max_conflict_options: 3,
            similarity: SimilarityConfig::default(),
            dominance: DominanceConfig::default(),
            version: VersionWeights::default(),
            quality: QualityWeights::default(),
            gaps: GapConfig::default(),
        }
    }
}

impl ReconcileConfig {
    /// Load overrides from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ReconcileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Weights and cut-offs of the pairwise similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimilarityConfig {
    pub title_weight: f64,
    pub artist_weight: f64,
    /// Used for fuzzy word matches, label matches and the title floor trigger
    pub high_similarity: f64,
    /// Score floor applied once titles alone exceed `high_similarity`
    pub title_floor: f64,
    /// Minimum artist score when one credit contains the other's primary name
    pub artist_containment_floor: f64,
    pub cross_field_trigger: f64,
    pub cross_field_weight: f64,
    pub label_bonus: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            title_weight: 0.7,
            artist_weight: 0.3,
            high_similarity: 0.8,
            title_floor: 0.75,
            artist_containment_floor: 0.8,
            cross_field_trigger: 0.7,
            cross_field_weight: 0.85,
            label_bonus: 0.1,
        }
    }
}

/// When a multi-cluster segment may be settled without a vote.
///
/// These values were picked empirically and still need calibration against
/// labeled tracklists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DominanceConfig {
    pub count_gap: usize,
    pub confidence_gap: f64,
    pub confidence_floor: f64,
}

impl Default for DominanceConfig {
    fn default() -> Self {
        Self {
            count_gap: 2,
            confidence_gap: 0.25,
            confidence_floor: 0.80,
        }
    }
}

/// Bonuses for picking the best-written member of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VersionWeights {
    pub title_len_min: usize,
    pub title_len_max: usize,
    pub title_len_bonus: f64,
    pub multi_artist_bonus: f64,
    pub description_bonus: f64,
    pub likes_threshold: u32,
    pub likes_bonus: f64,
}

impl Default for VersionWeights {
    fn default() -> Self {
        Self {
            title_len_min: 5,
            title_len_max: 50,
            title_len_bonus: 0.1,
            multi_artist_bonus: 0.1,
            description_bonus: 0.15,
            likes_threshold: 5,
            likes_bonus: 0.05,
        }
    }
}

/// Bonuses for picking the survivor among near-duplicate canonical tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualityWeights {
    pub title_len_min: usize,
    pub title_len_max: usize,
    pub title_len_bonus: f64,
    pub multi_artist_bonus: f64,
    pub description_bonus: f64,
    pub likes_threshold: u32,
    pub likes_bonus: f64,
    pub high_likes_threshold: u32,
    pub high_likes_bonus: f64,
    /// Timestamps past this are more often typos than real cues
    pub late_timestamp_secs: u32,
    pub late_timestamp_penalty: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            title_len_min: 5,
            title_len_max: 60,
            title_len_bonus: 0.1,
            multi_artist_bonus: 0.1,
            description_bonus: 0.2,
            likes_threshold: 10,
            likes_bonus: 0.1,
            high_likes_threshold: 50,
            high_likes_bonus: 0.1,
            late_timestamp_secs: 7200,
            late_timestamp_penalty: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GapConfig {
    /// Assumed length of a track whose own duration is unknown
    pub assumed_track_secs: u32,
    pub min_track_gap_secs: u32,
    pub max_silence_secs: u32,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            assumed_track_secs: 180,
            min_track_gap_secs: 60,
            max_silence_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(config.segment_window_secs, 45);
        assert_eq!(config.min_similarity, 0.55);
        assert_eq!(config.dominance.count_gap, 2);
        assert_eq!(config.gaps.assumed_track_secs, 180);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config: ReconcileConfig = serde_json::from_str(
            r#"{"segmentWindowSecs": 30, "dominance": {"confidenceFloor": 0.9}}"#,
        )
        .unwrap();
        assert_eq!(config.segment_window_secs, 30);
        assert_eq!(config.dominance.confidence_floor, 0.9);
        assert_eq!(config.dominance.count_gap, 2);
        assert_eq!(config.min_similarity, 0.55);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ReconcileConfig::from_json_file(Path::new("/nonexistent/reconcile.json"))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Io { .. }));
    }
}
