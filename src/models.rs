//! Core data models for tracklist reconciliation.
//!
//! This module contains the mention/track/conflict records that flow through
//! the pipeline, plus the import request and output envelopes used by the CLI.

use serde::{Deserialize, Serialize};

use crate::normalize::parse_timestamp;

// ============================================================================
// Input Models
// ============================================================================

/// Where a mention was harvested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Soundcloud,
    /// Uploader-authored description text (the most reliable source)
    Description,
}

/// One claim about a track at (approximately) one point in the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMention {
    pub title: String,
    pub artist: String,
    /// 0 means unknown / unanchored
    #[serde(default)]
    pub timestamp_seconds: u32,
    pub platform: Platform,
    #[serde(default)]
    pub source_author: String,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub confidence: f64,
    /// Order index inside a non-timestamped tracklist block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl TrackMention {
    pub fn is_anchored(&self) -> bool {
        self.timestamp_seconds > 0
    }
}

/// Mention as it appears in an import file. Either `timestampSeconds` or a cue
/// string like "1:23:45" may be given.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMention {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub timestamp_seconds: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub platform: Platform,
    #[serde(default)]
    pub source_author: String,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub position: Option<u32>,
}

impl From<RawMention> for TrackMention {
    fn from(raw: RawMention) -> Self {
        let timestamp_seconds = match (raw.timestamp_seconds, raw.timestamp.as_deref()) {
            (Some(secs), _) => secs,
            (None, Some(cue)) => parse_timestamp(cue).unwrap_or_else(|err| {
                tracing::warn!(cue, %err, "unparseable cue, treating mention as unanchored");
                0
            }),
            (None, None) => 0,
        };
        TrackMention {
            title: raw.title,
            artist: raw.artist,
            timestamp_seconds,
            platform: raw.platform,
            source_author: raw.source_author,
            likes: raw.likes,
            confidence: raw.confidence,
            position: raw.position,
        }
    }
}

/// One import: the already-extracted mentions plus the media's duration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub mentions: Vec<RawMention>,
    #[serde(default)]
    pub total_duration_seconds: i64,
}

impl ImportRequest {
    pub fn into_mentions(self) -> (Vec<TrackMention>, i64) {
        let mentions = self.mentions.into_iter().map(TrackMention::from).collect();
        (mentions, self.total_duration_seconds)
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Provenance entry, one per contributing mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub platform: Platform,
    pub timestamp_seconds: u32,
    pub contributed_by: String,
    pub confidence: f64,
}

impl From<&TrackMention> for SourceRef {
    fn from(mention: &TrackMention) -> Self {
        SourceRef {
            platform: mention.platform,
            timestamp_seconds: mention.timestamp_seconds,
            contributed_by: mention.source_author.clone(),
            confidence: mention.confidence,
        }
    }
}

/// One resolved entry in the final tracklist.
///
/// `platform` and `likes` describe the record the title/artist were taken
/// from; the deduplicator's quality score reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTrack {
    pub title: String,
    pub artist: String,
    pub timestamp_seconds: u32,
    pub is_interpolated: bool,
    pub confidence: f64,
    pub sources: Vec<SourceRef>,
    pub has_conflict: bool,
    pub conflict_id: Option<String>,
    pub platform: Platform,
    pub likes: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Unknown from mentions; filled by enrichment collaborators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

impl CanonicalTrack {
    pub fn is_anchor(&self) -> bool {
        self.timestamp_seconds > 0 && !self.is_interpolated
    }

    /// Copy of this track placed at a synthetic timestamp.
    pub fn with_interpolated_timestamp(&self, timestamp_seconds: u32) -> CanonicalTrack {
        CanonicalTrack {
            timestamp_seconds,
            is_interpolated: true,
            ..self.clone()
        }
    }

    /// Record a differently-spelled title without duplicating it.
    pub fn push_alias(&mut self, alias: &str) {
        let alias = alias.trim();
        if alias.is_empty() || alias == self.title {
            return;
        }
        if !self.aliases.iter().any(|a| a == alias) {
            self.aliases.push(alias.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStatus {
    Active,
    Resolved,
}

/// One candidate identity offered for a vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictOption {
    pub title: String,
    pub artist: String,
    pub source: Platform,
    pub confidence: f64,
    pub contributed_by: String,
    pub support_count: usize,
}

/// Unresolved ambiguity requiring human input. `options[0]` is the track
/// materialized into the canonical list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: String,
    pub timestamp: u32,
    pub options: Vec<ConflictOption>,
    /// Opaque to the engine.
    pub votes: Vec<serde_json::Value>,
    pub status: ConflictStatus,
}

/// Stretch of the timeline with no resolved track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: u32,
    pub end: u32,
    pub duration: u32,
}

impl Gap {
    pub fn new(start: u32, end: u32) -> Self {
        Gap {
            start,
            end,
            duration: end.saturating_sub(start),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOutput {
    pub tracks: Vec<CanonicalTrack>,
    pub conflicts: Vec<Conflict>,
    pub gaps: Vec<Gap>,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-import counters, logged once the pipeline finishes.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileStats {
    pub mentions_in: usize,
    pub mentions_dropped: usize,

    // Segmenter
    pub timed_segments: usize,
    pub ordered_segments: usize,

    // Cluster resolver
    pub clusters: usize,
    pub single_mention_tracks: usize,
    pub merged_clusters: usize,
    pub auto_resolved: usize,
    pub conflicts: usize,

    // Post-processing
    pub dedupe_merges: usize,
    pub interpolated: usize,
    pub gaps: usize,
    pub final_tracks: usize,
}

impl ReconcileStats {
    /// Share of segments that needed a human vote, as a percentage
    pub fn conflict_rate(&self) -> f64 {
        let segments = self.timed_segments + self.ordered_segments;
        if segments == 0 {
            0.0
        } else {
            100.0 * self.conflicts as f64 / segments as f64
        }
    }

    /// Fold another import's counters into this one (batch totals)
    pub fn absorb(&mut self, other: &ReconcileStats) {
        self.mentions_in += other.mentions_in;
        self.mentions_dropped += other.mentions_dropped;
        self.timed_segments += other.timed_segments;
        self.ordered_segments += other.ordered_segments;
        self.clusters += other.clusters;
        self.single_mention_tracks += other.single_mention_tracks;
        self.merged_clusters += other.merged_clusters;
        self.auto_resolved += other.auto_resolved;
        self.conflicts += other.conflicts;
        self.dedupe_merges += other.dedupe_merges;
        self.interpolated += other.interpolated;
        self.gaps += other.gaps;
        self.final_tracks += other.final_tracks;
    }

    /// Log stats as pretty JSON
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            tracing::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
