//! End-to-end reconciliation of one import.
//!
//! sanitize → segment → resolve each segment → global dedupe → interpolate →
//! gap scan. Pure and single-threaded: the same mentions in the same order
//! always produce the same output.

use crate::cluster::{resolve, ResolutionKind};
use crate::config::ReconcileConfig;
use crate::dedupe::dedupe_counted;
use crate::gaps::find_gaps;
use crate::interpolate::interpolate;
use crate::models::{CanonicalTrack, Conflict, ImportRequest, ReconcileOutput, ReconcileStats, TrackMention};
use crate::normalize::normalize;
use crate::segment::{segment, Segment};

/// Drop mentions with no usable title or artist and clamp confidences into
/// [0, 1]. Returns the kept mentions and the number dropped.
pub fn sanitize(mentions: &[TrackMention]) -> (Vec<TrackMention>, usize) {
    let mut kept = Vec::with_capacity(mentions.len());
    let mut dropped = 0;

    for mention in mentions {
        if normalize(&mention.title).is_empty() || normalize(&mention.artist).is_empty() {
            tracing::warn!(
                title = %mention.title,
                artist = %mention.artist,
                author = %mention.source_author,
                "dropping mention without title or artist"
            );
            dropped += 1;
            continue;
        }
        let confidence = if mention.confidence.is_nan() {
            0.0
        } else {
            mention.confidence.clamp(0.0, 1.0)
        };
        kept.push(TrackMention {
            confidence,
            ..mention.clone()
        });
    }

    (kept, dropped)
}

/// Keep only conflicts still attached to a surviving track. Dedupe can fold a
/// conflicted track into another one that already carries its own conflict.
pub fn retain_referenced_conflicts(conflicts: Vec<Conflict>, tracks: &[CanonicalTrack]) -> Vec<Conflict> {
    conflicts
        .into_iter()
        .filter(|conflict| {
            let referenced = tracks
                .iter()
                .any(|t| t.conflict_id.as_deref() == Some(conflict.id.as_str()));
            if !referenced {
                tracing::debug!(id = %conflict.id, "dropping conflict folded away by dedupe");
            }
            referenced
        })
        .collect()
}

/// Reconcile one import's mentions against a mix of `total_duration` seconds.
pub fn reconcile(
    mentions: &[TrackMention],
    total_duration: i64,
    config: &ReconcileConfig,
) -> (ReconcileOutput, ReconcileStats) {
    let mut stats = ReconcileStats {
        mentions_in: mentions.len(),
        ..Default::default()
    };

    let (mentions, dropped) = sanitize(mentions);
    stats.mentions_dropped = dropped;

    let segments = segment(&mentions, config.segment_window_secs);
    let mut tracks = Vec::new();
    let mut conflicts = Vec::new();

    for seg in &segments {
        match seg {
            Segment::Timed(_) => stats.timed_segments += 1,
            Segment::Ordered(_) => stats.ordered_segments += 1,
        }

        let resolution = resolve(seg, config);
        stats.clusters += resolution.clusters;
        match resolution.kind {
            ResolutionKind::Ordered | ResolutionKind::Single => {
                stats.single_mention_tracks += resolution.tracks.len()
            }
            ResolutionKind::Merged => stats.merged_clusters += 1,
            ResolutionKind::AutoResolved => stats.auto_resolved += 1,
            // counted after dedupe, once orphans are dropped
            ResolutionKind::Conflicted => {}
        }

        tracks.extend(resolution.tracks);
        conflicts.extend(resolution.conflicts);
    }
    tracing::debug!(
        segments = segments.len(),
        tracks = tracks.len(),
        conflicts = conflicts.len(),
        "segments resolved"
    );

    let (tracks, merges) = dedupe_counted(tracks, config);
    stats.dedupe_merges = merges;
    let conflicts = retain_referenced_conflicts(conflicts, &tracks);
    stats.conflicts = conflicts.len();

    let already_interpolated = tracks.iter().filter(|t| t.is_interpolated).count();
    let tracks = interpolate(&tracks, total_duration);
    stats.interpolated = tracks.iter().filter(|t| t.is_interpolated).count() - already_interpolated;

    let gaps = find_gaps(&tracks, total_duration, &config.gaps);
    stats.gaps = gaps.len();
    stats.final_tracks = tracks.len();

    tracing::info!(
        mentions = stats.mentions_in,
        dropped = stats.mentions_dropped,
        tracks = stats.final_tracks,
        conflicts = stats.conflicts,
        gaps = stats.gaps,
        "import reconciled"
    );

    (
        ReconcileOutput {
            tracks,
            conflicts,
            gaps,
        },
        stats,
    )
}

/// Reconcile a deserialized import file.
pub fn reconcile_request(request: ImportRequest, config: &ReconcileConfig) -> (ReconcileOutput, ReconcileStats) {
    let (mentions, total_duration) = request.into_mentions();
    reconcile(&mentions, total_duration, config)
}
