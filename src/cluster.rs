//! Per-segment clustering and consensus.
//!
//! Inside one segment, mentions are grouped first-fit against each cluster's
//! first member. A lone cluster is merged into one canonical track; several
//! clusters are either settled by a dominance rule or turned into a
//! [`Conflict`] whose top option still becomes the canonical track.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::config::ReconcileConfig;
use crate::models::{CanonicalTrack, Conflict, ConflictOption, ConflictStatus, SourceRef, TrackMention};
use crate::normalize::{clean_title, credited_artist_count, normalize, strip_commentary, title_case};
use crate::scoring::{similarity_with, version_score, MentionKey};
use crate::segment::Segment;

/// How a segment was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Ordered tracklist lines, one track each
    Ordered,
    Single,
    /// One cluster of several agreeing mentions
    Merged,
    /// Several clusters, one clearly dominant
    AutoResolved,
    Conflicted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub tracks: Vec<CanonicalTrack>,
    pub conflicts: Vec<Conflict>,
    pub clusters: usize,
    pub kind: ResolutionKind,
}

// ============================================================================
// Clustering
// ============================================================================

/// Candidate-track group inside one segment.
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    pub members: Vec<&'a TrackMention>,
}

impl Cluster<'_> {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn avg_confidence(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(|m| m.confidence).sum::<f64>() / self.members.len() as f64
    }

    pub fn total_likes(&self) -> u64 {
        self.members.iter().map(|m| u64::from(m.likes)).sum()
    }
}

/// First-fit clustering: each mention joins the first cluster whose first
/// member it resembles at `min_similarity` or more.
pub fn cluster_mentions<'a>(mentions: &'a [TrackMention], config: &ReconcileConfig) -> Vec<Cluster<'a>> {
    let mut clusters: Vec<Cluster<'a>> = Vec::new();
    let mut pivots: Vec<MentionKey> = Vec::new();

    for mention in mentions {
        let key = MentionKey::of_mention(mention);
        let home = pivots
            .iter()
            .position(|pivot| similarity_with(&key, pivot, &config.similarity) >= config.min_similarity);
        match home {
            Some(i) => clusters[i].members.push(mention),
            None => {
                clusters.push(Cluster { members: vec![mention] });
                pivots.push(key);
            }
        }
    }

    clusters
}

/// Rank clusters by support, then average confidence, then likes. Ties keep
/// input order.
pub fn rank_clusters(clusters: &mut [Cluster<'_>]) {
    clusters.sort_by(|a, b| {
        b.count()
            .cmp(&a.count())
            .then_with(|| b.avg_confidence().total_cmp(&a.avg_confidence()))
            .then_with(|| b.total_likes().cmp(&a.total_likes()))
    });
}

/// Whether `top` wins outright over the runner-up.
pub fn dominates(top: &Cluster<'_>, second: &Cluster<'_>, config: &ReconcileConfig) -> bool {
    let rules = &config.dominance;
    top.count() >= second.count() + rules.count_gap
        || top.avg_confidence() - second.avg_confidence() >= rules.confidence_gap
        || top.avg_confidence() >= rules.confidence_floor
}

// ============================================================================
// Track Construction
// ============================================================================

fn best_version<'a>(members: &[&'a TrackMention], config: &ReconcileConfig) -> &'a TrackMention {
    let mut best = members[0];
    let mut best_score = version_score(best, &config.version);
    for &member in &members[1..] {
        let score = version_score(member, &config.version);
        if score > best_score {
            best = member;
            best_score = score;
        }
    }
    best
}

/// Display form of a mention title: commentary and emoji removed, title-cased.
fn display_title(raw: &str) -> String {
    let stripped = strip_commentary(raw);
    if stripped.is_empty() {
        title_case(raw.trim())
    } else {
        title_case(&stripped)
    }
}

/// Canonical track for a single mention.
pub fn track_from_mention(mention: &TrackMention) -> CanonicalTrack {
    CanonicalTrack {
        title: display_title(&mention.title),
        artist: title_case(mention.artist.trim()),
        timestamp_seconds: mention.timestamp_seconds,
        is_interpolated: false,
        confidence: mention.confidence,
        sources: vec![SourceRef::from(mention)],
        has_conflict: false,
        conflict_id: None,
        platform: mention.platform,
        likes: mention.likes,
        aliases: Vec::new(),
        duration_seconds: None,
    }
}

/// Merge one cluster into a canonical track: best-written record as base,
/// fullest artist credit, confidence boosted by corroboration.
pub fn merge_cluster(cluster: &Cluster<'_>, config: &ReconcileConfig) -> CanonicalTrack {
    let base = best_version(&cluster.members, config);

    let mut artist = base.artist.as_str();
    let mut credits = credited_artist_count(artist);
    for member in &cluster.members {
        let count = credited_artist_count(&member.artist);
        if count > credits {
            artist = member.artist.as_str();
            credits = count;
        }
    }

    let timestamp_seconds = if base.is_anchored() {
        base.timestamp_seconds
    } else {
        cluster
            .members
            .iter()
            .map(|m| m.timestamp_seconds)
            .filter(|&t| t > 0)
            .min()
            .unwrap_or(0)
    };

    let extra = cluster.count().saturating_sub(1) as f64;
    let mut track = CanonicalTrack {
        artist: title_case(artist.trim()),
        timestamp_seconds,
        confidence: (base.confidence + config.corroboration_bonus * extra).min(1.0),
        sources: cluster.members.iter().map(|m| SourceRef::from(*m)).collect(),
        ..track_from_mention(base)
    };

    let base_title = clean_title(&base.title).cleaned;
    for member in &cluster.members {
        if clean_title(&member.title).cleaned != base_title {
            track.push_alias(&display_title(&member.title));
        }
    }
    track
}

// ============================================================================
// Conflicts
// ============================================================================

/// Stable id derived from the contested time and the offered identities, so
/// retries and page reloads land on the same conflict.
pub fn conflict_id(timestamp: u32, options: &[ConflictOption]) -> String {
    let mut hasher = FxHasher::default();
    for option in options {
        normalize(&option.title).hash(&mut hasher);
        normalize(&option.artist).hash(&mut hasher);
    }
    format!("conflict-{}-{:016x}", timestamp, hasher.finish())
}

fn conflict_options(ranked: &[Cluster<'_>], config: &ReconcileConfig) -> Vec<ConflictOption> {
    let mut options: Vec<ConflictOption> = Vec::new();
    let mut chosen: Vec<MentionKey> = Vec::new();

    for cluster in ranked {
        if options.len() >= config.max_conflict_options {
            break;
        }
        let merged = merge_cluster(cluster, config);
        let key = MentionKey::of_track(&merged);
        // first-fit clustering is not transitive; keep options distinct
        if chosen
            .iter()
            .any(|other| similarity_with(&key, other, &config.similarity) >= config.min_similarity)
        {
            continue;
        }
        let representative = best_version(&cluster.members, config);
        options.push(ConflictOption {
            title: merged.title,
            artist: merged.artist,
            source: representative.platform,
            confidence: representative.confidence,
            contributed_by: representative.source_author.clone(),
            support_count: cluster.count(),
        });
        chosen.push(key);
    }
    options
}

// ============================================================================
// Segment Resolution
// ============================================================================

/// Resolve one segment into canonical tracks and conflicts.
pub fn resolve(segment: &Segment, config: &ReconcileConfig) -> Resolution {
    let mentions = match segment {
        Segment::Ordered(lines) => {
            return Resolution {
                tracks: lines.iter().map(track_from_mention).collect(),
                conflicts: Vec::new(),
                clusters: lines.len(),
                kind: ResolutionKind::Ordered,
            };
        }
        Segment::Timed(mentions) => mentions,
    };

    match mentions.as_slice() {
        [] => Resolution {
            tracks: Vec::new(),
            conflicts: Vec::new(),
            clusters: 0,
            kind: ResolutionKind::Single,
        },
        [only] => Resolution {
            tracks: vec![track_from_mention(only)],
            conflicts: Vec::new(),
            clusters: 1,
            kind: ResolutionKind::Single,
        },
        _ => resolve_clusters(mentions, config),
    }
}

fn resolve_clusters(mentions: &[TrackMention], config: &ReconcileConfig) -> Resolution {
    let mut clusters = cluster_mentions(mentions, config);
    let cluster_count = clusters.len();

    if cluster_count == 1 {
        return Resolution {
            tracks: vec![merge_cluster(&clusters[0], config)],
            conflicts: Vec::new(),
            clusters: 1,
            kind: ResolutionKind::Merged,
        };
    }

    rank_clusters(&mut clusters);
    let mut track = merge_cluster(&clusters[0], config);
    // every claim about this moment stays in the provenance trail
    track.sources = mentions.iter().map(SourceRef::from).collect();

    let dominant = dominates(&clusters[0], &clusters[1], config);
    let options = if dominant {
        Vec::new()
    } else {
        conflict_options(&clusters, config)
    };

    // a vote needs at least two distinct identities to choose between
    if dominant || options.len() < 2 {
        tracing::debug!(
            title = %track.title,
            artist = %track.artist,
            clusters = cluster_count,
            "segment auto-resolved"
        );
        return Resolution {
            tracks: vec![track],
            conflicts: Vec::new(),
            clusters: cluster_count,
            kind: ResolutionKind::AutoResolved,
        };
    }

    let timestamp = mentions[0].timestamp_seconds;
    let id = conflict_id(timestamp, &options);
    tracing::debug!(id = %id, timestamp, options = options.len(), "conflict created");

    track.has_conflict = true;
    track.conflict_id = Some(id.clone());

    Resolution {
        tracks: vec![track],
        conflicts: vec![Conflict {
            id,
            timestamp,
            options,
            votes: Vec::new(),
            status: ConflictStatus::Active,
        }],
        clusters: cluster_count,
        kind: ResolutionKind::Conflicted,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    const EPS: f64 = 1e-9;

    fn mention(title: &str, artist: &str, t: u32, confidence: f64, likes: u32) -> TrackMention {
        TrackMention {
            title: title.to_string(),
            artist: artist.to_string(),
            timestamp_seconds: t,
            platform: Platform::Youtube,
            source_author: format!("user-{}", title.to_lowercase()),
            likes,
            confidence,
            position: None,
        }
    }

    fn timed(mentions: Vec<TrackMention>) -> Segment {
        Segment::Timed(mentions)
    }

    #[test]
    fn test_single_mention() {
        let resolution = resolve(
            &timed(vec![mention("losing it", "fisher", 2730, 0.95, 0)]),
            &ReconcileConfig::default(),
        );
        assert_eq!(resolution.kind, ResolutionKind::Single);
        assert_eq!(resolution.tracks.len(), 1);
        let track = &resolution.tracks[0];
        assert_eq!(track.title, "Losing It");
        assert_eq!(track.artist, "Fisher");
        assert_eq!(track.confidence, 0.95);
        assert!(resolution.conflicts.is_empty());
    }

    #[test]
    fn test_single_cluster_merge_boosts_confidence() {
        let resolution = resolve(
            &timed(vec![
                mention("Losing It", "Fisher", 2730, 0.6, 0),
                mention("losing it", "FISHER", 2745, 0.5, 0),
                mention("Losing it!!", "Fisher", 2750, 0.4, 0),
            ]),
            &ReconcileConfig::default(),
        );
        assert_eq!(resolution.kind, ResolutionKind::Merged);
        let track = &resolution.tracks[0];
        assert!((track.confidence - 0.8).abs() < EPS);
        assert_eq!(track.timestamp_seconds, 2730);
        assert_eq!(track.sources.len(), 3);
    }

    #[test]
    fn test_merge_prefers_description_and_fuller_credit() {
        let mut description = mention("Losing It", "Fisher", 2730, 0.6, 0);
        description.platform = Platform::Description;
        let fuller = mention("Losing It", "Fisher & Chris Lake", 2735, 0.5, 0);
        let config = ReconcileConfig::default();
        let cluster = Cluster {
            members: vec![&fuller, &description],
        };
        // description wins on version score (0.6+0.1+0.15 vs 0.5+0.1+0.1)
        let track = merge_cluster(&cluster, &config);
        assert_eq!(track.platform, Platform::Description);
        assert_eq!(track.timestamp_seconds, 2730);
        // but the two-artist credit is adopted
        assert_eq!(track.artist, "Fisher & Chris Lake");
        assert!((track.confidence - 0.7).abs() < EPS);
    }

    #[test]
    fn test_merge_records_aliases() {
        let a = mention("Losing It", "Fisher", 100, 0.9, 0);
        let b = mention("Losin It", "Fisher", 110, 0.3, 0);
        let cluster = Cluster { members: vec![&a, &b] };
        let track = merge_cluster(&cluster, &ReconcileConfig::default());
        assert_eq!(track.title, "Losing It");
        assert_eq!(track.aliases, vec!["Losin It".to_string()]);
    }

    #[test]
    fn test_clustering_groups_similar_mentions() {
        let mentions = vec![
            mention("Losing It", "Fisher", 100, 0.5, 0),
            mention("Stay", "The Kid Laroi", 105, 0.5, 0),
            mention("losing it", "fisher", 110, 0.5, 0),
        ];
        let clusters = cluster_mentions(&mentions, &ReconcileConfig::default());
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count(), 2);
        assert_eq!(clusters[1].count(), 1);
    }

    #[test]
    fn test_dominance_by_count_gap() {
        let resolution = resolve(
            &timed(vec![
                mention("Losing It", "Fisher", 100, 0.5, 0),
                mention("Losing It", "Fisher", 101, 0.5, 0),
                mention("Losing It", "Fisher", 102, 0.5, 0),
                mention("Stay", "The Kid Laroi", 103, 0.5, 0),
            ]),
            &ReconcileConfig::default(),
        );
        assert_eq!(resolution.kind, ResolutionKind::AutoResolved);
        assert!(resolution.conflicts.is_empty());
        assert_eq!(resolution.tracks[0].title, "Losing It");
        assert!(!resolution.tracks[0].has_conflict);
        // the minority claim is still in the provenance trail
        assert_eq!(resolution.tracks[0].sources.len(), 4);
    }

    #[test]
    fn test_dominance_by_confidence_gap() {
        let resolution = resolve(
            &timed(vec![
                mention("Stay", "The Kid Laroi", 100, 0.4, 0),
                mention("Losing It", "Fisher", 101, 0.7, 0),
            ]),
            &ReconcileConfig::default(),
        );
        assert_eq!(resolution.kind, ResolutionKind::AutoResolved);
        assert_eq!(resolution.tracks[0].title, "Losing It");
    }

    #[test]
    fn test_dominance_by_confidence_floor() {
        let resolution = resolve(
            &timed(vec![
                mention("Stay", "The Kid Laroi", 100, 0.7, 0),
                mention("Losing It", "Fisher", 101, 0.85, 0),
            ]),
            &ReconcileConfig::default(),
        );
        // gap is only 0.15, but 0.85 clears the absolute floor
        assert_eq!(resolution.kind, ResolutionKind::AutoResolved);
        assert_eq!(resolution.tracks[0].title, "Losing It");
    }

    #[test]
    fn test_close_contest_creates_conflict() {
        let resolution = resolve(
            &timed(vec![
                mention("Losing It", "Fisher", 1800, 0.6, 3),
                mention("Stay", "The Kid Laroi", 1805, 0.6, 12),
                mention("Cola", "CamelPhat", 1810, 0.6, 7),
                mention("Rave", "Adam Beyer", 1812, 0.6, 1),
            ]),
            &ReconcileConfig::default(),
        );
        assert_eq!(resolution.kind, ResolutionKind::Conflicted);
        assert_eq!(resolution.clusters, 4);

        let conflict = &resolution.conflicts[0];
        assert_eq!(conflict.timestamp, 1800);
        assert_eq!(conflict.status, ConflictStatus::Active);
        assert!(conflict.votes.is_empty());
        // capped at three, ranked by likes once count and confidence tie
        let titles: Vec<&str> = conflict.options.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["Stay", "Cola", "Losing It"]);
        assert_eq!(conflict.options[0].support_count, 1);

        let track = &resolution.tracks[0];
        assert_eq!(track.title, "Stay");
        assert!(track.has_conflict);
        assert_eq!(track.conflict_id.as_deref(), Some(conflict.id.as_str()));
    }

    #[test]
    fn test_single_distinct_option_auto_resolves() {
        let config = ReconcileConfig {
            max_conflict_options: 1,
            ..ReconcileConfig::default()
        };
        let resolution = resolve(
            &timed(vec![
                mention("Losing It", "Fisher", 1800, 0.6, 0),
                mention("Stay", "The Kid Laroi", 1805, 0.6, 0),
            ]),
            &config,
        );
        assert_eq!(resolution.kind, ResolutionKind::AutoResolved);
        assert!(resolution.conflicts.is_empty());
        assert!(!resolution.tracks[0].has_conflict);
        assert_eq!(resolution.tracks[0].sources.len(), 2);
    }

    #[test]
    fn test_commentary_stays_out_of_display_title() {
        let track = track_from_mention(&mention("losing it (banger) 🔥", "fisher", 600, 0.5, 0));
        assert_eq!(track.title, "Losing It");

        let bare = track_from_mention(&mention("(banger)", "fisher", 600, 0.5, 0));
        assert_eq!(bare.title, "(banger)");
    }

    #[test]
    fn test_conflict_id_is_stable() {
        let segment = timed(vec![
            mention("Losing It", "Fisher", 1800, 0.6, 0),
            mention("Stay", "The Kid Laroi", 1805, 0.6, 0),
        ]);
        let config = ReconcileConfig::default();
        let first = resolve(&segment, &config);
        let second = resolve(&segment, &config);
        assert_eq!(first.conflicts[0].id, second.conflicts[0].id);
        assert!(first.conflicts[0].id.starts_with("conflict-1800-"));
    }

    #[test]
    fn test_ordered_segment_keeps_every_line() {
        let mut a = mention("Losing It", "Fisher", 0, 0.5, 0);
        a.position = Some(1);
        let mut b = mention("Losing It", "Fisher", 0, 0.5, 0);
        b.position = Some(2);
        let resolution = resolve(&Segment::Ordered(vec![a, b]), &ReconcileConfig::default());
        assert_eq!(resolution.kind, ResolutionKind::Ordered);
        assert_eq!(resolution.tracks.len(), 2);
    }
}
