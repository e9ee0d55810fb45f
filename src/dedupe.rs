//! Global deduplication across segments.
//!
//! The same track is often cited at different times by different sources and
//! lands in separate segments. This pass folds such near-duplicates together,
//! keeping the higher-quality record and carrying the loser's provenance over.

use rustc_hash::FxHashMap;

use crate::config::ReconcileConfig;
use crate::models::CanonicalTrack;
use crate::normalize::clean_title;
use crate::scoring::{quality_score, similarity_with, MentionKey};

/// Index mapping (title_norm, artist_norm) to a kept slot
type PairIndex = FxHashMap<(String, String), usize>;

/// Title-only index, catches artist-format drift
type TitleIndex = FxHashMap<String, usize>;

struct Kept {
    track: CanonicalTrack,
    key: MentionKey,
}

/// Fold `loser` into `winner`: provenance, spellings and missing metadata.
fn absorb(winner: &mut CanonicalTrack, loser: CanonicalTrack) {
    if clean_title(&loser.title).cleaned != clean_title(&winner.title).cleaned {
        winner.push_alias(&loser.title);
    }
    for alias in &loser.aliases {
        winner.push_alias(alias);
    }
    winner.sources.extend(loser.sources);
    if winner.duration_seconds.is_none() {
        winner.duration_seconds = loser.duration_seconds;
    }
    if !winner.has_conflict && loser.has_conflict {
        winner.has_conflict = true;
        winner.conflict_id = loser.conflict_id;
    }
}

fn index_key(pairs: &mut PairIndex, titles: &mut TitleIndex, key: &MentionKey, slot: usize) {
    pairs
        .entry((key.title.cleaned.clone(), key.artist.normalized.clone()))
        .or_insert(slot);
    titles.entry(key.title.cleaned.clone()).or_insert(slot);
}

/// One arrival-order pass. Returns the survivors sorted by timestamp and the
/// number of merges made.
fn dedupe_pass(tracks: Vec<CanonicalTrack>, config: &ReconcileConfig) -> (Vec<CanonicalTrack>, usize) {
    let mut kept: Vec<Kept> = Vec::with_capacity(tracks.len());
    let mut pairs = PairIndex::default();
    let mut titles = TitleIndex::default();
    let mut merges = 0;

    for track in tracks {
        let key = MentionKey::of_track(&track);
        let hit = pairs
            .get(&(key.title.cleaned.clone(), key.artist.normalized.clone()))
            .or_else(|| titles.get(&key.title.cleaned))
            .copied()
            .or_else(|| {
                kept.iter()
                    .position(|k| similarity_with(&key, &k.key, &config.similarity) >= config.dedupe_similarity)
            });

        let Some(slot) = hit else {
            index_key(&mut pairs, &mut titles, &key, kept.len());
            kept.push(Kept { track, key });
            continue;
        };

        merges += 1;
        let existing = &mut kept[slot];
        if quality_score(&track, &config.quality) > quality_score(&existing.track, &config.quality) {
            tracing::debug!(kept = %track.title, dropped = %existing.track.title, "duplicate replaced");
            let loser = std::mem::replace(&mut existing.track, track);
            absorb(&mut existing.track, loser);
            existing.key = key;
            index_key(&mut pairs, &mut titles, &existing.key, slot);
        } else {
            tracing::debug!(kept = %existing.track.title, dropped = %track.title, "duplicate folded");
            absorb(&mut existing.track, track);
        }
    }

    let mut survivors: Vec<CanonicalTrack> = kept.into_iter().map(|k| k.track).collect();
    survivors.sort_by_key(|t| t.timestamp_seconds);
    (survivors, merges)
}

/// Merge near-duplicate canonical tracks, repeating until a pass makes no
/// merge, so running it on its own output is a no-op. Output is sorted by
/// timestamp; equal timestamps keep arrival order.
pub fn dedupe_counted(tracks: Vec<CanonicalTrack>, config: &ReconcileConfig) -> (Vec<CanonicalTrack>, usize) {
    let mut total = 0;
    let mut current = tracks;
    loop {
        let (next, merges) = dedupe_pass(current, config);
        total += merges;
        if merges == 0 {
            return (next, total);
        }
        current = next;
    }
}

pub fn dedupe(tracks: Vec<CanonicalTrack>, config: &ReconcileConfig) -> Vec<CanonicalTrack> {
    dedupe_counted(tracks, config).0
}
