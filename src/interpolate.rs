//! Timestamp interpolation for anchorless tracks.
//!
//! Tracks with a positive timestamp are anchors. Two virtual anchors sit at
//! 0 (before the first track) and at the mix length (after the last). The
//! tracks between each pair of anchors are spread evenly across that span.

use crate::models::CanonicalTrack;

/// (index into the track list, time in seconds)
type Anchor = (i64, u32);

fn anchors(tracks: &[CanonicalTrack], total: u32) -> Vec<Anchor> {
    let mut anchors: Vec<Anchor> = Vec::with_capacity(tracks.len() + 2);
    anchors.push((-1, 0));
    anchors.extend(
        tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.timestamp_seconds > 0)
            .map(|(i, t)| (i as i64, t.timestamp_seconds)),
    );
    anchors.push((tracks.len() as i64, total));
    anchors
}

/// Place the k-th of n tracks in `[start, end]` at
/// `floor(start + k / (n + 1) * (end - start))`.
fn spread(start: u32, end: u32, k: usize, n: usize) -> u32 {
    // An anchor past the mix end (or out of order) collapses the span
    let span = u64::from(end.saturating_sub(start));
    let offset = span * k as u64 / (n as u64 + 1);
    start.saturating_add(offset as u32)
}

/// Return a copy of `tracks` with every anchorless track placed between its
/// neighbouring anchors and flagged as interpolated. Anchored tracks are
/// returned unchanged. A non-positive `total_duration` or an empty list is a
/// no-op.
pub fn interpolate(tracks: &[CanonicalTrack], total_duration: i64) -> Vec<CanonicalTrack> {
    if total_duration <= 0 || tracks.is_empty() {
        return tracks.to_vec();
    }
    let total = u32::try_from(total_duration).unwrap_or(u32::MAX);

    let mut out = Vec::with_capacity(tracks.len());
    for pair in anchors(tracks, total).windows(2) {
        let (start_idx, start_t) = pair[0];
        let (end_idx, end_t) = pair[1];

        if start_idx >= 0 {
            out.push(tracks[start_idx as usize].clone());
        }

        let first = (start_idx + 1) as usize;
        let last = end_idx as usize;
        let n = last - first;
        for (k, track) in tracks[first..last].iter().enumerate() {
            let t = spread(start_t, end_t, k + 1, n).min(total);
            out.push(track.with_interpolated_timestamp(t));
        }
    }

    tracing::debug!(
        interpolated = out.iter().filter(|t| t.is_interpolated).count(),
        total,
        "interpolation done"
    );
    out
}
