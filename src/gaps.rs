//! Advisory detection of unidentified stretches in a mix.

use crate::config::GapConfig;
use crate::models::{CanonicalTrack, Gap};

fn track_end(track: &CanonicalTrack, config: &GapConfig) -> u32 {
    let length = track.duration_seconds.unwrap_or(config.assumed_track_secs);
    track.timestamp_seconds.saturating_add(length)
}

/// Find silences in a timestamp-sorted track list: a late first track, long
/// pauses between consecutive tracks, and a long unclaimed tail.
pub fn find_gaps(tracks: &[CanonicalTrack], total_duration: i64, config: &GapConfig) -> Vec<Gap> {
    let total = u32::try_from(total_duration.max(0)).unwrap_or(u32::MAX);
    let mut gaps = Vec::new();

    let Some(first) = tracks.first() else {
        if total > config.max_silence_secs {
            gaps.push(Gap::new(0, total));
        }
        return gaps;
    };

    if first.timestamp_seconds > 2 * config.min_track_gap_secs {
        gaps.push(Gap::new(0, first.timestamp_seconds));
    }

    for pair in tracks.windows(2) {
        let end = track_end(&pair[0], config);
        let next = pair[1].timestamp_seconds;
        if next > end.saturating_add(config.max_silence_secs) {
            gaps.push(Gap::new(end, next));
        }
    }

    if let Some(last) = tracks.last() {
        let end = track_end(last, config);
        if total > end.saturating_add(config.max_silence_secs) {
            gaps.push(Gap::new(end, total));
        }
    }

    tracing::debug!(gaps = gaps.len(), "gap scan done");
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    fn at(t: u32) -> CanonicalTrack {
        CanonicalTrack {
            title: format!("track {}", t),
            artist: "Artist".to_string(),
            timestamp_seconds: t,
            is_interpolated: false,
            confidence: 0.5,
            sources: vec![],
            has_conflict: false,
            conflict_id: None,
            platform: Platform::Youtube,
            likes: 0,
            aliases: vec![],
            duration_seconds: None,
        }
    }

    #[test]
    fn test_leading_gap() {
        let config = GapConfig::default();
        assert_eq!(find_gaps(&[at(121)], 400, &config), vec![Gap::new(0, 121)]);
        assert!(find_gaps(&[at(120)], 400, &config).is_empty());
    }

    #[test]
    fn test_internal_gap() {
        let config = GapConfig::default();
        // 100 + 180 = 280; 280 + 300 = 580
        let gaps = find_gaps(&[at(100), at(600)], 900, &config);
        assert_eq!(gaps, vec![Gap::new(280, 600)]);
        assert_eq!(gaps[0].duration, 320);
        assert!(find_gaps(&[at(100), at(580)], 900, &config).is_empty());
    }

    #[test]
    fn test_trailing_gap() {
        let config = GapConfig::default();
        let gaps = find_gaps(&[at(60)], 3600, &config);
        assert_eq!(gaps, vec![Gap::new(240, 3600)]);
    }

    #[test]
    fn test_known_duration_replaces_assumption() {
        let config = GapConfig::default();
        let mut long = at(100);
        long.duration_seconds = Some(500);
        assert!(find_gaps(&[long, at(800)], 1200, &config).is_empty());
    }

    #[test]
    fn test_no_tracks() {
        let config = GapConfig::default();
        assert_eq!(find_gaps(&[], 3600, &config), vec![Gap::new(0, 3600)]);
        assert!(find_gaps(&[], 0, &config).is_empty());
        assert!(find_gaps(&[], -10, &config).is_empty());
    }

    #[test]
    fn test_dense_mix_has_no_gaps() {
        let config = GapConfig::default();
        let tracks: Vec<CanonicalTrack> = (0..10).map(|i| at(i * 200)).collect();
        assert!(find_gaps(&tracks, 2000, &config).is_empty());
    }
}
