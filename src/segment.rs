//! Temporal segmentation of mentions.
//!
//! Mentions whose timestamps sit within `segment_window_secs` of their
//! predecessor are candidates for naming the same track. Untimed lines of an
//! ordered tracklist are never grouped by time: each line is its own track.

use crate::models::TrackMention;

/// A group of mentions handed to the cluster resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Mentions close together in time, sorted by timestamp
    Timed(Vec<TrackMention>),
    /// Untimed tracklist lines, sorted by position; every mention is a distinct track
    Ordered(Vec<TrackMention>),
}

impl Segment {
    pub fn mentions(&self) -> &[TrackMention] {
        match self {
            Segment::Timed(mentions) | Segment::Ordered(mentions) => mentions,
        }
    }

    pub fn len(&self) -> usize {
        self.mentions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions().is_empty()
    }
}

fn is_ordered_line(mention: &TrackMention) -> bool {
    !mention.is_anchored() && mention.position.is_some()
}

/// Split mentions into segments. Input order breaks every tie.
///
/// An all-untimed import with at least one positioned line is a plain
/// tracklist: one ordered segment, unpositioned lines last.
pub fn segment(mentions: &[TrackMention], window_secs: u32) -> Vec<Segment> {
    let untimed_tracklist = mentions.iter().all(|m| !m.is_anchored())
        && mentions.iter().any(|m| m.position.is_some());
    if untimed_tracklist {
        let mut lines = mentions.to_vec();
        lines.sort_by_key(|m| (m.position.is_none(), m.position));
        return vec![Segment::Ordered(lines)];
    }

    let (ordered, mut timed): (Vec<TrackMention>, Vec<TrackMention>) =
        mentions.iter().cloned().partition(is_ordered_line);

    let mut segments = Vec::new();

    if !ordered.is_empty() {
        let mut ordered = ordered;
        ordered.sort_by_key(|m| m.position);
        segments.push(Segment::Ordered(ordered));
    }

    timed.sort_by_key(|m| m.timestamp_seconds);
    let mut current: Vec<TrackMention> = Vec::new();
    for mention in timed {
        if let Some(prev) = current.last() {
            if mention.timestamp_seconds - prev.timestamp_seconds > window_secs {
                segments.push(Segment::Timed(std::mem::take(&mut current)));
            }
        }
        current.push(mention);
    }
    if !current.is_empty() {
        segments.push(Segment::Timed(current));
    }

    segments
}
