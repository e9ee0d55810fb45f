//! Track-mention reconciliation: turns noisy per-source track claims about one
//! DJ mix into a single ordered tracklist with conflicts and gaps.

pub mod cluster;
pub mod config;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod gaps;
pub mod interpolate;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod segment;

pub use config::ReconcileConfig;
pub use engine::{reconcile, reconcile_request};
pub use error::{ReconcileError, Result};
pub use models::{
    CanonicalTrack, Conflict, ConflictOption, ConflictStatus, Gap, ImportRequest, Platform, ReconcileOutput,
    ReconcileStats, SourceRef, TrackMention,
};
