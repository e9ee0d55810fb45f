//! Progress reporting for batch runs.
//!
//! In log-only mode bars are hidden and progress goes to the log at fixed
//! intervals instead, which keeps `tail -f` output readable.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Progress bar over `len` imports; hidden when `log_only` is set.
pub fn create_progress_bar(len: u64, msg: &str, log_only: bool) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if log_only {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(bar_style());
    }
    pb.set_message(msg.to_string());
    pb
}

/// Spinner for work of unknown size (directory scan).
pub fn create_spinner(msg: &str, log_only: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if log_only {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Whether progress line `current` of `total` is due for logging.
pub fn should_log(current: u64, total: u64, interval: u64) -> bool {
    interval > 0 && (current % interval == 0 || current == total)
}

/// Log progress every `interval` items (and at the end) in log-only mode.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64, log_only: bool) {
    if log_only && total > 0 && should_log(current, total, interval) {
        let pct = 100.0 * current as f64 / total as f64;
        tracing::info!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_should_log() {
        assert!(should_log(100, 250, 100));
        assert!(should_log(250, 250, 100));
        assert!(!should_log(101, 250, 100));
        assert!(!should_log(5, 10, 0));
    }

    #[test]
    fn test_hidden_bar_in_log_only_mode() {
        let pb = create_progress_bar(10, "Reconciling", true);
        assert!(pb.is_hidden());
        assert_eq!(pb.length(), Some(10));
    }
}
