use crate::extractor::BatchProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_batch_progress(&self, total_urls: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_urls));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} urls {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message("Fetching...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.enabled {
            self.multi_progress.suspend(f)
        } else {
            f()
        }
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

// Helper functions for updating progress bars based on batch events
pub fn update_batch_progress(pb: &ProgressBar, progress: &BatchProgress) {
    pb.set_position(progress.jobs_completed as u64);

    let failed = progress.failed();
    let suffix = if failed > 0 {
        format!(" ({} failed)", failed)
    } else {
        String::new()
    };

    if let Some(ref current_url) = progress.current_url {
        pb.set_message(format!("{}{}", truncate_url(current_url, 48), suffix));
    } else {
        pb.set_message(format!("Fetching...{}", suffix));
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

fn truncate_url(url: &str, max_len: usize) -> String {
    if url.chars().count() <= max_len {
        url.to_string()
    } else {
        let tail: String = url
            .chars()
            .rev()
            .take(max_len - 3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_manager_creation() {
        let manager = ProgressManager::new(true);
        assert!(manager.is_enabled());

        let disabled_manager = ProgressManager::new(false);
        assert!(!disabled_manager.is_enabled());
    }

    #[test]
    fn test_disabled_progress_bars() {
        let manager = ProgressManager::new(false);

        let batch_pb = manager.create_batch_progress(100);
        assert!(batch_pb.is_hidden());

        let spinner = manager.create_spinner("test");
        assert!(spinner.is_hidden());
    }

    #[test]
    fn test_update_batch_progress() {
        let manager = ProgressManager::new(false);
        let pb = manager.create_batch_progress(10);

        let mut progress = BatchProgress::new(10);
        progress.jobs_completed = 3;
        progress.current_url = Some("https://example.com/page".to_string());

        update_batch_progress(&pb, &progress);
        assert_eq!(pb.position(), 3);
    }

    #[test]
    fn test_truncate_url() {
        assert_eq!(truncate_url("short", 48), "short");

        let long = format!("https://example.com/{}", "segment/".repeat(20));
        let truncated = truncate_url(&long, 48);
        assert_eq!(truncated.chars().count(), 48);
        assert!(truncated.starts_with("..."));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "61m 1s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }
}
