//! Progress bar and summary reporting for CLI downloads.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::format::{format_bytes, format_duration};
use crate::transfer::{BatchReport, TransferProgress, TransferredFile};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a progress bar for a single file download.
pub fn make_progress_bar(size: u64, name: &str) -> ProgressBar {
    let bar = ProgressBar::new(size);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} @ {bytes_per_sec} - {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━━╌");
    bar.set_style(style);
    bar.set_message(name.to_string());
    bar
}

/// Draws one bar per file on stderr.
///
/// The pipeline reports a fraction, so the bar position is derived from the
/// size announced in `on_file_start`.
#[derive(Default)]
pub struct CliProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl TransferProgress for CliProgress {
    fn on_file_start(&self, name: &str, size: u64) {
        let bar = make_progress_bar(size, name);
        bar.enable_steady_tick(Duration::from_millis(250));
        if let Ok(mut slot) = self.bar.lock()
            && let Some(previous) = slot.replace(bar)
        {
            previous.abandon();
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn on_progress(&self, _name: &str, fraction: f64) {
        if let Ok(slot) = self.bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            let len = bar.length().unwrap_or(0);
            bar.set_position((len as f64 * fraction.clamp(0.0, 1.0)) as u64);
        }
    }

    fn on_file_complete(&self, file: &TransferredFile) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        println!(
            "  {} - {} in {} -> {}",
            file.name,
            format_bytes(file.size),
            format_duration(file.elapsed),
            file.path.display()
        );
    }

    fn on_error(&self, name: &str, error: &str) {
        if let Some(bar) = self.take_bar() {
            bar.abandon();
        }
        eprintln!("  {name} failed: {error}");
    }
}

/// Prints totals for a finished batch.
pub fn print_summary(report: &BatchReport, elapsed: Duration) {
    if report.attempted == 0 {
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Download Summary");
    println!("{SEPARATOR}");
    println!(
        "  Files downloaded:  {} of {}",
        report.completed.len(),
        report.attempted
    );
    println!("  Total size:        {}", format_bytes(report.total_bytes()));
    println!("  Total time:        {}", format_duration(elapsed));
    if !report.errors.is_empty() {
        println!("  Failed:            {}", report.errors.len());
    }
    println!("{SEPARATOR}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn bar_tracks_fraction_of_announced_size() {
        let progress = CliProgress::new();
        progress.on_file_start("a.bin", 1000);
        progress.on_progress("a.bin", 0.25);

        let slot = progress.bar.lock().unwrap();
        assert_eq!(slot.as_ref().unwrap().position(), 250);
    }

    #[test]
    fn completion_releases_the_bar() {
        let progress = CliProgress::new();
        progress.on_file_start("a.bin", 10);
        progress.on_file_complete(&TransferredFile {
            name: "a.bin".to_string(),
            path: PathBuf::from("a.bin"),
            size: 10,
            elapsed: Duration::from_secs(1),
        });
        assert!(progress.bar.lock().unwrap().is_none());

        // Progress without a bar is ignored.
        progress.on_progress("b.bin", 0.5);
    }
}
