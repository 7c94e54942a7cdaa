//! Event types for TUI mode and the transfer progress adapter.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::remote::{FolderId, Snapshot};
use crate::transfer::TransferProgress;

/// Results of background work, delivered to the UI loop in production order.
#[derive(Debug)]
pub enum AppEvent {
    /// A listing request finished. Tagged with the folder it was issued for.
    Fetched {
        folder: FolderId,
        result: Result<Snapshot, String>,
    },
    /// The next file of a transfer is being attempted.
    FileBegin { name: String },
    /// A file's content length is known and bytes are about to flow.
    FileStarted { name: String, size: u64 },
    /// Fraction of the current file written.
    Progress(f64),
    /// A single-file transfer finished.
    TransferComplete { name: String, path: PathBuf },
    /// A single-file transfer failed.
    TransferFailed { name: String, error: String },
    /// Every file in a batch finished.
    BatchComplete { count: usize },
    /// At least one file in a batch failed; `error` joins all failures.
    BatchFailed { error: String },
    /// A clipboard or player action finished.
    ActionComplete(String),
    /// A clipboard or player action failed.
    ActionFailed(String),
}

/// Forwards transfer callbacks onto the UI event channel.
pub struct TuiProgress {
    pub tx: mpsc::UnboundedSender<AppEvent>,
}

impl TransferProgress for TuiProgress {
    fn on_file_begin(&self, name: &str) {
        let _ = self.tx.send(AppEvent::FileBegin {
            name: name.to_string(),
        });
    }

    fn on_file_start(&self, name: &str, size: u64) {
        let _ = self.tx.send(AppEvent::FileStarted {
            name: name.to_string(),
            size,
        });
    }

    fn on_progress(&self, _name: &str, fraction: f64) {
        let _ = self.tx.send(AppEvent::Progress(fraction));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_adapter_forwards_fraction_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress = TuiProgress { tx };

        progress.on_file_begin("a.bin");
        progress.on_file_start("a.bin", 10);
        progress.on_progress("a.bin", 0.5);

        assert!(matches!(rx.try_recv().unwrap(), AppEvent::FileBegin { ref name } if name == "a.bin"));
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::FileStarted { ref name, size: 10 } if name == "a.bin"));
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::Progress(f) if (f - 0.5).abs() < f64::EPSILON));
        assert!(rx.try_recv().is_err());
    }
}
