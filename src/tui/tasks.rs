//! Background work (listing, transfers, external actions) and event handling.

use std::sync::Arc;

use crate::error::Error;
use crate::remote::{FileDescriptor, FolderId, Snapshot};
use crate::transfer::TransferProgress;

use super::app::{App, AppState, Pending, TransferSummary};
use super::event::{AppEvent, TuiProgress};

/// Which transfer mode a `Download` command starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRequest {
    Single(FileDescriptor),
    Batch(Vec<FileDescriptor>),
}

impl TransferRequest {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(files) => files.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One-shot action on a resolved file URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalAction {
    CopyLink,
    OpenPlayer,
}

/// Shows the folder on top of the stack, from cache or by fetching it.
pub fn show_current_folder(app: &mut App) {
    if !app.show_cached() {
        let folder = app.stack.current().clone();
        start_fetch(app, folder);
    }
}

/// Spawns a listing of `folder` and waits for it in `Loading`.
pub fn start_fetch(app: &mut App, folder: FolderId) {
    log::debug!("Fetching contents of folder {folder}");
    app.state = AppState::Loading;
    app.pending = Some(Pending::Fetch(folder.clone()));
    app.loading_message = "Fetching contents...".to_string();

    let tx = app.event_tx.clone();
    let remote = Arc::clone(&app.services.remote);
    let budget = app.services.metadata_timeout;
    tokio::spawn(async move {
        let result = tokio::time::timeout(budget, remote.list_contents(&folder))
            .await
            .unwrap_or_else(|_| {
                Err(Error::Timeout {
                    operation: "listing folder".to_string(),
                    after: budget,
                })
            })
            .map_err(|e| format!("failed to fetch contents: {e}"));
        let _ = tx.send(AppEvent::Fetched { folder, result });
    });
}

/// Spawns a single-file or batch download and enters `Downloading`.
pub fn start_transfer(app: &mut App, request: TransferRequest) {
    log::info!("Starting download of {} file(s)", request.len());
    app.state = AppState::Downloading;
    app.last_error = None;
    app.transfer = Some(TransferSummary::new(request.len()));

    let tx = app.event_tx.clone();
    let transfer = Arc::clone(&app.services.transfer);
    let cancel = app.cancel.child_token();
    let progress: Arc<dyn TransferProgress> = Arc::new(TuiProgress { tx: tx.clone() });
    tokio::spawn(async move {
        let event = match request {
            TransferRequest::Single(file) => {
                match transfer.download_file(&file, &progress, Some(cancel)).await {
                    Ok(done) => AppEvent::TransferComplete {
                        name: done.name,
                        path: done.path,
                    },
                    Err(e) => AppEvent::TransferFailed {
                        name: file.name,
                        error: e.to_string(),
                    },
                }
            }
            TransferRequest::Batch(files) => {
                let report = transfer.download_batch(&files, &progress, Some(cancel)).await;
                match report.into_result() {
                    Ok(done) => AppEvent::BatchComplete { count: done.len() },
                    Err(e) => AppEvent::BatchFailed {
                        error: e.to_string(),
                    },
                }
            }
        };
        let _ = tx.send(event);
    });
}

/// Resolves the file's URL then copies it or hands it to the player.
pub fn start_action(app: &mut App, action: ExternalAction, file: FileDescriptor) {
    app.state = AppState::Loading;
    app.pending = Some(Pending::Action);
    app.loading_message = match action {
        ExternalAction::CopyLink => "Fetching link...".to_string(),
        ExternalAction::OpenPlayer => format!("Opening {}...", file.name),
    };

    let tx = app.event_tx.clone();
    let remote = Arc::clone(&app.services.remote);
    let launcher = Arc::clone(&app.services.launcher);
    let budget = app.services.metadata_timeout;
    tokio::spawn(async move {
        let link = match tokio::time::timeout(budget, remote.fetch_file_url(&file.id)).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                let _ = tx.send(AppEvent::ActionFailed(format!(
                    "failed to get download URL for {}: {e}",
                    file.name
                )));
                return;
            }
            Err(_) => {
                let _ = tx.send(AppEvent::ActionFailed(format!(
                    "looking up the URL for {} timed out after {}s",
                    file.name,
                    budget.as_secs()
                )));
                return;
            }
        };

        let event = match action {
            ExternalAction::CopyLink => match launcher.copy_to_clipboard(&link.url).await {
                Ok(()) => AppEvent::ActionComplete("URL copied to clipboard!".to_string()),
                Err(e) => AppEvent::ActionFailed(e.to_string()),
            },
            ExternalAction::OpenPlayer => match launcher.open_in_player(&link.url).await {
                Ok(()) => AppEvent::ActionComplete(format!(
                    "Opening {} with {}...",
                    file.name,
                    launcher.player_name()
                )),
                Err(e) => AppEvent::ActionFailed(e.to_string()),
            },
        };
        let _ = tx.send(event);
    });
}

pub fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Fetched { folder, result } => handle_fetched(app, folder, result),
        AppEvent::FileBegin { name } => {
            if let Some(summary) = app.transfer.as_mut() {
                summary.position += 1;
                summary.current = Some(name);
                summary.fraction = 0.0;
            }
        }
        AppEvent::FileStarted { name, size } => {
            log::debug!("Transfer of {name} started ({size} bytes)");
            if let Some(summary) = app.transfer.as_mut() {
                summary.current = Some(name);
                summary.fraction = 0.0;
            }
        }
        AppEvent::Progress(fraction) => {
            if app.state == AppState::Downloading
                && let Some(summary) = app.transfer.as_mut()
            {
                summary.fraction = fraction.clamp(0.0, 1.0);
            }
        }
        AppEvent::TransferComplete { name, path } => {
            if finish_transfer(app) {
                log::info!("Download complete: {name}");
                app.notice = Some(format!("Downloaded {name} to {}", path.display()));
            }
        }
        AppEvent::TransferFailed { name, error } => {
            if finish_transfer(app) {
                log::error!("Download of {name} failed: {error}");
                app.state = AppState::Error;
                app.last_error = Some(error);
            }
        }
        AppEvent::BatchComplete { count } => {
            if finish_transfer(app) {
                app.notice = Some(format!("Successfully downloaded {count} files."));
            }
        }
        AppEvent::BatchFailed { error } => {
            if finish_transfer(app) {
                log::error!("Batch download failed:\n{error}");
                app.state = AppState::Error;
                app.last_error = Some(error);
            }
        }
        AppEvent::ActionComplete(message) => {
            if app.pending == Some(Pending::Action) {
                app.pending = None;
                app.state = AppState::Ready;
                app.notice = Some(message);
            }
        }
        AppEvent::ActionFailed(error) => {
            if app.pending == Some(Pending::Action) {
                log::error!("Action failed: {error}");
                app.pending = None;
                app.state = AppState::Error;
                app.last_error = Some(error);
            }
        }
    }
}

/// Leaves `Downloading` for `Ready`. Returns false if no transfer was running.
fn finish_transfer(app: &mut App) -> bool {
    if app.state != AppState::Downloading {
        return false;
    }
    app.transfer = None;
    app.last_error = None;
    app.state = AppState::Ready;
    true
}

fn handle_fetched(app: &mut App, folder: FolderId, result: Result<Snapshot, String>) {
    let awaited = matches!(&app.pending, Some(Pending::Fetch(id)) if *id == folder);
    if !awaited {
        log::debug!("Discarding stale listing for folder {folder}");
        if let Ok(snapshot) = result
            && !snapshot.is_empty()
            && !app.cache.contains(&folder)
        {
            app.cache.put(folder, snapshot);
        }
        return;
    }

    app.pending = None;
    match result {
        Ok(snapshot) if snapshot.is_empty() => {
            app.items.clear();
            app.list_state.select(None);
            app.state = AppState::Empty;
        }
        Ok(snapshot) => {
            log::debug!("Folder {folder} has {} entries", snapshot.len());
            app.cache.put(folder, snapshot);
            if !app.show_cached() {
                log::warn!("Fetched folder is no longer on top of the stack");
            }
        }
        Err(message) => {
            log::error!("{message}");
            app.state = AppState::Error;
            app.last_error = Some(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRemote, file, folder, listing};
    use crate::tui::test_support::{pump, test_app};

    #[tokio::test]
    async fn fetch_result_for_other_folder_is_cached_not_shown() {
        let remote = FakeRemote::new()
            .with_listing(listing(FolderId::root(), vec![folder("1", "A")], vec![]))
            .with_listing(listing(FolderId::new("9"), vec![], vec![file("5", "x", 1)]));
        let (mut app, mut rx, _remote, _dir) = test_app(remote);

        start_fetch(&mut app, FolderId::root());
        // Pretend a request for another folder was still in flight.
        handle_app_event(
            &mut app,
            AppEvent::Fetched {
                folder: FolderId::new("9"),
                result: Ok(listing(FolderId::new("9"), vec![], vec![file("5", "x", 1)])),
            },
        );
        assert_eq!(app.state, AppState::Loading);
        assert!(app.cache.contains(&FolderId::new("9")));

        pump(&mut app, &mut rx).await;
        assert_eq!(app.state, AppState::Ready);
        assert_eq!(app.items.len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_enters_error_with_message() {
        let remote = FakeRemote::new().with_list_error(FolderId::root(), "HTTP 502: Bad Gateway");
        let (mut app, mut rx, _remote, _dir) = test_app(remote);

        start_fetch(&mut app, FolderId::root());
        pump(&mut app, &mut rx).await;

        assert_eq!(app.state, AppState::Error);
        let message = app.last_error.clone().unwrap();
        assert!(message.starts_with("failed to fetch contents"));
        assert!(message.contains("HTTP 502"));
    }

    #[test]
    fn progress_outside_downloading_is_ignored() {
        let (mut app, _rx, _remote, _dir) = test_app(FakeRemote::new());
        app.state = AppState::Ready;
        handle_app_event(&mut app, AppEvent::Progress(0.5));
        assert!(app.transfer.is_none());

        handle_app_event(&mut app, AppEvent::BatchComplete { count: 2 });
        assert_eq!(app.state, AppState::Ready);
        assert!(app.notice.is_none());
    }

    #[test]
    fn batch_position_counts_files_that_failed_before_starting() {
        let (mut app, _rx, _remote, _dir) = test_app(FakeRemote::new());
        app.state = AppState::Downloading;
        app.transfer = Some(TransferSummary::new(3));

        for name in ["a.bin", "b.bin", "c.bin"] {
            handle_app_event(&mut app, AppEvent::FileBegin { name: name.to_string() });
            // b.bin fails its link lookup and never reports a size.
            if name != "b.bin" {
                handle_app_event(
                    &mut app,
                    AppEvent::FileStarted {
                        name: name.to_string(),
                        size: 10,
                    },
                );
            }
        }

        assert_eq!(app.transfer.as_ref().unwrap().label(), "Downloading 3/3: c.bin");
    }

    #[test]
    fn progress_is_clamped() {
        let (mut app, _rx, _remote, _dir) = test_app(FakeRemote::new());
        app.state = AppState::Downloading;
        app.transfer = Some(TransferSummary::new(1));

        handle_app_event(&mut app, AppEvent::Progress(1.7));
        assert!((app.transfer.as_ref().unwrap().fraction - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn batch_failure_keeps_every_message() {
        let (mut app, _rx, _remote, _dir) = test_app(FakeRemote::new());
        app.state = AppState::Downloading;
        app.transfer = Some(TransferSummary::new(3));

        handle_app_event(
            &mut app,
            AppEvent::BatchFailed {
                error: "first\nsecond".to_string(),
            },
        );

        assert_eq!(app.state, AppState::Error);
        assert_eq!(app.last_error.as_deref(), Some("first\nsecond"));
        assert!(app.transfer.is_none());
    }
}
