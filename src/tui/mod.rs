//! Interactive terminal browser for the remote file tree.
//!
//! A single loop owns [`App`]: it draws, polls the terminal for keys, and
//! drains results of background work from one channel. Listing, transfers
//! and external actions run on spawned tasks and report back only through
//! [`AppEvent`] values.

pub mod app;
pub mod draw;
pub mod event;
pub mod input;
pub mod tasks;

use std::io;
use std::time::Duration;

use crossterm::event::Event;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::remote::FolderId;

pub use self::app::{App, AppState, Services};
pub use self::event::AppEvent;

use self::draw::draw;
use self::input::handle_input;
use self::tasks::{handle_app_event, start_fetch};

/// RAII guard that ensures terminal cleanup on drop.
/// Restores terminal to normal mode even if a panic occurs.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        crossterm::execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Run the interactive TUI until the user quits.
///
/// Must be called from within a Tokio runtime; background work is spawned on it.
///
/// # Errors
/// Returns an error if terminal setup fails or drawing encounters I/O errors.
#[allow(clippy::unused_async)]
pub async fn run(services: Services) -> io::Result<()> {
    // Initialize terminal with RAII guard for automatic cleanup
    let _terminal_guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut app = App::new(services, event_tx);
    let size = terminal.size()?;
    app.resize(size.width, size.height);

    start_fetch(&mut app, FolderId::root());

    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        // Poll for events with 100ms timeout
        if crossterm::event::poll(Duration::from_millis(100))? {
            match crossterm::event::read()? {
                Event::Key(key) => handle_input(&mut app, key),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        // Drain background results (non-blocking)
        while let Ok(event) = event_rx.try_recv() {
            handle_app_event(&mut app, event);
        }

        app.tick();

        if app.should_quit {
            break;
        }
    }

    // Show cursor before exit (terminal cleanup handled by RAII guard)
    terminal.show_cursor()?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use super::app::{App, Services};
    use super::event::AppEvent;
    use super::tasks::handle_app_event;
    use crate::config::TransferConfig;
    use crate::testing::{FakeLauncher, FakeRemote};
    use crate::transfer::Transfer;

    /// An app wired to fakes, downloading into a fresh temp dir.
    pub fn test_app(
        remote: FakeRemote,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>, Arc<FakeRemote>, TempDir) {
        test_app_with_launcher(remote, Arc::new(FakeLauncher::default()))
    }

    /// Like [`test_app`], with a launcher the test can inspect.
    pub fn test_app_with_launcher(
        remote: FakeRemote,
        launcher: Arc<FakeLauncher>,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>, Arc<FakeRemote>, TempDir) {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(remote);
        let transfer = Transfer::new(
            remote.clone(),
            reqwest::Client::new(),
            TransferConfig::default(),
            dir.path(),
        );
        let services = Services {
            remote: remote.clone(),
            transfer: Arc::new(transfer),
            launcher,
            metadata_timeout: Duration::from_secs(5),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(services, tx), rx, remote, dir)
    }

    /// Waits for one background event and applies it.
    pub async fn pump(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within 5s")
            .expect("event channel closed");
        handle_app_event(app, event);
    }
}
