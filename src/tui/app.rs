//! Application state model.

use std::sync::Arc;
use std::time::Duration;

use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::external::Launcher;
use crate::nav::{FolderStack, NavigationCache};
use crate::remote::{Entry, FolderId, RemoteStore, Snapshot};
use crate::selection::SelectionSet;
use crate::transfer::Transfer;

use super::event::AppEvent;

/// Top-level interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Loading,
    Ready,
    Downloading,
    Error,
    Empty,
}

/// Background work the UI is waiting on while in `Loading`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// A listing of this folder; results for other folders are not applied.
    Fetch(FolderId),
    /// A clipboard or player action.
    Action,
}

/// Toggleable screen elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Spinner,
    Title,
    Status,
    Path,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlays {
    pub spinner: bool,
    pub title: bool,
    pub status: bool,
    pub path: bool,
    pub help: bool,
}

impl Default for Overlays {
    fn default() -> Self {
        Self {
            spinner: true,
            title: true,
            status: true,
            path: true,
            help: false,
        }
    }
}

impl Overlays {
    pub fn toggle(&mut self, overlay: Overlay) {
        let flag = match overlay {
            Overlay::Spinner => &mut self.spinner,
            Overlay::Title => &mut self.title,
            Overlay::Status => &mut self.status,
            Overlay::Path => &mut self.path,
            Overlay::Help => &mut self.help,
        };
        *flag = !*flag;
    }
}

/// One row of the folder view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewItem {
    pub entry: Entry,
    pub marked: bool,
}

/// Progress of the transfer currently running.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSummary {
    /// Number of files in this transfer.
    pub total: usize,
    /// Position of the file being attempted, counting failed ones.
    pub position: usize,
    /// Name of the file being written.
    pub current: Option<String>,
    /// Fraction of the current file written.
    pub fraction: f64,
}

impl TransferSummary {
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            position: 0,
            current: None,
            fraction: 0.0,
        }
    }

    /// Human-readable line for the downloading view.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.current, self.total) {
            (None, 1) => "Preparing download...".to_string(),
            (None, n) => format!("Preparing {n} downloads..."),
            (Some(name), 1) => format!("Downloading {name}"),
            (Some(name), n) => format!("Downloading {}/{n}: {name}", self.position),
        }
    }
}

/// Collaborators injected at construction.
#[derive(Clone)]
pub struct Services {
    pub remote: Arc<dyn RemoteStore>,
    pub transfer: Arc<Transfer>,
    pub launcher: Arc<dyn Launcher>,
    /// Time budget for listing and link lookups.
    pub metadata_timeout: Duration,
}

pub struct App {
    pub state: AppState,
    pub pending: Option<Pending>,
    // Navigation
    pub stack: FolderStack,
    pub cache: NavigationCache,
    pub selection: SelectionSet,
    // View
    pub items: Vec<ViewItem>,
    pub list_state: ListState,
    pub last_error: Option<String>,
    pub notice: Option<String>,
    pub loading_message: String,
    pub transfer: Option<TransferSummary>,
    pub overlays: Overlays,
    pub viewport: (u16, u16),
    pub spinner_frame: usize,
    pub should_quit: bool,
    // Plumbing
    pub event_tx: mpsc::UnboundedSender<AppEvent>,
    pub services: Services,
    /// Parent token for every transfer; cancelled on quit.
    pub cancel: CancellationToken,
}

impl App {
    pub fn new(services: Services, event_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            state: AppState::Loading,
            pending: None,
            stack: FolderStack::new(),
            cache: NavigationCache::new(),
            selection: SelectionSet::new(),
            items: Vec::new(),
            list_state: ListState::default(),
            last_error: None,
            notice: None,
            loading_message: "Starting...".to_string(),
            transfer: None,
            overlays: Overlays::default(),
            viewport: (0, 0),
            spinner_frame: 0,
            should_quit: false,
            event_tx,
            services,
            cancel: CancellationToken::new(),
        }
    }

    /// Entry under the cursor.
    #[must_use]
    pub fn selected_entry(&self) -> Option<&Entry> {
        self.list_state
            .selected()
            .and_then(|i| self.items.get(i))
            .map(|item| &item.entry)
    }

    /// Renders the current folder from cache. Returns false on a cache miss.
    pub fn show_cached(&mut self) -> bool {
        let Some(snapshot) = self.cache.get(self.stack.current()) else {
            return false;
        };
        self.items = project(snapshot, &self.selection);
        self.list_state
            .select(if self.items.is_empty() { None } else { Some(0) });
        self.pending = None;
        self.state = AppState::Ready;
        true
    }

    /// Re-reads marked flags from the selection set.
    pub fn refresh_marks(&mut self) {
        for item in &mut self.items {
            item.marked = match &item.entry {
                Entry::File(f) => self.selection.contains(&f.id),
                _ => false,
            };
        }
    }

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let next = self
            .list_state
            .selected()
            .map_or(0, |i| (i + 1) % self.items.len());
        self.list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let prev = match self.list_state.selected() {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(prev));
    }

    pub fn select_first(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(self.items.len() - 1));
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
    }

    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }
}

/// Builds view rows for `snapshot`, flagging marked files.
#[must_use]
pub fn project(snapshot: &Snapshot, selection: &SelectionSet) -> Vec<ViewItem> {
    snapshot
        .entries()
        .map(|entry| {
            let marked = matches!(&entry, Entry::File(f) if selection.contains(&f.id));
            ViewItem { entry, marked }
        })
        .collect()
}
