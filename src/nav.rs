//! Folder navigation: the snapshot cache and the root-to-current folder stack.

use std::collections::HashMap;

use crate::remote::{FolderId, Snapshot};

/// Session-scoped cache of folder listings.
///
/// Entries stay until explicitly invalidated; there is no eviction.
#[derive(Debug, Default)]
pub struct NavigationCache {
    snapshots: HashMap<FolderId, Snapshot>,
}

impl NavigationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, folder: &FolderId) -> Option<&Snapshot> {
        self.snapshots.get(folder)
    }

    #[must_use]
    pub fn contains(&self, folder: &FolderId) -> bool {
        self.snapshots.contains_key(folder)
    }

    /// Stores `snapshot` under `folder`, replacing any previous listing.
    pub fn put(&mut self, folder: FolderId, snapshot: Snapshot) {
        self.snapshots.insert(folder, snapshot);
    }

    /// Removes the listing for `folder`, returning it if present.
    pub fn invalidate(&mut self, folder: &FolderId) -> Option<Snapshot> {
        self.snapshots.remove(folder)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// One level of the folder stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub id: FolderId,
    pub name: String,
}

/// Path from the root to the displayed folder. Never empty; the root is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderStack {
    crumbs: Vec<Crumb>,
}

impl Default for FolderStack {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderStack {
    /// A stack holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            crumbs: vec![Crumb {
                id: FolderId::root(),
                name: String::new(),
            }],
        }
    }

    /// Id of the displayed folder.
    #[must_use]
    pub fn current(&self) -> &FolderId {
        // The constructor seeds the root and `pop` never removes it.
        &self.crumbs[self.crumbs.len() - 1].id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.crumbs.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.crumbs.len() > 1
    }

    pub fn push(&mut self, id: FolderId, name: impl Into<String>) {
        self.crumbs.push(Crumb {
            id,
            name: name.into(),
        });
    }

    /// Leaves the current folder. Returns `None` and does nothing at the root.
    pub fn pop(&mut self) -> Option<Crumb> {
        if self.can_go_back() {
            self.crumbs.pop()
        } else {
            None
        }
    }

    /// Folder names below the root, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.crumbs.iter().skip(1).map(|c| c.name.as_str())
    }

    /// Slash-joined display path, `/` at the root.
    #[must_use]
    pub fn path(&self) -> String {
        let mut path = String::from("/");
        path.push_str(&self.segments().collect::<Vec<_>>().join("/"));
        path
    }
}
