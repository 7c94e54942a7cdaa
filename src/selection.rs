//! Files marked for batch operations.

use std::collections::BTreeMap;

use crate::remote::{FileDescriptor, FileId};

/// Set of marked files, keyed by file id.
///
/// Callers must only insert file descriptors; folders and torrents are
/// filtered out before reaching here. Iteration is ordered by id so every
/// render sees the same order.
#[derive(Debug, Default, Clone)]
pub struct SelectionSet {
    members: BTreeMap<FileId, FileDescriptor>,
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the file if unmarked, unmarks it otherwise. Returns whether it is now marked.
    pub fn toggle(&mut self, descriptor: FileDescriptor) -> bool {
        if self.members.remove(&descriptor.id).is_some() {
            false
        } else {
            self.members.insert(descriptor.id.clone(), descriptor);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: &FileId) -> bool {
        self.members.contains_key(id)
    }

    pub fn members(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.members.values()
    }

    /// Owned copy of the members, for handing to a background transfer.
    #[must_use]
    pub fn to_vec(&self) -> Vec<FileDescriptor> {
        self.members.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
