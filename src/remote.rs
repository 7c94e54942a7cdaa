//! Read model of the remote file tree and the capabilities the client core consumes.
//!
//! The [`RemoteStore`] trait is the only seam between the navigation and
//! transfer engine and the HTTP client in [`crate::api`]; tests substitute a
//! fake implementation.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Identifier of a remote folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderId(String);

impl FolderId {
    /// Sentinel id of the account root.
    pub const ROOT: &'static str = "0";

    /// Wraps a raw folder id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The account root folder.
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Whether this is the account root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// Raw id as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a remote file. Distinct id space from [`FolderId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    /// Wraps a raw file id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A subfolder listed in a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub id: FolderId,
    pub name: String,
    pub size: u64,
    pub last_update: Option<DateTime<Utc>>,
}

/// A file listed in a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub last_update: Option<DateTime<Utc>>,
}

/// A torrent the service is still downloading into the folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentEntry {
    pub id: String,
    pub name: String,
    pub size: u64,
    /// Progress as reported by the service, usually a percentage.
    pub progress: String,
    pub last_update: Option<DateTime<Utc>>,
}

/// Kind discriminant for listed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Folder,
    File,
    Torrent,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Folder => "Folder",
            Self::File => "File",
            Self::Torrent => "Torrent",
        })
    }
}

/// One child of a folder, whatever its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Folder(FolderEntry),
    File(FileEntry),
    Torrent(TorrentEntry),
}

impl Entry {
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self {
            Self::Folder(_) => ItemKind::Folder,
            Self::File(_) => ItemKind::File,
            Self::Torrent(_) => ItemKind::Torrent,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => &f.name,
            Self::File(f) => &f.name,
            Self::Torrent(t) => &t.name,
        }
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        match self {
            Self::Folder(f) => f.size,
            Self::File(f) => f.size,
            Self::Torrent(t) => t.size,
        }
    }

    #[must_use]
    pub const fn last_update(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Folder(f) => f.last_update.as_ref(),
            Self::File(f) => f.last_update.as_ref(),
            Self::Torrent(t) => t.last_update.as_ref(),
        }
    }

    /// Transfer descriptor for file entries; `None` for folders and torrents.
    #[must_use]
    pub fn file_descriptor(&self) -> Option<FileDescriptor> {
        match self {
            Self::File(f) => Some(FileDescriptor::new(f.id.clone(), f.name.clone())),
            _ => None,
        }
    }
}

/// Point-in-time listing of one folder's direct children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub folder_id: FolderId,
    /// Display name of the folder itself, when the service reports one.
    pub name: String,
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
    pub torrents: Vec<TorrentEntry>,
}

impl Snapshot {
    /// An empty listing for `folder_id`.
    #[must_use]
    pub const fn empty(folder_id: FolderId) -> Self {
        Self {
            folder_id,
            name: String::new(),
            folders: Vec::new(),
            files: Vec::new(),
            torrents: Vec::new(),
        }
    }

    /// Total number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len() + self.files.len() + self.torrents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children in display order: folders, then files, then torrents.
    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        self.folders
            .iter()
            .cloned()
            .map(Entry::Folder)
            .chain(self.files.iter().cloned().map(Entry::File))
            .chain(self.torrents.iter().cloned().map(Entry::Torrent))
    }
}

/// Lightweight reference to a remote file, used for marking and transfers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileDescriptor {
    pub id: FileId,
    pub name: String,
    pub kind: ItemKind,
}

impl FileDescriptor {
    /// Describes a file entry.
    pub fn new(id: FileId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ItemKind::File,
        }
    }

    /// Describes a file known only by id; the name comes from its link.
    #[must_use]
    pub const fn unnamed(id: FileId) -> Self {
        Self {
            id,
            name: String::new(),
            kind: ItemKind::File,
        }
    }

    /// Name for messages: the file name, or the id while it is unknown.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.name.is_empty() { self.id.as_str() } else { &self.name }
    }
}

/// Resolved download link for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub url: String,
    pub name: String,
}

/// Resolved link to a zip archive of a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLink {
    pub archive_id: u64,
    pub url: String,
}

/// What to add as a new torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSource {
    /// A `magnet:` URI.
    Magnet(String),
    /// Contents of a `.torrent` file.
    File { name: String, bytes: Vec<u8> },
    /// An entry already on the account wishlist.
    Wishlist(String),
}

/// Result of an add-torrent call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrentOutcome {
    pub success: bool,
    pub title: String,
    /// Service status code; `409` means the torrent was already added.
    pub code: Option<i64>,
    pub torrent_id: Option<u64>,
}

impl AddTorrentOutcome {
    #[must_use]
    pub fn already_added(&self) -> bool {
        self.code == Some(409)
    }
}

/// Remote capabilities the navigation and transfer engine depends on.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lists the direct children of `folder`.
    async fn list_contents(&self, folder: &FolderId) -> Result<Snapshot>;

    /// Resolves a short-lived download URL for `file`.
    async fn fetch_file_url(&self, file: &FileId) -> Result<FileLink>;

    /// Packs `folder` into a downloadable archive.
    async fn create_archive(&self, folder: &FolderId) -> Result<ArchiveLink>;

    /// Adds a torrent into `folder`.
    async fn add_torrent(&self, source: TorrentSource, folder: &FolderId) -> Result<AddTorrentOutcome>;

    /// Deletes a file.
    async fn delete_file(&self, file: &FileId) -> Result<()>;

    /// Deletes a folder and everything below it.
    async fn delete_folder(&self, folder: &FolderId) -> Result<()>;
}
