//! Test doubles for the remote store and external launcher.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, RemoteErrorKind, Result};
use crate::external::Launcher;
use crate::remote::{
    AddTorrentOutcome, ArchiveLink, FileEntry, FileId, FileLink, FolderEntry, FolderId,
    RemoteStore, Snapshot, TorrentSource,
};

/// A call observed by [`FakeRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(FolderId),
    FetchUrl(FileId),
    Archive(FolderId),
    AddTorrent(FolderId),
    DeleteFile(FileId),
    DeleteFolder(FolderId),
}

/// In-memory [`RemoteStore`] with canned answers and a call log.
#[derive(Default)]
pub struct FakeRemote {
    listings: Mutex<HashMap<FolderId, std::result::Result<Snapshot, String>>>,
    links: Mutex<HashMap<FileId, std::result::Result<FileLink, String>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(self, snapshot: Snapshot) -> Self {
        self.set_listing(snapshot);
        self
    }

    pub fn with_list_error(self, folder: FolderId, message: &str) -> Self {
        self.listings
            .lock()
            .unwrap()
            .insert(folder, Err(message.to_string()));
        self
    }

    pub fn with_link(self, id: &str, url: impl Into<String>) -> Self {
        self.with_named_link(id, url, id)
    }

    pub fn with_named_link(self, id: &str, url: impl Into<String>, name: &str) -> Self {
        let link = FileLink {
            url: url.into(),
            name: name.to_string(),
        };
        self.links.lock().unwrap().insert(FileId::new(id), Ok(link));
        self
    }

    pub fn with_link_error(self, id: &str, message: &str) -> Self {
        self.links
            .lock()
            .unwrap()
            .insert(FileId::new(id), Err(message.to_string()));
        self
    }

    /// Replaces the answer for a folder after construction.
    pub fn set_listing(&self, snapshot: Snapshot) {
        self.listings
            .lock()
            .unwrap()
            .insert(snapshot.folder_id.clone(), Ok(snapshot));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self, folder: &FolderId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::List(id) if id == folder))
            .count()
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list_contents(&self, folder: &FolderId) -> Result<Snapshot> {
        self.calls.lock().unwrap().push(Call::List(folder.clone()));
        match self.listings.lock().unwrap().get(folder) {
            Some(Ok(snapshot)) => Ok(snapshot.clone()),
            Some(Err(message)) => Err(Error::remote(RemoteErrorKind::Server, message.clone())),
            None => Err(Error::remote(RemoteErrorKind::Api, "folder not found")),
        }
    }

    async fn fetch_file_url(&self, file: &FileId) -> Result<FileLink> {
        self.calls.lock().unwrap().push(Call::FetchUrl(file.clone()));
        match self.links.lock().unwrap().get(file) {
            Some(Ok(link)) => Ok(link.clone()),
            Some(Err(message)) => Err(Error::remote(RemoteErrorKind::Api, message.clone())),
            None => Err(Error::remote(RemoteErrorKind::Api, "file not found")),
        }
    }

    async fn create_archive(&self, folder: &FolderId) -> Result<ArchiveLink> {
        self.calls.lock().unwrap().push(Call::Archive(folder.clone()));
        Ok(ArchiveLink {
            archive_id: 1,
            url: format!("https://archive.invalid/{folder}.zip"),
        })
    }

    async fn add_torrent(&self, _source: TorrentSource, folder: &FolderId) -> Result<AddTorrentOutcome> {
        self.calls.lock().unwrap().push(Call::AddTorrent(folder.clone()));
        Ok(AddTorrentOutcome {
            success: true,
            title: "fake".to_string(),
            code: None,
            torrent_id: Some(1),
        })
    }

    async fn delete_file(&self, file: &FileId) -> Result<()> {
        self.calls.lock().unwrap().push(Call::DeleteFile(file.clone()));
        Ok(())
    }

    async fn delete_folder(&self, folder: &FolderId) -> Result<()> {
        self.calls.lock().unwrap().push(Call::DeleteFolder(folder.clone()));
        Ok(())
    }
}

/// [`Launcher`] that records what it was asked to do.
#[derive(Default)]
pub struct FakeLauncher {
    copied: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
    fail_with: Option<String>,
}

impl FakeLauncher {
    /// A launcher whose every action fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        if let Some(message) = &self.fail_with {
            return Err(Error::External(message.clone()));
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn open_in_player(&self, url: &str) -> Result<()> {
        if let Some(message) = &self.fail_with {
            return Err(Error::External(message.clone()));
        }
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn player_name(&self) -> &str {
        "fake-player"
    }
}

pub fn folder(id: &str, name: &str) -> FolderEntry {
    FolderEntry {
        id: FolderId::new(id),
        name: name.to_string(),
        size: 0,
        last_update: None,
    }
}

pub fn file(id: &str, name: &str, size: u64) -> FileEntry {
    FileEntry {
        id: FileId::new(id),
        name: name.to_string(),
        size,
        last_update: None,
    }
}

pub fn listing(folder_id: FolderId, folders: Vec<FolderEntry>, files: Vec<FileEntry>) -> Snapshot {
    Snapshot {
        folder_id,
        name: String::new(),
        folders,
        files,
        torrents: Vec::new(),
    }
}
