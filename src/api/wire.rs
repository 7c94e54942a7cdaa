//! JSON bodies returned by the service.
//!
//! The service is loose with types: ids and sizes arrive as numbers or
//! strings, timestamps as `YYYY-MM-DD HH:MM:SS`, unix seconds or `null`.
//! Every field here decodes leniently and falls back to a default.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::remote::{
    AddTorrentOutcome, ArchiveLink, FileEntry, FileId, FileLink, FolderEntry, FolderId, Snapshot,
    TorrentEntry,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .map(Scalar::into_text)
        .unwrap_or_default())
}

fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .and_then(|s| s.as_i64())
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or_default())
}

fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?.and_then(|s| s.as_i64()))
}

fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?.and_then(parse_timestamp))
}

fn parse_timestamp(value: Scalar) -> Option<DateTime<Utc>> {
    match value {
        Scalar::Text(s) => NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| s.trim().parse().ok().and_then(|secs| DateTime::from_timestamp(secs, 0))),
        other => other.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
    }
}

/// `list_contents` response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Listing {
    #[serde(deserialize_with = "text")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub folder_id: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
    pub folders: Vec<WireFolder>,
    pub files: Vec<WireFile>,
    pub torrents: Vec<WireTorrent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireFolder {
    #[serde(deserialize_with = "text")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub fullname: String,
    #[serde(deserialize_with = "count")]
    pub size: u64,
    #[serde(deserialize_with = "timestamp")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireFile {
    /// Id accepted by `fetch_file`.
    #[serde(deserialize_with = "text")]
    pub folder_file_id: String,
    #[serde(deserialize_with = "text")]
    pub file_id: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "count")]
    pub size: u64,
    #[serde(deserialize_with = "timestamp")]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireTorrent {
    #[serde(deserialize_with = "text")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "count")]
    pub size: u64,
    #[serde(deserialize_with = "text")]
    pub progress: String,
    #[serde(deserialize_with = "timestamp")]
    pub last_update: Option<DateTime<Utc>>,
}

impl Listing {
    /// Converts to a [`Snapshot`] of `requested`.
    ///
    /// The root listing reports its own id as `0` or not at all, so the
    /// requested id is kept as the snapshot's identity.
    pub fn into_snapshot(self, requested: &FolderId) -> Snapshot {
        let folders = self
            .folders
            .into_iter()
            .map(|f| FolderEntry {
                id: FolderId::new(f.id),
                name: if f.name.is_empty() { f.fullname } else { f.name },
                size: f.size,
                last_update: f.last_update.or(f.timestamp),
            })
            .collect();
        let files = self
            .files
            .into_iter()
            .map(|f| FileEntry {
                id: FileId::new(if f.folder_file_id.is_empty() {
                    f.file_id
                } else {
                    f.folder_file_id
                }),
                name: f.name,
                size: f.size,
                last_update: f.last_update,
            })
            .collect();
        let torrents = self
            .torrents
            .into_iter()
            .map(|t| TorrentEntry {
                id: t.id,
                name: t.name,
                size: t.size,
                progress: t.progress,
                last_update: t.last_update,
            })
            .collect();

        Snapshot {
            folder_id: requested.clone(),
            name: self.name,
            folders,
            files,
            torrents,
        }
    }
}

/// `fetch_file` response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FetchFile {
    #[serde(deserialize_with = "text")]
    pub url: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
}

impl From<FetchFile> for FileLink {
    fn from(wire: FetchFile) -> Self {
        Self {
            url: wire.url,
            name: wire.name,
        }
    }
}

/// `create_empty_archive` response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Archive {
    #[serde(deserialize_with = "count")]
    pub archive_id: u64,
    #[serde(deserialize_with = "text")]
    pub archive_url: String,
}

impl From<Archive> for ArchiveLink {
    fn from(wire: Archive) -> Self {
        Self {
            archive_id: wire.archive_id,
            url: wire.archive_url,
        }
    }
}

/// `add_torrent` response, including the `result: false` shapes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddTorrent {
    pub result: Option<bool>,
    #[serde(deserialize_with = "text")]
    pub error: String,
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(deserialize_with = "opt_int")]
    pub code: Option<i64>,
    #[serde(deserialize_with = "opt_int")]
    pub user_torrent_id: Option<i64>,
}

impl From<AddTorrent> for AddTorrentOutcome {
    fn from(wire: AddTorrent) -> Self {
        Self {
            success: wire.result.unwrap_or(false),
            title: wire.title,
            code: wire.code,
            torrent_id: wire.user_torrent_id.and_then(|id| u64::try_from(id).ok()),
        }
    }
}

/// Device-code grant started by `seedr login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceCode {
    #[serde(deserialize_with = "text")]
    pub device_code: String,
    #[serde(deserialize_with = "text")]
    pub user_code: String,
    #[serde(deserialize_with = "text")]
    pub verification_url: String,
    #[serde(deserialize_with = "count")]
    pub expires_in: u64,
    #[serde(deserialize_with = "count")]
    pub interval: u64,
}

/// Token endpoint response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Grant {
    #[serde(deserialize_with = "text")]
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn listing_decodes_mixed_types() {
        let body = json!({
            "folder_id": 0,
            "name": "",
            "folders": [
                {"id": 12, "name": "Movies", "size": "1024", "last_update": "2024-03-01 10:20:30"}
            ],
            "files": [
                {"folder_file_id": 77, "file_id": 5, "name": "a.mkv", "size": 2048, "last_update": 1_700_000_000}
            ],
            "torrents": [
                {"id": "t1", "name": "ubuntu", "size": 10, "progress": 42.5, "last_update": null}
            ]
        });
        let listing: Listing = serde_json::from_value(body).unwrap();
        let snap = listing.into_snapshot(&FolderId::root());

        assert_eq!(snap.folder_id, FolderId::root());
        assert_eq!(snap.folders[0].id, FolderId::new("12"));
        assert_eq!(snap.folders[0].size, 1024);
        let when = snap.folders[0].last_update.unwrap();
        assert_eq!((when.year(), when.hour(), when.second()), (2024, 10, 30));

        assert_eq!(snap.files[0].id, FileId::new("77"));
        assert_eq!(snap.files[0].last_update.unwrap().timestamp(), 1_700_000_000);

        assert_eq!(snap.torrents[0].progress, "42.5");
        assert!(snap.torrents[0].last_update.is_none());
    }

    #[test]
    fn missing_collections_mean_empty_folder() {
        let listing: Listing = serde_json::from_value(json!({"result": true})).unwrap();
        assert!(listing.into_snapshot(&FolderId::new("3")).is_empty());
    }

    #[test]
    fn folder_falls_back_to_fullname_and_timestamp() {
        let folder: WireFolder = serde_json::from_value(json!({
            "id": 1, "fullname": "Shows/Season 1", "timestamp": "1700000000"
        }))
        .unwrap();
        let snap = Listing {
            folders: vec![folder],
            ..Listing::default()
        }
        .into_snapshot(&FolderId::root());
        assert_eq!(snap.folders[0].name, "Shows/Season 1");
        assert!(snap.folders[0].last_update.is_some());
    }

    #[test]
    fn unparseable_timestamp_is_none() {
        assert!(parse_timestamp(Scalar::Text("yesterday".to_string())).is_none());
        assert!(parse_timestamp(Scalar::Bool(true)).is_none());
    }

    #[test]
    fn add_torrent_conflict_maps_to_outcome() {
        let wire: AddTorrent =
            serde_json::from_value(json!({"result": false, "code": 409})).unwrap();
        let outcome = AddTorrentOutcome::from(wire);
        assert!(!outcome.success);
        assert!(outcome.already_added());
    }
}
