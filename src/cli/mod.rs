//! CLI mode for seedr - non-interactive listing, linking, adding and downloading.

mod progress;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use console::style;
use futures::future::BoxFuture;
use regex::Regex;

use crate::api::{SeedrClient, Token, TokenStore};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::format::format_bytes;
use crate::remote::{FileDescriptor, FileId, FolderId, RemoteStore, Snapshot, TorrentSource};
use crate::transfer::{Transfer, TransferProgress};

pub use progress::{CliProgress, make_progress_bar, print_summary};

static MAGNET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^magnet:\?").expect("valid regex"));

/// Interprets a command-line torrent argument.
///
/// Magnet URIs are passed through, paths ending in `.torrent` are read from
/// disk, and with `wishlist` set the argument is a wishlist entry id.
///
/// # Errors
/// Returns [`Error::Io`] if a torrent file cannot be read or the input is not recognised.
pub async fn parse_source(input: &str, wishlist: bool) -> Result<TorrentSource> {
    if wishlist {
        return Ok(TorrentSource::Wishlist(input.to_string()));
    }
    if MAGNET_RE.is_match(input) {
        log::debug!("Detected magnet link");
        return Ok(TorrentSource::Magnet(input.to_string()));
    }
    if input.to_ascii_lowercase().ends_with(".torrent") {
        let bytes = tokio::fs::read(input).await?;
        let name = Path::new(input)
            .file_name()
            .map_or_else(|| "upload.torrent".to_string(), |n| n.to_string_lossy().into_owned());
        log::debug!("Read torrent file {input} ({} bytes)", bytes.len());
        return Ok(TorrentSource::File { name, bytes });
    }
    Err(Error::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("not a magnet link or .torrent file: {input}"),
    )))
}

/// Renders the tree below `folder`, one line per item, depth-first.
///
/// A subfolder that cannot be listed is reported on its own line and the
/// walk moves on to its siblings.
///
/// # Errors
/// Returns the error if `folder` itself cannot be listed.
pub async fn tree(remote: &dyn RemoteStore, folder: &FolderId) -> Result<Vec<String>> {
    let root = remote.list_contents(folder).await?;
    let mut lines = Vec::new();
    walk(remote, root, 0, &mut lines).await;
    Ok(lines)
}

fn walk<'a>(
    remote: &'a dyn RemoteStore,
    snapshot: Snapshot,
    depth: usize,
    lines: &'a mut Vec<String>,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let indent = "  ".repeat(depth);
        for sub in &snapshot.folders {
            match remote.list_contents(&sub.id).await {
                Ok(children) => {
                    lines.push(format!("{indent}{}/ (ID: {})", sub.name, sub.id));
                    walk(remote, children, depth + 1, lines).await;
                }
                Err(e) => {
                    log::warn!("Could not list folder {}: {e}", sub.id);
                    lines.push(format!("{indent}{}/ (ID: {}) (Error: {e})", sub.name, sub.id));
                }
            }
        }
        for file in &snapshot.files {
            lines.push(format!(
                "{indent}{} ({}) (ID: {})",
                file.name,
                format_bytes(file.size),
                file.id
            ));
        }
        for torrent in &snapshot.torrents {
            lines.push(format!("{indent}{} [{}%]", torrent.name, torrent.progress));
        }
    })
}

/// `seedr list`: prints the tree below `folder`.
///
/// # Errors
/// Returns the first listing error.
pub async fn list(remote: &dyn RemoteStore, folder: &FolderId) -> Result<()> {
    let lines = tree(remote, folder).await?;
    if lines.is_empty() {
        println!("No files found.");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// `seedr get`: prints a file's download URL, or an archive URL for a folder.
///
/// # Errors
/// Returns the remote error if the link cannot be created.
pub async fn get(remote: &dyn RemoteStore, id: &str, folder: bool) -> Result<()> {
    if folder {
        let archive = remote.create_archive(&FolderId::new(id)).await?;
        println!("{}", archive.url);
    } else {
        let link = remote.fetch_file_url(&FileId::new(id)).await?;
        println!("{}", link.url);
    }
    Ok(())
}

/// Text reported for an add-torrent result.
#[must_use]
pub fn describe_added(outcome: &crate::remote::AddTorrentOutcome) -> String {
    if outcome.already_added() {
        "Torrent already added.".to_string()
    } else if outcome.success {
        format!("Added '{}' successfully.", outcome.title)
    } else {
        "Failed to add torrent.".to_string()
    }
}

/// `seedr add`: adds a magnet link or torrent file into `folder`.
///
/// # Errors
/// Returns an error if the source cannot be read or the service rejects it.
pub async fn add(remote: &dyn RemoteStore, input: &str, wishlist: bool, folder: &FolderId) -> Result<()> {
    let source = parse_source(input, wishlist).await?;
    let outcome = remote.add_torrent(source, folder).await?;
    let message = describe_added(&outcome);
    if outcome.success {
        println!("{}", style(message).green());
    } else {
        println!("{}", style(message).yellow());
    }
    Ok(())
}

/// `seedr download`: downloads files by id, one after another.
///
/// Names come from each file's link lookup, so an id that cannot be resolved
/// fails on its own while the rest still download.
///
/// # Errors
/// Returns the transfer error for a single id, or [`Error::Batch`] listing
/// every file that failed.
pub async fn download(transfer: &Transfer, ids: &[String]) -> Result<()> {
    let files: Vec<FileDescriptor> = ids
        .iter()
        .map(|id| FileDescriptor::unnamed(FileId::new(id.as_str())))
        .collect();

    println!(
        "{} {} file(s) to {}",
        style("Downloading").cyan().bold(),
        files.len(),
        transfer.download_dir().display()
    );
    let progress: Arc<dyn TransferProgress> = Arc::new(CliProgress::new());
    if let [file] = files.as_slice() {
        return transfer.download_file(file, &progress, None).await.map(|_| ());
    }

    let started = Instant::now();
    let report = transfer.download_batch(&files, &progress, None).await;
    print_summary(&report, started.elapsed());
    report.into_result().map(|_| ())
}

/// `seedr rm`: deletes a file, or a folder with `folder` set.
///
/// # Errors
/// Returns the remote error if the service refuses the deletion.
pub async fn rm(remote: &dyn RemoteStore, id: &str, folder: bool) -> Result<()> {
    let kind = if folder {
        remote.delete_folder(&FolderId::new(id)).await?;
        "folder"
    } else {
        remote.delete_file(&FileId::new(id)).await?;
        "file"
    };
    println!("{}", style(format!("Deleted {kind} {id}.")).green());
    Ok(())
}

/// `seedr login`: runs the device-code flow and saves the token.
///
/// # Errors
/// Returns an error if the service refuses the code or the token cannot be saved.
pub async fn login(http: &reqwest::Client, api: &ApiConfig, store: &TokenStore) -> Result<Token> {
    let code = SeedrClient::request_device_code(http, api).await?;
    println!(
        "Please go to {} and enter the code: {}",
        code.verification_url, code.user_code
    );
    print!("Press Enter after authorizing the device.");
    io::stdout().flush()?;
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map(|_| ())
    })
    .await
    .map_err(|e| Error::Io(io::Error::other(e)))??;

    let token = SeedrClient::authorize_device(http, api, &code.device_code).await?;
    store.save(&token).await?;
    println!("Authorization successful. Token saved to {}", store.path().display());
    log::info!("Logged in: {token:?}");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{AddTorrentOutcome, TorrentEntry};
    use crate::config::TransferConfig;
    use crate::testing::{Call, FakeRemote, file, folder, listing};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn magnet_and_torrent_file_are_recognised() {
        assert!(matches!(
            parse_source("MAGNET:?xt=urn:btih:abc", false).await.unwrap(),
            TorrentSource::Magnet(_)
        ));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Ubuntu.TORRENT");
        std::fs::write(&path, b"d4:infoe").unwrap();
        match parse_source(path.to_str().unwrap(), false).await.unwrap() {
            TorrentSource::File { name, bytes } => {
                assert_eq!(name, "Ubuntu.TORRENT");
                assert_eq!(bytes, b"d4:infoe");
            }
            other => panic!("unexpected source {other:?}"),
        }

        assert_eq!(
            parse_source("17", true).await.unwrap(),
            TorrentSource::Wishlist("17".to_string())
        );
        assert!(parse_source("https://example.com/page", false).await.is_err());
    }

    #[tokio::test]
    async fn tree_walks_folders_depth_first() {
        let mut root = listing(FolderId::root(), vec![folder("1", "Movies")], vec![file("9", "readme.txt", 2048)]);
        root.torrents.push(TorrentEntry {
            id: "t".to_string(),
            name: "ubuntu".to_string(),
            size: 1,
            progress: "40".to_string(),
            last_update: None,
        });
        let remote = FakeRemote::new()
            .with_listing(root)
            .with_listing(listing(FolderId::new("1"), vec![], vec![file("5", "a.mkv", 1024)]));

        let lines = tree(&remote, &FolderId::root()).await.unwrap();
        assert_eq!(
            lines,
            vec![
                "Movies/ (ID: 1)".to_string(),
                "  a.mkv (1.00 KB) (ID: 5)".to_string(),
                "readme.txt (2.00 KB) (ID: 9)".to_string(),
                "ubuntu [40%]".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn tree_reports_unlistable_folder_and_keeps_going() {
        let root = listing(
            FolderId::root(),
            vec![folder("1", "Broken"), folder("2", "Shows")],
            vec![file("9", "readme.txt", 2048)],
        );
        let remote = FakeRemote::new()
            .with_listing(root)
            .with_list_error(FolderId::new("1"), "HTTP 500")
            .with_listing(listing(FolderId::new("2"), vec![], vec![file("6", "e01.mkv", 1024)]));

        let lines = tree(&remote, &FolderId::root()).await.unwrap();
        assert_eq!(
            lines,
            vec![
                "Broken/ (ID: 1) (Error: server error: HTTP 500)".to_string(),
                "Shows/ (ID: 2)".to_string(),
                "  e01.mkv (1.00 KB) (ID: 6)".to_string(),
                "readme.txt (2.00 KB) (ID: 9)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn tree_fails_when_the_start_folder_fails() {
        let remote = FakeRemote::new().with_list_error(FolderId::root(), "HTTP 500");
        assert!(tree(&remote, &FolderId::root()).await.is_err());
    }

    #[tokio::test]
    async fn download_continues_past_an_unresolvable_id() {
        let server = MockServer::start().await;
        for (route, len) in [("/dl/a", 10usize), ("/dl/c", 30)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; len]))
                .mount(&server)
                .await;
        }

        let dir = TempDir::new().unwrap();
        let remote = FakeRemote::new()
            .with_named_link("a", format!("{}/dl/a", server.uri()), "a.bin")
            .with_link_error("b", "file not found")
            .with_named_link("c", format!("{}/dl/c", server.uri()), "c.bin");
        let transfer = Transfer::new(
            Arc::new(remote),
            reqwest::Client::new(),
            TransferConfig::default(),
            dir.path(),
        );

        let ids = ["a", "b", "c"].map(String::from);
        let err = download(&transfer, &ids).await.unwrap_err();

        assert!(dir.path().join("a.bin").exists());
        assert!(dir.path().join("c.bin").exists());
        match err {
            Error::Batch(failure) => {
                assert_eq!(failure.attempted, 3);
                assert_eq!(failure.errors.len(), 1);
                assert_eq!(
                    failure.errors[0].to_string(),
                    "failed to get download URL for b: API error: file not found"
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_download_returns_the_file_error() {
        let dir = TempDir::new().unwrap();
        let remote = FakeRemote::new().with_link_error("b", "file not found");
        let transfer = Transfer::new(
            Arc::new(remote),
            reqwest::Client::new(),
            TransferConfig::default(),
            dir.path(),
        );

        let err = download(&transfer, &["b".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Transfer { ref name, .. } if name == "b"));
    }

    #[tokio::test]
    async fn rm_deletes_file_or_folder() {
        let remote = FakeRemote::new();
        rm(&remote, "7", false).await.unwrap();
        rm(&remote, "9", true).await.unwrap();
        assert_eq!(
            remote.calls(),
            vec![
                Call::DeleteFile(FileId::new("7")),
                Call::DeleteFolder(FolderId::new("9")),
            ]
        );
    }

    #[test]
    fn add_outcomes_are_described() {
        let mut outcome = AddTorrentOutcome {
            success: true,
            title: "Ubuntu".to_string(),
            code: None,
            torrent_id: Some(3),
        };
        assert_eq!(describe_added(&outcome), "Added 'Ubuntu' successfully.");
        outcome.success = false;
        outcome.code = Some(409);
        assert_eq!(describe_added(&outcome), "Torrent already added.");
    }
}
