//! seedr-dl - browse and download files from a Seedr cloud-torrent account.
//!
//! The library holds the navigation and transfer engine, independent of any
//! front-end: a [`RemoteStore`] abstraction over the service, an HTTP
//! implementation in [`api`], and a [`Transfer`] pipeline that streams files
//! to disk. The `tui` and `cli` features add the two front-ends.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use seedr_dl::api::{SeedrClient, Token};
//! use seedr_dl::{AppConfig, FileDescriptor, FileId, NoProgress, RemoteStore, Transfer, TransferProgress};
//!
//! # async fn example() -> seedr_dl::Result<()> {
//! let config = AppConfig::default();
//! let http = seedr_dl::api::http_client()?;
//! let remote = Arc::new(SeedrClient::new(http.clone(), config.api.clone(), Token::new("access-token")));
//!
//! // List the account root
//! let root = remote.list_contents(&seedr_dl::FolderId::root()).await?;
//! println!("{} items", root.len());
//!
//! // Download one file into the current directory
//! let transfer = Transfer::new(remote, http, config.transfer, ".");
//! let progress: Arc<dyn TransferProgress> = Arc::new(NoProgress);
//! let file = FileDescriptor::new(FileId::new("12345"), "movie.mkv");
//! let done = transfer.download_file(&file, &progress, None).await?;
//! println!("Saved {}", done.path.display());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod api;
pub mod config;
pub mod error;
pub mod external;
pub mod format;
pub mod fs;
pub mod nav;
pub mod remote;
pub mod selection;
pub mod transfer;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "tui")]
pub mod tui;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use config::{AppConfig, TransferConfig};
pub use error::{Error, RemoteErrorKind, Result};
pub use external::{Launcher, SystemLauncher};
pub use format::{format_bytes, format_duration};
pub use fs::{FileSystem, TokioFileSystem};
pub use nav::{FolderStack, NavigationCache};
pub use remote::{Entry, FileDescriptor, FileId, FolderId, RemoteStore, Snapshot};
pub use selection::SelectionSet;
pub use transfer::{BatchReport, NoProgress, Transfer, TransferProgress, TransferredFile};
