//! Transfer pipeline: resolves download links and streams file bodies to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::TransferConfig;
use crate::error::{BatchFailure, Error, RemoteErrorKind, Result, TransferStage};
use crate::format::fraction;
use crate::fs::{FileSystem, TokioFileSystem, local_file_name, part_path};
use crate::remote::{FileDescriptor, RemoteStore};

/// Trait for receiving transfer progress updates.
///
/// All methods have default no-op implementations for convenience.
pub trait TransferProgress: Send + Sync {
    /// Called when a file is attempted, before its download URL is resolved.
    fn on_file_begin(&self, _name: &str) {}

    /// Called once the content length is known, before the first byte is written.
    fn on_file_start(&self, _name: &str, _size: u64) {}

    /// Called after each chunk with the fraction of the current file written.
    fn on_progress(&self, _name: &str, _fraction: f64) {}

    /// Called when a file has been written and renamed into place.
    fn on_file_complete(&self, _file: &TransferredFile) {}

    /// Called when a file transfer fails.
    fn on_error(&self, _name: &str, _error: &str) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl TransferProgress for NoProgress {}

/// A file that finished downloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferredFile {
    /// Display name of the remote file.
    pub name: String,
    /// Final local path.
    pub path: PathBuf,
    /// Bytes written.
    pub size: u64,
    /// Wall time from link resolution to rename.
    pub elapsed: Duration,
}

/// Outcome of a best-effort batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of files attempted.
    pub attempted: usize,
    /// Files that completed, in batch order.
    pub completed: Vec<TransferredFile>,
    /// One error per failed file, in batch order.
    pub errors: Vec<Error>,
}

impl BatchReport {
    /// Total bytes written by completed files.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.completed.iter().map(|f| f.size).sum()
    }

    /// Collapses the report into the completed files or one aggregated error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Batch`] if any file failed.
    pub fn into_result(self) -> Result<Vec<TransferredFile>> {
        if self.errors.is_empty() {
            Ok(self.completed)
        } else {
            Err(Error::Batch(BatchFailure {
                attempted: self.attempted,
                errors: self.errors,
            }))
        }
    }
}

/// Local name and `.part` path of the file in flight, readable after the
/// transfer future is dropped.
struct Staged {
    name: String,
    part: Option<PathBuf>,
}

/// Downloads remote files into a local directory.
pub struct Transfer<F: FileSystem = TokioFileSystem> {
    remote: Arc<dyn RemoteStore>,
    http: reqwest::Client,
    config: TransferConfig,
    download_dir: PathBuf,
    fs: F,
}

impl Transfer<TokioFileSystem> {
    /// Creates a transfer pipeline with the default file system.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        http: reqwest::Client,
        config: TransferConfig,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::with_fs(remote, http, config, download_dir, TokioFileSystem)
    }
}

impl<F: FileSystem> Transfer<F> {
    /// Creates a transfer pipeline with a custom file system implementation.
    pub fn with_fs(
        remote: Arc<dyn RemoteStore>,
        http: reqwest::Client,
        config: TransferConfig,
        download_dir: impl Into<PathBuf>,
        fs: F,
    ) -> Self {
        Self {
            remote,
            http,
            config,
            download_dir: download_dir.into(),
            fs,
        }
    }

    /// Returns the transfer configuration.
    #[must_use]
    pub const fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Directory downloads are written to.
    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Local path a remote file named `name` is saved to.
    #[must_use]
    pub fn destination(&self, name: &str) -> PathBuf {
        self.download_dir.join(local_file_name(name))
    }

    /// Downloads a single file using atomic `.part` file semantics.
    ///
    /// The whole transfer is bounded by the configured per-file timeout. On
    /// error the `.part` file is removed if `cleanup_on_error` is enabled. A
    /// descriptor without a name is saved under the name the service reports.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Untrackable`] if the response has no usable content
    /// length, [`Error::Timeout`] if the budget runs out, [`Error::Cancelled`]
    /// if `cancel` fires, and [`Error::Transfer`] for every other failure.
    pub async fn download_file(
        &self,
        file: &FileDescriptor,
        progress: &Arc<dyn TransferProgress>,
        cancel: Option<CancellationToken>,
    ) -> Result<TransferredFile> {
        let mut staged = Staged {
            name: file.label().to_string(),
            part: None,
        };
        progress.on_file_begin(&staged.name);
        let budget = self.config.file_timeout();

        let work = tokio::time::timeout(budget, self.stream_to_disk(file, &mut staged, progress));
        let outcome = match cancel {
            Some(token) => tokio::select! {
                res = work => res,
                () = token.cancelled() => Ok(Err(Error::Cancelled { name: file.label().to_string() })),
            },
            None => work.await,
        };
        let result = outcome.unwrap_or_else(|_| {
            Err(Error::Timeout {
                operation: format!("download of {}", staged.name),
                after: budget,
            })
        });

        match result {
            Ok(done) => {
                log::info!("Downloaded {} to {}", done.name, done.path.display());
                progress.on_file_complete(&done);
                Ok(done)
            }
            Err(e) => {
                if self.config.cleanup_on_error
                    && let Some(part) = staged.part.as_deref()
                    && self.fs.file_exists(part).await
                    && let Err(rm) = self.fs.remove_file(part).await
                {
                    log::warn!("Could not remove {}: {rm}", part.display());
                }
                if !matches!(e, Error::Cancelled { .. }) {
                    progress.on_error(&staged.name, &e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Downloads every file in order, continuing past failures.
    ///
    /// A cancellation stops the batch after recording the cancelled file.
    pub async fn download_batch(
        &self,
        files: &[FileDescriptor],
        progress: &Arc<dyn TransferProgress>,
        cancel: Option<CancellationToken>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for file in files {
            report.attempted += 1;
            match self.download_file(file, progress, cancel.clone()).await {
                Ok(done) => report.completed.push(done),
                Err(e @ Error::Cancelled { .. }) => {
                    report.errors.push(e);
                    break;
                }
                Err(e) => {
                    log::error!("Download failed: {e}");
                    report.errors.push(e);
                }
            }
        }
        log::debug!(
            "Batch finished: {} of {} files downloaded",
            report.completed.len(),
            report.attempted
        );
        report
    }

    /// Ensures the parent directory exists for a file path.
    async fn ensure_parent_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn stream_to_disk(
        &self,
        file: &FileDescriptor,
        staged: &mut Staged,
        progress: &Arc<dyn TransferProgress>,
    ) -> Result<TransferredFile> {
        let started = Instant::now();

        let lookup_budget = self.config.metadata_timeout();
        let link = tokio::time::timeout(lookup_budget, self.remote.fetch_file_url(&file.id))
            .await
            .unwrap_or_else(|_| {
                Err(Error::Timeout {
                    operation: "download URL lookup".to_string(),
                    after: lookup_budget,
                })
            })
            .map_err(|e| Error::transfer(TransferStage::ResolveUrl, staged.name.as_str(), e))?;

        // Unnamed descriptors take the name the service reports.
        if file.name.is_empty() && !link.name.is_empty() {
            staged.name.clone_from(&link.name);
        }
        let local_name = staged.name.clone();
        let name = local_name.as_str();
        let dest = self.destination(name);
        let part = part_path(&dest);
        staged.part = Some(part.clone());
        log::debug!("Resolved {name} to {}", link.url);

        let response = self
            .http
            .get(&link.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::transfer(TransferStage::Connect, name, Error::Http(e)))?;

        let total = response
            .content_length()
            .filter(|&n| n > 0)
            .ok_or_else(|| Error::Untrackable {
                name: name.to_string(),
            })?;
        progress.on_file_start(name, total);

        self.ensure_parent_dir(&dest)
            .await
            .map_err(|e| Error::transfer(TransferStage::CreateFile, name, e))?;
        let mut out = self
            .fs
            .create_file(&part)
            .await
            .map_err(|e| Error::transfer(TransferStage::CreateFile, name, e.into()))?;

        let chunk_size = self.config.effective_chunk_size();
        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::transfer(TransferStage::Read, name, Error::Http(e)))?;
            for piece in chunk.chunks(chunk_size) {
                out.write_all(piece)
                    .await
                    .map_err(|e| Error::transfer(TransferStage::Write, name, e.into()))?;
                written += piece.len() as u64;
                progress.on_progress(name, fraction(written, total));
            }
        }
        out.flush()
            .await
            .map_err(|e| Error::transfer(TransferStage::Write, name, e.into()))?;
        drop(out);

        if written != total {
            return Err(Error::transfer(
                TransferStage::Read,
                name,
                Error::remote(
                    RemoteErrorKind::Network,
                    format!("stream ended after {written} of {total} bytes"),
                ),
            ));
        }

        self.fs
            .rename(&part, &dest)
            .await
            .map_err(|e| Error::transfer(TransferStage::Write, name, e.into()))?;

        Ok(TransferredFile {
            name: name.to_string(),
            path: dest,
            size: total,
            elapsed: started.elapsed(),
        })
    }
}
