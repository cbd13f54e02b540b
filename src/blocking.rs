//! Blocking SFTP client
//!
//! The same traversal engine with a blocking invocation mechanism: a thin
//! wrapper owning the async [`SftpClient`](crate::SftpClient) and a private
//! current-thread runtime. Observers here are plain traits with the same
//! shapes as the async ones; adapters bridge them into the engine.
//!
//! Do not use this client inside an async context: it blocks the calling
//! thread for the duration of each operation.

use std::io::Read;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::runtime::{Builder, Runtime};
use tracing::warn;

use crate::config::SftpConfig;
use crate::error::Result;
use crate::progress;
use crate::session::SessionOps;
use crate::types::{DirListing, LocalEntry, RemoteEntry};

/// Observer for recursive downloads, notified per transferred item.
pub trait DownloadObserver: Send + Sync {
    fn item_downloaded(
        &self,
        entry: &RemoteEntry,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()>;
}

/// Observer for recursive uploads, notified per transferred item.
pub trait UploadObserver: Send + Sync {
    fn item_uploaded(&self, entry: &LocalEntry, local_path: &Path, remote_path: &str)
        -> Result<()>;
}

/// Observer for recursive deletes, notified per removed item.
pub trait DeleteObserver: Send + Sync {
    fn item_deleted(&self, entry: &RemoteEntry, remote_path: &str) -> Result<()>;
}

/// Observer for directory listings.
pub trait ListingObserver: Send + Sync {
    fn directory_listed(&self, listing: &DirListing) -> Result<()>;
}

// ── Bridges into the async engine ───────────────────────────────────────

struct SyncDownload<'a>(&'a dyn DownloadObserver);

#[async_trait]
impl progress::DownloadObserver for SyncDownload<'_> {
    async fn item_downloaded(
        &self,
        entry: &RemoteEntry,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()> {
        self.0.item_downloaded(entry, local_path, remote_path)
    }
}

struct SyncUpload<'a>(&'a dyn UploadObserver);

#[async_trait]
impl progress::UploadObserver for SyncUpload<'_> {
    async fn item_uploaded(
        &self,
        entry: &LocalEntry,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()> {
        self.0.item_uploaded(entry, local_path, remote_path)
    }
}

struct SyncDelete<'a>(&'a dyn DeleteObserver);

#[async_trait]
impl progress::DeleteObserver for SyncDelete<'_> {
    async fn item_deleted(&self, entry: &RemoteEntry, remote_path: &str) -> Result<()> {
        self.0.item_deleted(entry, remote_path)
    }
}

struct SyncListing<'a>(&'a dyn ListingObserver);

#[async_trait]
impl progress::ListingObserver for SyncListing<'_> {
    async fn directory_listed(&self, listing: &DirListing) -> Result<()> {
        self.0.directory_listed(listing)
    }
}

/// Adapts a blocking reader for the async engine. Reads block the driving
/// thread, which is exactly what this client promises.
struct SyncReader<'a, R: ?Sized>(&'a mut R);

impl<R: Read + Send + Unpin + ?Sized> AsyncRead for SyncReader<'_, R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let n = self.0.read(buf.initialize_unfilled())?;
        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

/// Blocking SFTP client with recursive directory operations.
///
/// Mirrors [`SftpClient`](crate::SftpClient) operation for operation; see
/// the async client for the full contracts. The session is released on
/// [`disconnect`](Self::disconnect) and on drop.
pub struct SftpClient {
    inner: crate::SftpClient,
    runtime: Runtime,
}

impl SftpClient {
    /// Create a client from a configuration. No IO happens here beyond
    /// building the private runtime.
    pub fn new(config: SftpConfig) -> Result<Self> {
        Ok(Self {
            inner: crate::SftpClient::new(config),
            runtime: Builder::new_current_thread().enable_all().build()?,
        })
    }

    /// Create a client around an externally built session.
    pub fn with_session(config: SftpConfig, session: Box<dyn SessionOps>) -> Result<Self> {
        Ok(Self {
            inner: crate::SftpClient::with_session(config, session),
            runtime: Builder::new_current_thread().enable_all().build()?,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Establish the connection. Idempotent on an open session.
    pub fn connect(&mut self) -> Result<&mut Self> {
        self.runtime.block_on(self.inner.connect())?;
        Ok(self)
    }

    /// Replace the configuration, then connect.
    pub fn connect_with(&mut self, config: SftpConfig) -> Result<&mut Self> {
        self.runtime.block_on(self.inner.connect_with(config))?;
        Ok(self)
    }

    /// Replace the configuration, connecting immediately when its
    /// `auto_connect` flag is set.
    pub fn apply_config(&mut self, config: SftpConfig) -> Result<&mut Self> {
        self.runtime.block_on(self.inner.apply_config(config))?;
        Ok(self)
    }

    /// Close and release the session. Safe no-op without one.
    pub fn disconnect(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.disconnect())
    }

    pub fn list_directory(&mut self, path: &str) -> Result<DirListing> {
        self.runtime.block_on(self.inner.list_directory(path))
    }

    pub fn list_directory_with(
        &mut self,
        path: &str,
        observer: Option<&dyn ListingObserver>,
    ) -> Result<DirListing> {
        let bridge = observer.map(SyncListing);
        self.runtime.block_on(self.inner.list_directory_with(
            path,
            bridge.as_ref().map(|b| b as &dyn progress::ListingObserver),
        ))
    }

    pub fn download_file(&mut self, remote_path: &str, local_path: impl AsRef<Path>) -> Result<()> {
        self.runtime
            .block_on(self.inner.download_file(remote_path, local_path))
    }

    pub fn upload_file(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
        overwrite: bool,
    ) -> Result<()> {
        self.runtime
            .block_on(self.inner.upload_file(local_path, remote_path, overwrite))
    }

    /// Upload from an already-open reader to `remote_path`.
    pub fn upload_from_reader<R>(
        &mut self,
        reader: &mut R,
        remote_path: &str,
        overwrite: bool,
    ) -> Result<()>
    where
        R: Read + Send + Unpin + ?Sized,
    {
        let mut reader = SyncReader(reader);
        self.runtime
            .block_on(
                self.inner
                    .upload_from_reader(&mut reader, remote_path, overwrite),
            )
    }

    pub fn delete_file(&mut self, remote_path: &str) -> Result<()> {
        self.runtime.block_on(self.inner.delete_file(remote_path))
    }

    pub fn delete_files<I, S>(&mut self, remote_paths: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.runtime.block_on(self.inner.delete_files(remote_paths))
    }

    pub fn make_directory(&mut self, remote_path: &str) -> Result<()> {
        self.runtime
            .block_on(self.inner.make_directory(remote_path))
    }

    pub fn file_exists(&mut self, remote_path: &str) -> Result<bool> {
        self.runtime.block_on(self.inner.file_exists(remote_path))
    }

    pub fn directory_exists(&mut self, remote_path: &str) -> Result<bool> {
        self.runtime
            .block_on(self.inner.directory_exists(remote_path))
    }

    /// Recursively download a remote directory tree. See
    /// [`SftpClient::download_directory`](crate::SftpClient::download_directory).
    pub fn download_directory(
        &mut self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
        observer: Option<&dyn DownloadObserver>,
    ) -> Result<()> {
        let bridge = observer.map(SyncDownload);
        self.runtime.block_on(self.inner.download_directory(
            remote_path,
            local_path,
            bridge.as_ref().map(|b| b as &dyn progress::DownloadObserver),
        ))
    }

    /// Recursively upload a local directory tree. See
    /// [`SftpClient::upload_directory`](crate::SftpClient::upload_directory).
    pub fn upload_directory(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
        overwrite: bool,
        observer: Option<&dyn UploadObserver>,
    ) -> Result<()> {
        let bridge = observer.map(SyncUpload);
        self.runtime.block_on(self.inner.upload_directory(
            local_path,
            remote_path,
            overwrite,
            bridge.as_ref().map(|b| b as &dyn progress::UploadObserver),
        ))
    }

    /// Recursively delete a remote directory tree. See
    /// [`SftpClient::delete_directory`](crate::SftpClient::delete_directory).
    pub fn delete_directory(
        &mut self,
        remote_path: &str,
        observer: Option<&dyn DeleteObserver>,
    ) -> Result<()> {
        let bridge = observer.map(SyncDelete);
        self.runtime.block_on(self.inner.delete_directory(
            remote_path,
            bridge.as_ref().map(|b| b as &dyn progress::DeleteObserver),
        ))
    }

    /// Delete several remote directory trees, one after the other.
    pub fn delete_directories<I, S>(
        &mut self,
        remote_paths: I,
        observer: Option<&dyn DeleteObserver>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in remote_paths {
            self.delete_directory(path.as_ref(), observer)?;
        }
        Ok(())
    }
}

impl Drop for SftpClient {
    fn drop(&mut self) {
        if self.inner.is_connected() {
            if let Err(e) = self.runtime.block_on(self.inner.disconnect()) {
                warn!("Disconnect on drop failed: {}", e);
            }
        }
    }
}
