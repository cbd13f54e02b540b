//! Asynchronous SFTP client
//!
//! Owns one session, establishes it lazily, and layers directory-aware
//! operations (recursive upload, download, delete, existence checks) on
//! top of the single-entry operations the session exposes.

use std::path::Path;

use futures_util::future::try_join_all;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info};

use crate::config::SftpConfig;
use crate::error::{Error, Result};
use crate::path::{is_blank, join_local_path, join_remote_path};
use crate::progress::{DeleteObserver, DownloadObserver, ListingObserver, UploadObserver};
use crate::session::{RusshSession, SessionOps};
use crate::types::{DirListing, EntryKind, LocalEntry};

/// Path tokens `make_directory` ignores instead of creating.
///
/// Callers deliberately pass root-like tokens expecting a no-op; this must
/// never become an error.
const RESERVED_DIRECTORIES: [&str; 5] = [".", "..", "/", "\\", ""];

/// Asynchronous SFTP client with recursive directory operations.
///
/// The client owns its session exclusively. Operations that need the remote
/// side connect lazily, so an explicit [`connect`](Self::connect) call is
/// optional. Call [`disconnect`](Self::disconnect) to release the transport
/// deterministically; dropping the client tears it down as well.
pub struct SftpClient {
    config: SftpConfig,
    session: Option<Box<dyn SessionOps>>,
}

impl SftpClient {
    /// Create a client from a configuration. No IO happens here.
    pub fn new(config: SftpConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Create a client around an externally built session.
    ///
    /// Injected sessions bypass credential validation; the configuration is
    /// only consulted if the session closes and has to be rebuilt.
    pub fn with_session(config: SftpConfig, session: Box<dyn SessionOps>) -> Self {
        Self {
            config,
            session: Some(session),
        }
    }

    /// Whether the held session exists and its transport is open.
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_open())
    }

    /// Establish the connection.
    ///
    /// Idempotent: an already-open session is left untouched. A missing or
    /// closed session is (re)built from the configuration, which fails with
    /// [`Error::Config`] when neither a password nor a private key is
    /// present.
    pub async fn connect(&mut self) -> Result<&mut Self> {
        if self.is_connected() {
            return Ok(self);
        }

        self.config.validate()?;
        let session = RusshSession::open(&self.config).await?;
        self.session = Some(Box::new(session));

        Ok(self)
    }

    /// Replace the configuration, then connect.
    ///
    /// The replacement itself never triggers auto-connect logic; the
    /// explicit connect that follows is the whole point of the call.
    pub async fn connect_with(&mut self, config: SftpConfig) -> Result<&mut Self> {
        self.config = config;
        self.connect().await
    }

    /// Replace the configuration, connecting immediately when its
    /// `auto_connect` flag is set.
    pub async fn apply_config(&mut self, config: SftpConfig) -> Result<&mut Self> {
        let auto_connect = config.auto_connect;
        self.config = config;

        if auto_connect {
            self.connect().await?;
        }

        Ok(self)
    }

    /// Close and release the session. Safe to call when no session was
    /// ever created.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            session.close().await?;
            info!("SFTP session disconnected");
        }
        Ok(())
    }

    /// Guard run by every operation that needs the remote side.
    async fn ensure_connected(&mut self) -> Result<()> {
        if !self.is_connected() {
            self.connect().await?;
        }
        Ok(())
    }

    fn session(&self) -> Result<&dyn SessionOps> {
        self.session
            .as_deref()
            .ok_or(Error::Disconnected)
    }

    // ── Single-item operations ──────────────────────────────────────────

    /// List one remote directory level.
    pub async fn list_directory(&mut self, path: &str) -> Result<DirListing> {
        self.list_directory_with(path, None).await
    }

    /// List one remote directory level, handing the listing and its
    /// transport-reported total to `observer`.
    pub async fn list_directory_with(
        &mut self,
        path: &str,
        observer: Option<&dyn ListingObserver>,
    ) -> Result<DirListing> {
        self.ensure_connected().await?;

        let listing = self.session()?.read_dir(path).await?;

        if let Some(observer) = observer {
            observer.directory_listed(&listing).await?;
        }

        Ok(listing)
    }

    /// Download one remote file to `local_path`.
    ///
    /// Bytes stream through a local file handle that is flushed and
    /// released on completion and failure alike.
    pub async fn download_file(
        &mut self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
    ) -> Result<()> {
        self.ensure_connected().await?;
        self.download_file_inner(remote_path, local_path.as_ref())
            .await
    }

    /// Upload one local file to `remote_path`.
    ///
    /// The overwrite flag is delegated to the protocol (`TRUNCATE` vs
    /// `EXCLUDE` open); no client-side existence pre-check is made.
    pub async fn upload_file(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
        overwrite: bool,
    ) -> Result<()> {
        self.ensure_connected().await?;
        self.upload_file_inner(local_path.as_ref(), remote_path, overwrite)
            .await
    }

    /// Upload from an already-open reader to `remote_path`.
    pub async fn upload_from_reader<R>(
        &mut self,
        reader: &mut R,
        remote_path: &str,
        overwrite: bool,
    ) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + ?Sized,
    {
        self.ensure_connected().await?;

        let mut writer = self.session()?.open_write(remote_path, overwrite).await?;
        tokio::io::copy(reader, &mut writer).await?;
        writer.shutdown().await?;

        Ok(())
    }

    /// Delete one remote file. Absence or missing permission is a protocol
    /// error; no pre-check is made.
    pub async fn delete_file(&mut self, remote_path: &str) -> Result<()> {
        self.ensure_connected().await?;
        self.session()?.remove_file(remote_path).await
    }

    /// Delete several remote files, in order.
    pub async fn delete_files<I, S>(&mut self, remote_paths: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in remote_paths {
            self.delete_file(path.as_ref()).await?;
        }
        Ok(())
    }

    /// Create one remote directory if it does not already exist.
    ///
    /// Reserved tokens (`.`, `..`, `/`, `\`, the empty string) are silently
    /// ignored: no directory is created and no error is raised.
    pub async fn make_directory(&mut self, remote_path: &str) -> Result<()> {
        if RESERVED_DIRECTORIES.contains(&remote_path) {
            return Ok(());
        }

        self.ensure_connected().await?;
        self.make_directory_inner(remote_path).await
    }

    /// Whether a remote file exists at `remote_path`.
    ///
    /// Any failure of the underlying metadata call, not only "no such
    /// file", is read as absence.
    pub async fn file_exists(&mut self, remote_path: &str) -> Result<bool> {
        self.ensure_connected().await?;

        Ok(match self.session()?.stat(remote_path).await {
            Ok(entry) => !entry.is_dir(),
            Err(_) => false,
        })
    }

    /// Whether a remote directory exists at `remote_path`. Failure is read
    /// as absence, like [`file_exists`](Self::file_exists).
    pub async fn directory_exists(&mut self, remote_path: &str) -> Result<bool> {
        self.ensure_connected().await?;
        Ok(self.directory_exists_inner(remote_path).await)
    }

    // ── Recursive tree operations ───────────────────────────────────────

    /// Recursively download the remote directory `remote_path` into the
    /// local directory `local_path`, creating it if absent.
    ///
    /// `observer` is notified once per transferred item; a directory's
    /// notification follows those of its contents. Entries arrive in
    /// listing order. The first failure aborts the remainder of the
    /// traversal; already-transferred items stay in place.
    pub async fn download_directory(
        &mut self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
        observer: Option<&dyn DownloadObserver>,
    ) -> Result<()> {
        let local_path = local_path.as_ref();

        if is_blank(remote_path) {
            return Err(Error::InvalidArgument(
                "remote directory path is required".to_string(),
            ));
        }
        if is_blank(&local_path.to_string_lossy()) {
            return Err(Error::InvalidArgument(
                "local directory path is required".to_string(),
            ));
        }

        self.ensure_connected().await?;
        info!(
            "Downloading directory {} to {}",
            remote_path,
            local_path.display()
        );

        fs::create_dir_all(local_path).await?;
        self.download_directory_inner(remote_path, local_path, observer)
            .await?;

        debug!("Download directory complete: {}", remote_path);
        Ok(())
    }

    /// Recursively upload the local directory `local_path` to the remote
    /// directory `remote_path`, creating remote directories as needed.
    ///
    /// Sibling sub-directories are uploaded in lexicographic full-path
    /// order before sibling files, also lexicographic, so the transfer
    /// log is reproducible. `observer` is notified once per transferred item,
    /// directories after their contents.
    pub async fn upload_directory(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
        overwrite: bool,
        observer: Option<&dyn UploadObserver>,
    ) -> Result<()> {
        let local_path = local_path.as_ref();

        if is_blank(&local_path.to_string_lossy()) {
            return Err(Error::InvalidArgument(
                "local directory path is required".to_string(),
            ));
        }
        if is_blank(remote_path) {
            return Err(Error::InvalidArgument(
                "remote directory path is required".to_string(),
            ));
        }

        self.ensure_connected().await?;

        let metadata = fs::metadata(local_path).await?;
        if !metadata.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "upload source must be a directory: {}",
                local_path.display()
            )));
        }

        info!(
            "Uploading directory {} to {}",
            local_path.display(),
            remote_path
        );

        self.upload_directory_inner(local_path, remote_path, overwrite, observer)
            .await?;

        debug!("Upload directory complete: {}", remote_path);
        Ok(())
    }

    /// Recursively delete the remote directory `remote_path` and all of
    /// its contents.
    ///
    /// `observer` is notified once per removed item plus once for the root
    /// itself, every child's notification preceding its parent's.
    pub async fn delete_directory(
        &mut self,
        remote_path: &str,
        observer: Option<&dyn DeleteObserver>,
    ) -> Result<()> {
        if is_blank(remote_path) {
            return Err(Error::InvalidArgument(
                "remote directory path is required".to_string(),
            ));
        }

        self.ensure_connected().await?;
        info!("Recursively deleting {}", remote_path);

        self.delete_directory_rooted(remote_path, observer).await
    }

    /// Delete several remote directory trees.
    ///
    /// The per-target traversals run concurrently with no ordering between
    /// targets; within each target the ordering guarantees of
    /// [`delete_directory`](Self::delete_directory) hold.
    pub async fn delete_directories<I, S>(
        &mut self,
        remote_paths: I,
        observer: Option<&dyn DeleteObserver>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths: Vec<String> = remote_paths
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();

        for path in &paths {
            if is_blank(path) {
                return Err(Error::InvalidArgument(
                    "remote directory path is required".to_string(),
                ));
            }
        }

        self.ensure_connected().await?;

        // Independent targets run concurrently; ordering within each
        // target stays sequential.
        let this = &*self;
        try_join_all(
            paths
                .iter()
                .map(|path| this.delete_directory_rooted(path, observer)),
        )
        .await?;

        Ok(())
    }

    // ── Traversal engine ────────────────────────────────────────────────

    async fn download_file_inner(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        debug!("Downloading {} to {}", remote_path, local_path.display());

        let mut reader = self.session()?.open_read(remote_path).await?;
        let mut file = fs::File::create(local_path).await?;

        tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        Ok(())
    }

    async fn upload_file_inner(
        &self,
        local_path: &Path,
        remote_path: &str,
        overwrite: bool,
    ) -> Result<()> {
        debug!("Uploading {} to {}", local_path.display(), remote_path);

        let mut file = fs::File::open(local_path).await?;
        let mut writer = self.session()?.open_write(remote_path, overwrite).await?;

        tokio::io::copy(&mut file, &mut writer).await?;
        writer.shutdown().await?;

        Ok(())
    }

    async fn directory_exists_inner(&self, remote_path: &str) -> bool {
        match self.session() {
            Ok(session) => matches!(session.stat(remote_path).await, Ok(entry) if entry.is_dir()),
            Err(_) => false,
        }
    }

    async fn make_directory_inner(&self, remote_path: &str) -> Result<()> {
        if RESERVED_DIRECTORIES.contains(&remote_path) {
            return Ok(());
        }

        if !self.directory_exists_inner(remote_path).await {
            debug!("Creating directory: {}", remote_path);
            self.session()?.create_dir(remote_path).await?;
        }

        Ok(())
    }

    async fn download_directory_inner(
        &self,
        remote_path: &str,
        local_path: &Path,
        observer: Option<&dyn DownloadObserver>,
    ) -> Result<()> {
        let listing = self.session()?.read_dir(remote_path).await?;

        for entry in listing.entries.iter().filter(|e| !e.is_pseudo()) {
            let local_entry_path = join_local_path(local_path, &entry.name);

            if entry.is_dir() {
                fs::create_dir_all(&local_entry_path).await?;

                // Boxed to keep the recursive future finite
                Box::pin(self.download_directory_inner(&entry.path, &local_entry_path, observer))
                    .await?;
            } else {
                self.download_file_inner(&entry.path, &local_entry_path)
                    .await?;
            }

            if let Some(observer) = observer {
                observer
                    .item_downloaded(entry, &local_entry_path, &entry.path)
                    .await?;
            }
        }

        Ok(())
    }

    async fn upload_directory_inner(
        &self,
        local_path: &Path,
        remote_path: &str,
        overwrite: bool,
        observer: Option<&dyn UploadObserver>,
    ) -> Result<()> {
        self.make_directory_inner(remote_path).await?;

        let mut directories = Vec::new();
        let mut files = Vec::new();

        let mut read_dir = fs::read_dir(local_path).await?;
        while let Some(dirent) = read_dir.next_entry().await? {
            let metadata = dirent.metadata().await?;
            let entry = LocalEntry {
                name: dirent.file_name().to_string_lossy().to_string(),
                path: dirent.path(),
                kind: if metadata.is_dir() {
                    EntryKind::Directory
                } else if metadata.file_type().is_symlink() {
                    EntryKind::Symlink
                } else {
                    EntryKind::File
                },
                size: metadata.len(),
            };

            if entry.is_dir() {
                directories.push(entry);
            } else {
                files.push(entry);
            }
        }

        // Sub-directories first, each group lexicographic by full path
        directories.sort_by(|a, b| a.path.cmp(&b.path));
        files.sort_by(|a, b| a.path.cmp(&b.path));

        for dir in &directories {
            let remote_sub = join_remote_path(remote_path, &dir.name);

            Box::pin(self.upload_directory_inner(&dir.path, &remote_sub, overwrite, observer))
                .await?;

            if let Some(observer) = observer {
                observer.item_uploaded(dir, &dir.path, &remote_sub).await?;
            }
        }

        for file in &files {
            let remote_file = join_remote_path(remote_path, &file.name);

            self.upload_file_inner(&file.path, &remote_file, overwrite)
                .await?;

            if let Some(observer) = observer {
                observer
                    .item_uploaded(file, &file.path, &remote_file)
                    .await?;
            }
        }

        Ok(())
    }

    /// Delete one tree and fire the root's own notification last.
    async fn delete_directory_rooted(
        &self,
        remote_path: &str,
        observer: Option<&dyn DeleteObserver>,
    ) -> Result<()> {
        let root = self.session()?.stat(remote_path).await?;

        self.delete_directory_inner(remote_path, observer).await?;

        if let Some(observer) = observer {
            observer.item_deleted(&root, remote_path).await?;
        }

        Ok(())
    }

    /// Delete the contents of `remote_path`, then the directory itself.
    /// Notifications for `remote_path` itself are the caller's job.
    async fn delete_directory_inner(
        &self,
        remote_path: &str,
        observer: Option<&dyn DeleteObserver>,
    ) -> Result<()> {
        let listing = self.session()?.read_dir(remote_path).await?;

        for entry in listing.entries.iter().filter(|e| !e.is_pseudo()) {
            if entry.is_dir() {
                Box::pin(self.delete_directory_inner(&entry.path, observer)).await?;
            } else {
                self.session()?.remove_file(&entry.path).await?;
            }

            if let Some(observer) = observer {
                observer.item_deleted(entry, &entry.path).await?;
            }
        }

        self.session()?.remove_dir(remote_path).await
    }
}
