//! Session layer
//!
//! [`SessionOps`] is the shape this crate requires of the underlying SFTP
//! session: single-entry protocol operations only, no tree logic. The
//! default implementation rides on `russh` + `russh-sftp`
//! ([`RusshSession`]); callers owning their own transport can implement the
//! trait and inject it with
//! [`SftpClient::with_session`](crate::SftpClient::with_session).

mod russh;

pub use self::russh::RusshSession;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::types::{DirListing, RemoteEntry};

/// Streamed handle for reading one remote file.
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Streamed handle for writing one remote file.
///
/// The writer must be shut down to complete the transfer.
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Single-entry operations an SFTP session must expose.
///
/// Implementations report the listing `total` out-of-band from the entry
/// sequence and must not reconcile the two.
#[async_trait]
pub trait SessionOps: Send + Sync {
    /// Whether the underlying transport is still open.
    fn is_open(&self) -> bool;

    /// Close the underlying transport. Idempotent.
    async fn close(&mut self) -> Result<()>;

    /// List one directory level. Fails if the path is absent or
    /// inaccessible.
    async fn read_dir(&self, path: &str) -> Result<DirListing>;

    /// Metadata for one remote path, as a listing-shaped entry.
    async fn stat(&self, path: &str) -> Result<RemoteEntry>;

    /// Open one remote file for reading.
    async fn open_read(&self, path: &str) -> Result<RemoteReader>;

    /// Open one remote file for writing, creating it. With `overwrite` an
    /// existing file is truncated; without it the protocol rejects the
    /// open.
    async fn open_write(&self, path: &str, overwrite: bool) -> Result<RemoteWriter>;

    /// Delete one remote file. No existence pre-check; absence is a
    /// protocol error.
    async fn remove_file(&self, path: &str) -> Result<()>;

    /// Delete one empty remote directory.
    async fn remove_dir(&self, path: &str) -> Result<()>;

    /// Create one remote directory.
    async fn create_dir(&self, path: &str) -> Result<()>;
}
