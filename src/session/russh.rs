//! russh-backed session
//!
//! Establishes the SSH transport, authenticates, opens the `sftp`
//! subsystem, and exposes it through [`SessionOps`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::PublicKey;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{OpenFlags, StatusCode};
use tracing::{debug, info, warn};

use super::{RemoteReader, RemoteWriter, SessionOps};
use crate::config::SftpConfig;
use crate::error::{Error, Result};
use crate::path::join_remote_path;
use crate::types::{DirListing, EntryKind, RemoteEntry};

/// Connection timeout for the SSH handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client handler for russh callbacks.
///
/// Server keys are accepted as presented; host-key policy belongs to the
/// deployment environment, not this layer.
struct ClientHandler;

impl client::Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

/// One authenticated SSH connection with an open SFTP subsystem.
///
/// Exclusively owned by the client that built it; dropping it tears the
/// transport down.
pub struct RusshSession {
    sftp: SftpSession,
    // Keeps the transport alive; the SFTP channel dies with it.
    handle: client::Handle<ClientHandler>,
}

impl RusshSession {
    /// Connect and authenticate per `config`, then open the SFTP
    /// subsystem.
    pub async fn open(config: &SftpConfig) -> Result<Self> {
        let addr = (config.host.as_str(), config.port);
        info!("Connecting to SFTP server at {}:{}", config.host, config.port);

        let ssh_config = Arc::new(client::Config::default());

        let mut handle = tokio::time::timeout(
            CONNECT_TIMEOUT,
            client::connect(ssh_config, addr, ClientHandler),
        )
        .await
        .map_err(|_| Error::ConnectionFailed("connection timed out".to_string()))?
        .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

        debug!("SSH handshake completed");

        // Private key wins when both credentials are present, matching the
        // configuration contract.
        let authenticated = if let Some(key_path) = &config.private_key_path {
            let key = russh::keys::load_secret_key(
                key_path,
                config.private_key_passphrase.as_deref(),
            )
            .map_err(|e| Error::Key(e.to_string()))?;

            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .map_err(|e| Error::AuthenticationFailed(e.to_string()))?
                .flatten();

            handle
                .authenticate_publickey(
                    &config.username,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await
                .map_err(|e| Error::AuthenticationFailed(e.to_string()))?
        } else {
            let password = config.password.as_deref().unwrap_or_default();
            handle
                .authenticate_password(&config.username, password)
                .await
                .map_err(|e| Error::AuthenticationFailed(e.to_string()))?
        };

        if !authenticated.success() {
            return Err(Error::AuthenticationFailed(
                "authentication rejected by server".to_string(),
            ));
        }

        info!("SSH authentication successful for {}", config.username);

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::Protocol(e.to_string()))?;

        debug!("SFTP subsystem opened");

        Ok(Self { sftp, handle })
    }
}

#[async_trait]
impl SessionOps for RusshSession {
    fn is_open(&self) -> bool {
        !self.handle.is_closed()
    }

    async fn close(&mut self) -> Result<()> {
        if self.handle.is_closed() {
            return Ok(());
        }

        if let Err(e) = self.sftp.close().await {
            warn!("SFTP channel close failed: {}", e);
        }

        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| Error::Protocol(e.to_string()))
    }

    async fn read_dir(&self, path: &str) -> Result<DirListing> {
        debug!("Listing directory: {}", path);

        let read_dir = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let name = entry.file_name();
            let metadata = entry.metadata();

            entries.push(RemoteEntry {
                path: join_remote_path(path, &name),
                kind: kind_of(&metadata),
                size: metadata.size.unwrap_or(0),
                modified: metadata.mtime.map(i64::from),
                name,
            });
        }

        // The transport reports no separate count, so the total is the
        // number of entries it yielded for this listing.
        let total = entries.len();

        Ok(DirListing { entries, total })
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        let metadata = self
            .sftp
            .metadata(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(RemoteEntry {
            name,
            path: path.to_string(),
            kind: kind_of(&metadata),
            size: metadata.size.unwrap_or(0),
            modified: metadata.mtime.map(i64::from),
        })
    }

    async fn open_read(&self, path: &str) -> Result<RemoteReader> {
        let file = self
            .sftp
            .open(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        Ok(Box::new(file))
    }

    async fn open_write(&self, path: &str, overwrite: bool) -> Result<RemoteWriter> {
        let flags = if overwrite {
            OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE
        } else {
            OpenFlags::CREATE | OpenFlags::EXCLUDE | OpenFlags::WRITE
        };

        let file = self
            .sftp
            .open_with_flags(path, flags)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        Ok(Box::new(file))
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        self.sftp
            .remove_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.sftp
            .create_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }
}

fn kind_of(metadata: &russh_sftp::client::fs::Metadata) -> EntryKind {
    if metadata.is_dir() {
        EntryKind::Directory
    } else if metadata.is_symlink() {
        EntryKind::Symlink
    } else if metadata.is_regular() {
        EntryKind::File
    } else {
        EntryKind::Unknown
    }
}

/// Map SFTP status codes to crate errors, keeping the offending path.
fn map_sftp_error(err: SftpErrorInner, path: &str) -> Error {
    if let SftpErrorInner::Status(status) = &err {
        match status.status_code {
            StatusCode::NoSuchFile => return Error::NotFound(path.to_string()),
            StatusCode::PermissionDenied => return Error::PermissionDenied(path.to_string()),
            _ => {}
        }
    }

    Error::Protocol(err.to_string())
}
