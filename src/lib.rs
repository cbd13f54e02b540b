//! sftp-ferry - recursive directory transfer over SFTP
//!
//! A convenience layer on top of an SFTP session: recursive upload,
//! download, and delete of whole directory trees, existence checks, and
//! per-item progress observers. The transport rides on `russh` +
//! `russh-sftp`.
//!
//! The traversal engine is written once, asynchronously; [`SftpClient`] is
//! the async client and [`blocking::SftpClient`] drives the same engine
//! from blocking code.
//!
//! ```no_run
//! use sftp_ferry::{SftpClient, SftpConfig};
//!
//! # async fn run() -> sftp_ferry::Result<()> {
//! let config = SftpConfig::password("sftp.example.com", "deploy", "hunter2");
//! let mut client = SftpClient::new(config);
//!
//! client
//!     .upload_directory("./site", "/var/www/site", true, None)
//!     .await?;
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod path;
pub mod progress;
pub mod session;
pub mod types;

pub use client::SftpClient;
pub use config::SftpConfig;
pub use error::{Error, Result};
pub use progress::{DeleteObserver, DownloadObserver, ListingObserver, UploadObserver};
pub use session::{RusshSession, SessionOps};
pub use types::{DirListing, EntryKind, LocalEntry, RemoteEntry};
