//! Per-item progress observers
//!
//! Each recursive operation accepts an optional observer that is awaited
//! after every item before the traversal proceeds. Returning an error from
//! an observer aborts the remainder of the traversal exactly like a
//! transport failure; passing `None` skips the notification but never the
//! underlying operation.
//!
//! Directory notifications fire after the directory's contents are fully
//! processed (children before parent). Observers take `&self` so one value
//! can watch several concurrent targets; use interior mutability to
//! accumulate state.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DirListing, LocalEntry, RemoteEntry};

/// Observer for recursive downloads, notified per transferred item.
#[async_trait]
pub trait DownloadObserver: Send + Sync {
    async fn item_downloaded(
        &self,
        entry: &RemoteEntry,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()>;
}

/// Observer for recursive uploads, notified per transferred item.
#[async_trait]
pub trait UploadObserver: Send + Sync {
    async fn item_uploaded(
        &self,
        entry: &LocalEntry,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()>;
}

/// Observer for recursive deletes, notified per removed item.
#[async_trait]
pub trait DeleteObserver: Send + Sync {
    async fn item_deleted(&self, entry: &RemoteEntry, remote_path: &str) -> Result<()>;
}

/// Observer for directory listings, handed the listing and the
/// transport-reported total.
#[async_trait]
pub trait ListingObserver: Send + Sync {
    async fn directory_listed(&self, listing: &DirListing) -> Result<()>;
}
