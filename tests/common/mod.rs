//! Shared test support: an in-memory `SessionOps` implementation.
//!
//! Listings include the `.` / `..` pseudo entries a real server reports and
//! an out-of-band total, so the traversal engine's filtering and
//! pass-through behavior are exercised for real.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use sftp_ferry::session::{RemoteReader, RemoteWriter, SessionOps};
use sftp_ferry::{DirListing, EntryKind, Error, RemoteEntry, Result, SftpConfig};

#[derive(Default)]
pub struct FakeState {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    /// Every remote-touching call, in order
    pub ops: Vec<String>,
    /// Path whose `open_write` fails, simulating a mid-traversal fault
    pub fail_open_write: Option<String>,
    /// Added to every reported listing total, simulating the transport
    /// reporting a count that disagrees with the materialized entries
    pub extra_total: usize,
}

impl FakeState {
    fn dir_entry(path: &str, name: &str) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::Directory,
            size: 0,
            modified: None,
        }
    }

    fn listing_of(&self, path: &str) -> Vec<RemoteEntry> {
        let prefix = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{}/", path)
        };

        let mut entries = vec![
            Self::dir_entry(&format!("{}.", prefix), "."),
            Self::dir_entry(&format!("{}..", prefix), ".."),
        ];

        for dir in &self.dirs {
            if let Some(rest) = dir.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    entries.push(Self::dir_entry(dir, rest));
                }
            }
        }

        for (file, bytes) in &self.files {
            if let Some(rest) = file.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    entries.push(RemoteEntry {
                        name: rest.to_string(),
                        path: file.clone(),
                        kind: EntryKind::File,
                        size: bytes.len() as u64,
                        modified: None,
                    });
                }
            }
        }

        entries
    }

    fn has_children(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.dirs.iter().any(|d| d.starts_with(&prefix))
            || self.files.keys().any(|f| f.starts_with(&prefix))
    }
}

pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    open: Arc<AtomicBool>,
}

struct FakeWriter {
    path: String,
    buf: Vec<u8>,
    state: Arc<Mutex<FakeState>>,
}

impl AsyncWrite for FakeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.get_mut().buf.extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let writer = self.get_mut();
        let mut state = writer.state.lock().unwrap();
        state
            .files
            .insert(writer.path.clone(), std::mem::take(&mut writer.buf));
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl SessionOps for FakeSession {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        self.state.lock().unwrap().ops.push("close".to_string());
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> Result<DirListing> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("readdir {}", path));

        if !state.dirs.contains(path) {
            return Err(Error::NotFound(path.to_string()));
        }

        let entries = state.listing_of(path);
        let total = entries.len() + state.extra_total;

        Ok(DirListing { entries, total })
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("stat {}", path));

        let name = path.rsplit('/').next().unwrap_or(path).to_string();

        if state.dirs.contains(path) {
            Ok(FakeState::dir_entry(path, &name))
        } else if let Some(bytes) = state.files.get(path) {
            Ok(RemoteEntry {
                name,
                path: path.to_string(),
                kind: EntryKind::File,
                size: bytes.len() as u64,
                modified: None,
            })
        } else {
            Err(Error::NotFound(path.to_string()))
        }
    }

    async fn open_read(&self, path: &str) -> Result<RemoteReader> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("open_read {}", path));

        match state.files.get(path) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(Error::NotFound(path.to_string())),
        }
    }

    async fn open_write(&self, path: &str, overwrite: bool) -> Result<RemoteWriter> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("open_write {}", path));

        if state.fail_open_write.as_deref() == Some(path) {
            return Err(Error::Protocol(format!("injected failure: {}", path)));
        }
        if !overwrite && state.files.contains_key(path) {
            return Err(Error::Protocol(format!("file exists: {}", path)));
        }

        Ok(Box::new(FakeWriter {
            path: path.to_string(),
            buf: Vec::new(),
            state: self.state.clone(),
        }))
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("rm {}", path));

        match state.files.remove(path) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(path.to_string())),
        }
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("rmdir {}", path));

        if !state.dirs.contains(path) {
            return Err(Error::NotFound(path.to_string()));
        }
        if state.has_children(path) {
            return Err(Error::Protocol(format!("directory not empty: {}", path)));
        }

        state.dirs.remove(path);
        Ok(())
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("mkdir {}", path));

        if state.dirs.contains(path) {
            return Err(Error::Protocol(format!("directory exists: {}", path)));
        }

        state.dirs.insert(path.to_string());
        Ok(())
    }
}

/// A fake session over a fresh in-memory filesystem containing `/`.
pub fn fake_session() -> (Box<dyn SessionOps>, Arc<Mutex<FakeState>>) {
    let state = Arc::new(Mutex::new(FakeState::default()));
    state.lock().unwrap().dirs.insert("/".to_string());

    let session = FakeSession {
        state: state.clone(),
        open: Arc::new(AtomicBool::new(true)),
    };

    (Box::new(session), state)
}

pub fn fake_config() -> SftpConfig {
    SftpConfig::password("test.invalid", "tester", "secret")
}

pub fn seed_dir(state: &Arc<Mutex<FakeState>>, path: &str) {
    state.lock().unwrap().dirs.insert(path.to_string());
}

pub fn seed_file(state: &Arc<Mutex<FakeState>>, path: &str, bytes: &[u8]) {
    state
        .lock()
        .unwrap()
        .files
        .insert(path.to_string(), bytes.to_vec());
}

pub fn recorded_ops(state: &Arc<Mutex<FakeState>>) -> Vec<String> {
    state.lock().unwrap().ops.clone()
}
