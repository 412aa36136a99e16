//! Document persistence.
//!
//! Documents are kept as one pretty-printed JSON file each. Phase operations
//! must not run concurrently against the same document. Separate processes
//! coordinate through a `<id>.lock` file from [`FileDocumentStore::lock`];
//! tasks inside one process can share a [`DocumentLocks`].

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::core::error::{ArchitectError, Result};
use crate::workflow::DesignDocument;

/// Storage hooks for design documents.
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a document.
    fn save(&self, document: &DesignDocument) -> Result<()>;

    /// Load a document by id, `None` if it does not exist.
    fn load(&self, id: &str) -> Result<Option<DesignDocument>>;

    /// All documents owned by a user, most recently updated first.
    fn list_by_user(&self, user_id: &str) -> Result<Vec<DesignDocument>>;

    /// Remove a document. Returns whether it existed.
    fn delete(&self, id: &str) -> Result<bool>;
}

/// How long [`FileDocumentStore::lock`] waits for another holder.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(10);

/// Lock files untouched for this long belong to a process that died.
pub const DEFAULT_STALE_LOCK_AGE: Duration = Duration::from_secs(30 * 60);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// JSON-file-per-document store.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
    lock_wait: Duration,
    stale_lock_age: Duration,
}

impl FileDocumentStore {
    /// Create a store rooted at `<data_dir>/documents`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().join("documents"),
            lock_wait: DEFAULT_LOCK_WAIT,
            stale_lock_age: DEFAULT_STALE_LOCK_AGE,
        }
    }

    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn with_stale_lock_age(mut self, age: Duration) -> Self {
        self.stale_lock_age = age;
        self
    }

    /// Directory holding the document files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(format!("{id}.json")))
    }

    fn lock_path(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(format!("{id}.lock")))
    }

    /// Take the document's lock file without waiting.
    ///
    /// Returns `None` while another holder has it. A stale lock file is
    /// removed and the acquisition retried once.
    pub fn try_lock(&self, id: &str) -> Result<Option<DocumentFileLock>> {
        let path = self.lock_path(id)?;
        fs::create_dir_all(&self.root)?;

        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        let _ = fs::remove_file(&path);
                        return Err(e.into());
                    }
                    tracing::debug!(document_id = %id, path = %path.display(), "document locked");
                    return Ok(Some(DocumentFileLock { path }));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if !self.is_stale(&path) {
                        return Ok(None);
                    }
                    tracing::warn!(document_id = %id, path = %path.display(), "removing stale document lock");
                    remove_if_exists(&path)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    /// Wait up to the configured lock wait for the document's lock file.
    pub async fn lock(&self, id: &str) -> Result<DocumentFileLock> {
        let started = Instant::now();
        loop {
            if let Some(lock) = self.try_lock(id)? {
                return Ok(lock);
            }
            if started.elapsed() >= self.lock_wait {
                return Err(locked(id, self.lock_wait));
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    fn is_stale(&self, path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > self.stale_lock_age)
    }

    fn read(path: &Path) -> Result<DesignDocument> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            ArchitectError::from(e).with_meta("path", path.display().to_string())
        })
    }
}

impl DocumentStore for FileDocumentStore {
    fn save(&self, document: &DesignDocument) -> Result<()> {
        let path = self.path_for(&document.id)?;
        fs::create_dir_all(&self.root)?;

        let content = serde_json::to_string_pretty(document)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(document_id = %document.id, path = %path.display(), "saved document");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<DesignDocument>> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn list_by_user(&self, user_id: &str) -> Result<Vec<DesignDocument>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(doc) if doc.user_id == user_id => documents.push(doc),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document");
                }
            }
        }

        documents.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(documents)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }
}

/// Exclusive hold on a document across processes.
///
/// The lock file is removed on drop.
#[derive(Debug)]
pub struct DocumentFileLock {
    path: PathBuf,
}

impl DocumentFileLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bump the lock file's mtime so long runs are not taken for stale.
    pub fn refresh(&self) -> Result<()> {
        OpenOptions::new().write(true).open(&self.path)?.set_modified(SystemTime::now())?;
        Ok(())
    }
}

impl Drop for DocumentFileLock {
    fn drop(&mut self) {
        if let Err(e) = remove_if_exists(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release document lock");
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn locked(id: &str, waited: Duration) -> ArchitectError {
    ArchitectError::persistence(format!("Document {id} is locked by another process"))
        .with_meta("documentId", id)
        .with_meta("waitedMs", waited.as_millis() as u64)
}

/// Reject ids that could escape the store directory.
fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ArchitectError::validation(format!("Invalid document id: '{id}'"))
            .with_meta("documentId", id))
    }
}

/// One async mutex per document id, for tasks sharing a process.
#[derive(Debug, Default, Clone)]
pub struct DocumentLocks {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a document.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop entries nobody is holding or waiting on.
    pub fn prune(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
