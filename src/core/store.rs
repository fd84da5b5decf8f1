//! Plain-text store for the sent-items record.
//!
//! The file holds one identifier per line, `\n`-separated, with no header
//! and no trailing newline. It is read once at startup and fully replaced
//! at the end of every cycle (write to a sibling temp file, then rename).

use std::ffi::OsString;
use std::fs::OpenOptions as StdOpenOptions;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::identity::normalize;

/// Errors that can occur reading or writing the record
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to load sent record from {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist sent record to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open lock file {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {} is in use by another relay process", path.display())]
    Locked { path: PathBuf },
}

/// Membership test on normalized identifiers.
///
/// Both sides are whitespace-trimmed, then compared for exact equality.
pub fn contains(identifiers: &[String], candidate: &str) -> bool {
    let candidate = candidate.trim();
    identifiers.iter().any(|sent| sent.trim() == candidate)
}

/// Ordered, append-only record of delivered item identities.
///
/// Owned by the relay loop and lent to each cycle by `&mut`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentRecord {
    identifiers: Vec<String>,
}

impl SentRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing identifier list
    pub fn from_identifiers(identifiers: Vec<String>) -> Self {
        Self { identifiers }
    }

    /// Whether `identity` has already been delivered
    pub fn contains(&self, identity: &str) -> bool {
        contains(&self.identifiers, identity)
    }

    /// Record a successful delivery
    pub fn push(&mut self, identity: impl Into<String>) {
        self.identifiers.push(identity.into());
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.identifiers
    }
}

/// Split file content into normalized identifiers.
///
/// Each line is trimmed and blank lines are dropped, so files holding raw
/// untrimmed titles load into the same form `serialize_record` writes.
pub fn parse_record(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(normalize)
        .filter(|id| !id.is_empty())
        .collect()
}

/// Join identifiers one per line, without a trailing newline.
///
/// Identifiers are normalized first so an embedded line break can never
/// split one entry into two, and blank entries are skipped.
pub fn serialize_record(identifiers: &[String]) -> String {
    identifiers
        .iter()
        .map(|id| normalize(id))
        .filter(|id| !id.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stateless read/write gateway to the record file
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    /// Create a store backed by `path` (used for both load and persist)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record from disk
    pub async fn load(&self) -> Result<SentRecord, StoreError> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::Load {
                path: self.path.clone(),
                source,
            })?;

        Ok(SentRecord::from_identifiers(parse_record(&content)))
    }

    /// Read the record, falling back to an empty one on any error
    pub async fn load_or_empty(&self) -> SentRecord {
        match self.load().await {
            Ok(record) => {
                tracing::info!(
                    entries = record.len(),
                    path = %self.path.display(),
                    "Loaded sent record"
                );
                record
            }
            Err(e) => {
                tracing::warn!("{}; starting with an empty record", e);
                SentRecord::new()
            }
        }
    }

    /// Replace the file content with the full record
    pub async fn persist(&self, record: &SentRecord) -> Result<(), StoreError> {
        let err = |source: std::io::Error| StoreError::Persist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(err)?;
        }

        let tmp_path = sibling_path(&self.path, ".tmp");
        let data = serialize_record(record.as_slice());

        if let Err(source) = write_and_replace(&tmp_path, &self.path, data.as_bytes()).await {
            if let Err(e) = fs::remove_file(&tmp_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %tmp_path.display(), "Could not remove temp file: {}", e);
                }
            }
            return Err(err(source));
        }

        tracing::debug!(entries = record.len(), path = %self.path.display(), "Persisted sent record");
        Ok(())
    }
}

async fn write_and_replace(tmp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(tmp_path, path).await
}

/// Exclusive advisory lock guarding a record file against a second writer.
///
/// The lock is released when this value is dropped.
#[derive(Debug)]
pub struct StateLock {
    _file: std::fs::File,
}

impl StateLock {
    /// Take the lock for `state_path` (lock file: `<state_path>.lock`)
    pub fn acquire(state_path: &Path) -> Result<Self, StoreError> {
        let path = sibling_path(state_path, ".lock");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Lock {
                path: path.clone(),
                source,
            })?;
        }

        let file = StdOpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| StoreError::Lock {
                path: path.clone(),
                source,
            })?;

        file.try_lock_exclusive()
            .map_err(|_| StoreError::Locked {
                path: state_path.to_path_buf(),
            })?;

        tracing::debug!(path = %path.display(), "Acquired state lock");
        Ok(Self { _file: file })
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_contains_trims_both_sides() {
        let ids = vec!["A ".to_string(), "B".to_string()];
        assert!(contains(&ids, "A"));
        assert!(contains(&ids, " B\t"));
        assert!(!contains(&ids, "a"));
        assert!(!contains(&ids, "C"));
    }

    #[test]
    fn test_parse_drops_blank_entries() {
        assert_eq!(parse_record("A\nB\n\n"), vec!["A", "B"]);
        assert_eq!(parse_record("A\r\nB"), vec!["A", "B"]);
        assert_eq!(parse_record("A \n\n  B\n  "), vec!["A", "B"]);
        assert!(parse_record("").is_empty());
    }

    #[test]
    fn test_serialize_has_no_trailing_newline() {
        let ids = vec!["A".to_string(), "B".to_string()];
        assert_eq!(serialize_record(&ids), "A\nB");
    }

    #[test]
    fn test_serialize_flattens_line_breaks() {
        let ids = vec!["two\nlines".to_string()];
        assert_eq!(parse_record(&serialize_record(&ids)), vec!["two lines"]);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let store = IdentityStore::new(temp.path().join("missing.txt"));

        assert!(matches!(store.load().await, Err(StoreError::Load { .. })));
        assert!(store.load_or_empty().await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sent.txt");
        let store = IdentityStore::new(&path);

        store
            .persist(&SentRecord::from_identifiers(vec!["old".to_string()]))
            .await
            .unwrap();
        store
            .persist(&SentRecord::from_identifiers(vec![
                "A".to_string(),
                "B".to_string(),
            ]))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A\nB");
        assert!(!sibling_path(&path, ".tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_persist_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        // Renaming a file over a directory fails after the temp file is written
        let path = temp.path().join("sent.txt");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let store = IdentityStore::new(&path);
        let result = store
            .persist(&SentRecord::from_identifiers(vec!["A".to_string()]))
            .await;

        assert!(matches!(result, Err(StoreError::Persist { .. })));
        assert!(!sibling_path(&path, ".tmp").exists());
    }

    #[tokio::test]
    async fn test_persist_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let store = IdentityStore::new(temp.path().join("nested/dir/sent.txt"));

        store.persist(&SentRecord::new()).await.unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_state_lock_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().join("sent.txt");

        let first = StateLock::acquire(&state).unwrap();
        assert!(matches!(
            StateLock::acquire(&state),
            Err(StoreError::Locked { .. })
        ));

        drop(first);
        assert!(StateLock::acquire(&state).is_ok());
    }
}
