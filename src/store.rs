//! Flat file storage rooted at a single directory.
//!
//! Every stored file is a direct child of the storage root and is addressed
//! only by its filename. All path construction goes through
//! [`FileStore::validate_filename`], which is the single place where
//! traversal attempts are rejected.

use serde::Serialize;
use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{self, AtomicU64};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// Storage root plus the cumulative store counter.
///
/// One instance is created at startup and shared with handlers as
/// `Arc<FileStore>`; tests build their own instance over a temp directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    files_stored: AtomicU64,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            files_stored: AtomicU64::new(0),
        }
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Number of successful store operations since this instance was created.
    pub fn files_stored_total(&self) -> u64 {
        self.files_stored.load(atomic::Ordering::Relaxed)
    }

    /// Accepts a filename only if it is exactly one normal path component.
    ///
    /// Separators of either flavour, NUL bytes, `.`/`..` and anything carrying
    /// a root or drive prefix are rejected without touching the filesystem.
    pub fn validate_filename(name: &str) -> Result<&str, StoreError> {
        if name.is_empty() || name.contains(['/', '\\', '\0']) {
            return Err(StoreError::InvalidFilename);
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) if segment == name => Ok(name),
            _ => Err(StoreError::InvalidFilename),
        }
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, StoreError> {
        let name = Self::validate_filename(filename)?;
        Ok(self.root.join(name))
    }

    /// Metadata of an existing entry without following links; `None` if absent.
    async fn leaf_metadata(&self, target: &Path) -> Result<Option<Metadata>, StoreError> {
        match fs::symlink_metadata(target).await {
            Ok(metadata) if metadata.file_type().is_symlink() => Err(StoreError::InvalidFilename),
            Ok(metadata) => Ok(Some(metadata)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Writes `content` to `filename`, replacing any previous content.
    pub async fn store(
        &self,
        filename: &str,
        content: &[u8],
    ) -> Result<StoredFileMetadata, StoreError> {
        let target = self.resolve(filename)?;
        if let Some(metadata) = self.leaf_metadata(&target).await?
            && !metadata.is_file()
        {
            return Err(StoreError::InvalidFilename);
        }

        fs::write(&target, content).await?;
        let total = self.files_stored.fetch_add(1, atomic::Ordering::Relaxed) + 1;
        debug!(filename, size = content.len(), total, "file written");

        Ok(StoredFileMetadata {
            filename: filename.to_string(),
            size: content.len() as u64,
        })
    }

    /// Lists regular files directly under the root.
    pub async fn list(&self) -> Result<FileListing, StoreError> {
        let files: Vec<String> = self
            .scan()
            .await?
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        let count = files.len();
        Ok(FileListing { files, count })
    }

    /// Reads the full content of `filename`.
    pub async fn retrieve(&self, filename: &str) -> Result<RetrievedFile, StoreError> {
        let target = self.resolve(filename)?;
        let metadata = self
            .leaf_metadata(&target)
            .await?
            .ok_or(StoreError::NotFound)?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound);
        }

        let content = match fs::read(&target).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(err) => return Err(StoreError::Io(err)),
        };

        Ok(RetrievedFile {
            content,
            modified: metadata.modified().ok(),
        })
    }

    /// Live view of the storage root together with the store counter.
    pub async fn metrics(&self) -> Result<StoreMetrics, StoreError> {
        let entries = self.scan().await?;
        Ok(StoreMetrics {
            files_current: entries.len(),
            files_stored_total: self.files_stored_total(),
            total_storage_bytes: entries.iter().map(|entry| entry.size).sum(),
        })
    }

    async fn scan(&self) -> Result<Vec<ScannedFile>, StoreError> {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            // Entries removed between listing and stat are simply skipped.
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::Io(err)),
            };
            if !metadata.is_file() {
                continue;
            }
            entries.push(ScannedFile {
                name: entry.file_name().to_string_lossy().to_string(),
                size: metadata.len(),
            });
        }

        entries.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(entries)
    }
}

#[derive(Debug)]
pub enum StoreError {
    InvalidFilename,
    NotFound,
    Io(io::Error),
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

struct ScannedFile {
    name: String,
    size: u64,
}

#[derive(Debug, Serialize)]
pub struct StoredFileMetadata {
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct FileListing {
    pub files: Vec<String>,
    pub count: usize,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct StoreMetrics {
    pub files_current: usize,
    pub files_stored_total: u64,
    pub total_storage_bytes: u64,
}

#[derive(Debug)]
pub struct RetrievedFile {
    pub content: Vec<u8>,
    pub modified: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::{FileStore, StoreError};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn make_store() -> (tempfile::TempDir, FileStore) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("storage");
        std::fs::create_dir_all(&root).expect("create storage root");
        (temp, FileStore::new(root))
    }

    #[test]
    fn validate_filename_accepts_plain_names() {
        for name in ["test.txt", "a.bin", ".hidden", "no-extension", "dots..inside", "x y.txt"] {
            assert_eq!(FileStore::validate_filename(name).ok(), Some(name), "{name}");
        }
    }

    #[test]
    fn validate_filename_rejects_traversal_and_separators() {
        for name in [
            "",
            ".",
            "..",
            "../secret.txt",
            "..\\secret.txt",
            "sub/file.txt",
            "/etc/passwd",
            "\\windows\\win.ini",
            "nul\0byte",
        ] {
            assert!(
                matches!(
                    FileStore::validate_filename(name),
                    Err(StoreError::InvalidFilename)
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips_content() {
        let (_temp, store) = make_store();
        let metadata = store.store("test.txt", b"hello world").await.expect("store");
        assert_eq!(metadata.filename, "test.txt");
        assert_eq!(metadata.size, 11);

        let file = store.retrieve("test.txt").await.expect("retrieve");
        assert_eq!(file.content, b"hello world");
    }

    #[tokio::test]
    async fn store_accepts_empty_content() {
        let (_temp, store) = make_store();
        let metadata = store.store("empty.bin", b"").await.expect("store");
        assert_eq!(metadata.size, 0);

        let file = store.retrieve("empty.bin").await.expect("retrieve");
        assert!(file.content.is_empty());
        assert_eq!(store.files_stored_total(), 1);
    }

    #[tokio::test]
    async fn store_rejects_traversal_before_writing() {
        let (temp, store) = make_store();
        let result = store.store("../escaped.txt", b"data").await;
        assert!(matches!(result, Err(StoreError::InvalidFilename)));
        assert!(!temp.path().join("escaped.txt").exists());
        assert_eq!(store.files_stored_total(), 0);
    }

    #[tokio::test]
    async fn retrieve_never_reads_outside_root() {
        let (temp, store) = make_store();
        std::fs::write(temp.path().join("secret.txt"), b"secret").expect("write secret");

        let result = store.retrieve("../secret.txt").await;
        assert!(matches!(result, Err(StoreError::InvalidFilename)));
    }

    #[tokio::test]
    async fn retrieve_missing_file_is_not_found() {
        let (_temp, store) = make_store();
        let result = store.retrieve("missing.txt").await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn overwrites_count_every_store() {
        let (_temp, store) = make_store();
        store.store("a.txt", b"first").await.expect("store");
        store.store("a.txt", b"second!").await.expect("store");
        store.store("b.txt", b"x").await.expect("store");

        let metrics = store.metrics().await.expect("metrics");
        assert_eq!(metrics.files_stored_total, 3);
        assert_eq!(metrics.files_current, 2);
        assert_eq!(metrics.total_storage_bytes, 8);

        let file = store.retrieve("a.txt").await.expect("retrieve");
        assert_eq!(file.content, b"second!");
    }

    #[tokio::test]
    async fn concurrent_stores_do_not_lose_counts() {
        let (_temp, store) = make_store();
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("file-{}.txt", i % 4);
                store.store(&name, b"payload").await.map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("store");
        }

        assert_eq!(store.files_stored_total(), 32);
        let listing = store.list().await.expect("list");
        assert_eq!(listing.count, 4);
    }

    #[tokio::test]
    async fn list_skips_directories_and_sorts_names() {
        let (_temp, store) = make_store();
        std::fs::create_dir(store.root_path().join("nested")).expect("mkdir");
        store.store("b.txt", b"b").await.expect("store");
        store.store("A.txt", b"a").await.expect("store");
        store.store("c.txt", b"c").await.expect("store");

        let listing = store.list().await.expect("list");
        assert_eq!(listing.files, vec!["A.txt", "b.txt", "c.txt"]);
        assert_eq!(listing.count, 3);
    }

    #[tokio::test]
    async fn retrieve_directory_is_not_found() {
        let (_temp, store) = make_store();
        std::fs::create_dir(store.root_path().join("nested")).expect("mkdir");

        let result = store.retrieve("nested").await;
        assert!(matches!(result, Err(StoreError::NotFound)));
        let result = store.store("nested", b"data").await;
        assert!(matches!(result, Err(StoreError::InvalidFilename)));
    }

    #[tokio::test]
    async fn metrics_are_stable_without_writes() {
        let (_temp, store) = make_store();
        store.store("a.bin", b"abc").await.expect("store");

        let first = store.metrics().await.expect("metrics");
        let second = store.metrics().await.expect("metrics");
        assert_eq!(first, second);
        assert_eq!(first.files_current, 1);
        assert_eq!(first.files_stored_total, 1);
        assert_eq!(first.total_storage_bytes, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_entries_are_rejected() {
        use std::os::unix::fs::symlink;

        let (temp, store) = make_store();
        let outside = temp.path().join("outside.txt");
        std::fs::write(&outside, b"secret").expect("write outside file");
        symlink(&outside, store.root_path().join("link")).expect("symlink");

        let result = store.retrieve("link").await;
        assert!(matches!(result, Err(StoreError::InvalidFilename)));

        let result = store.store("link", b"overwrite").await;
        assert!(matches!(result, Err(StoreError::InvalidFilename)));
        assert_eq!(std::fs::read(&outside).expect("read outside"), b"secret");

        let listing = store.list().await.expect("list");
        assert_eq!(listing.count, 0);
    }
}
