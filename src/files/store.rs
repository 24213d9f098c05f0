//! Filesystem-backed file store
//!
//! All content lives in one flat directory. Names are validated before any
//! filesystem call so a request can never address a path outside the root.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs::{self, File};

use super::digest::{hash_reader, DigestAlgorithm};

#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Metadata for one stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFileInfo {
    pub name: String,
    pub length: u64,
    /// Extension without the leading dot, empty when the name has none.
    pub extension: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Flat-directory file store rooted at a configured content directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the content directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), FileError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// List all plain files in the store, sorted by name.
    pub async fn list(&self) -> Result<Vec<StoredFileInfo>, FileError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(info_from(&name, &meta));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub async fn metadata(&self, name: &str) -> Result<StoredFileInfo, FileError> {
        let path = self.resolve(name)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|err| not_found(name, err))?;
        if !meta.is_file() {
            return Err(FileError::NotFound(name.to_string()));
        }
        Ok(info_from(name, &meta))
    }

    /// Open a stored file for reading, together with its metadata.
    pub async fn open(&self, name: &str) -> Result<(File, StoredFileInfo), FileError> {
        let path = self.resolve(name)?;
        let file = File::open(&path).await.map_err(|err| not_found(name, err))?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(FileError::NotFound(name.to_string()));
        }
        Ok((file, info_from(name, &meta)))
    }

    /// Create or truncate a file and hand the writer back to the caller.
    pub async fn create(&self, name: &str) -> Result<File, FileError> {
        let path = self.resolve(name)?;
        Ok(File::create(&path).await?)
    }

    pub async fn delete(&self, name: &str) -> Result<(), FileError> {
        let path = self.resolve(name)?;
        fs::remove_file(&path)
            .await
            .map_err(|err| not_found(name, err))?;
        Ok(())
    }

    /// Copy a stored file to a new name, overwriting any existing
    /// destination. Returns the number of bytes copied.
    pub async fn copy(&self, source: &str, destination: &str) -> Result<u64, FileError> {
        let from = self.resolve(source)?;
        let to = self.resolve(destination)?;
        let copied = fs::copy(&from, &to)
            .await
            .map_err(|err| not_found(source, err))?;
        Ok(copied)
    }

    /// Compute a digest over a stored file's content, as uppercase hex.
    pub async fn digest(
        &self,
        name: &str,
        algorithm: DigestAlgorithm,
    ) -> Result<String, FileError> {
        let (mut file, _) = self.open(name).await?;
        Ok(hash_reader(algorithm, &mut file).await?)
    }

    // Names are plain entries in the content directory; anything that could
    // traverse out of it is rejected before touching the filesystem.
    fn resolve(&self, name: &str) -> Result<PathBuf, FileError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\');
        if !valid {
            return Err(FileError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

fn info_from(name: &str, meta: &std::fs::Metadata) -> StoredFileInfo {
    let extension = Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    let modified = meta.modified().ok().map(DateTime::<Utc>::from);
    StoredFileInfo {
        name: name.to_string(),
        length: meta.len(),
        extension,
        modified,
    }
}

fn not_found(name: &str, err: io::Error) -> FileError {
    if err.kind() == io::ErrorKind::NotFound {
        FileError::NotFound(name.to_string())
    } else {
        FileError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn store_with_dir() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    async fn write_file(store: &FileStore, name: &str, content: &[u8]) {
        let mut file = store.create(name).await.unwrap();
        file.write_all(content).await.unwrap();
        file.flush().await.unwrap();
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let (_dir, store) = store_with_dir().await;
        for name in ["", ".", "..", "a/b.txt", "..\\secret", "dir/../../x"] {
            let err = store.metadata(name).await.unwrap_err();
            assert!(
                matches!(err, FileError::InvalidName(_)),
                "{name:?} should be invalid"
            );
        }
    }

    #[tokio::test]
    async fn ensure_root_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("content"));
        store.ensure_root().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_reports_length_and_extension() {
        let (_dir, store) = store_with_dir().await;
        write_file(&store, "report.txt", b"twelve bytes").await;

        let info = store.metadata("report.txt").await.unwrap();
        assert_eq!(info.name, "report.txt");
        assert_eq!(info.length, 12);
        assert_eq!(info.extension, "txt");
        assert!(info.modified.is_some());

        write_file(&store, "noext", b"x").await;
        let info = store.metadata("noext").await.unwrap();
        assert_eq!(info.extension, "");
    }

    #[tokio::test]
    async fn list_is_sorted_and_skips_directories() {
        let (dir, store) = store_with_dir().await;
        write_file(&store, "b.bin", b"bb").await;
        write_file(&store, "a.bin", b"a").await;
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let (_dir, store) = store_with_dir().await;
        assert!(matches!(
            store.metadata("ghost.txt").await.unwrap_err(),
            FileError::NotFound(_)
        ));
        assert!(matches!(
            store.open("ghost.txt").await.unwrap_err(),
            FileError::NotFound(_)
        ));
        assert!(matches!(
            store.delete("ghost.txt").await.unwrap_err(),
            FileError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_removes_the_file() {
        let (_dir, store) = store_with_dir().await;
        write_file(&store, "gone.txt", b"data").await;

        store.delete("gone.txt").await.unwrap();
        assert!(matches!(
            store.delete("gone.txt").await.unwrap_err(),
            FileError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn copy_duplicates_content_and_overwrites() {
        let (_dir, store) = store_with_dir().await;
        write_file(&store, "src.txt", b"payload").await;
        write_file(&store, "dst.txt", b"old destination content").await;

        let copied = store.copy("src.txt", "dst.txt").await.unwrap();
        assert_eq!(copied, 7);

        let dst = store.metadata("dst.txt").await.unwrap();
        assert_eq!(dst.length, 7);

        assert!(matches!(
            store.copy("ghost.txt", "other.txt").await.unwrap_err(),
            FileError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn digest_matches_known_vector() {
        let (_dir, store) = store_with_dir().await;
        write_file(&store, "hello.txt", b"hello world").await;

        let digest = store
            .digest("hello.txt", DigestAlgorithm::Sha256)
            .await
            .unwrap();
        assert_eq!(
            digest,
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9"
        );
    }
}
