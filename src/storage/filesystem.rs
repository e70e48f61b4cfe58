//! A StorageBackend that keeps its files on the local disk, like a
//! traditional FTP server. It exists for integration tests and small
//! deployments that do not need an object store.

use crate::storage::{Error, ErrorKind, Fileinfo, Metadata, Result, StorageBackend};

use async_trait::async_trait;
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWriteExt};

/// An implementation of [`StorageBackend`] that serves a directory tree on
/// local disk. The virtual paths handed in are already normalized and
/// clamped at the root, so joining them under the root directory is safe.
#[derive(Debug)]
pub struct Filesystem {
    root: PathBuf,
}

/// The metadata the filesystem backend reports, a thin wrapper around what
/// the OS returns.
#[derive(Debug, Clone)]
pub struct FsMetadata {
    inner: std::fs::Metadata,
}

impl Metadata for FsMetadata {
    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn is_dir(&self) -> bool {
        self.inner.is_dir()
    }

    fn is_file(&self) -> bool {
        self.inner.is_file()
    }

    fn modified(&self) -> Result<SystemTime> {
        self.inner.modified().map_err(|e| Error::new(ErrorKind::LocalError, e))
    }
}

impl Filesystem {
    /// Create a new Filesystem backend with the given root. No operation
    /// ever touches anything outside of it.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Filesystem { root: root.into() }
    }

    // Virtual paths always start with '/'; strip it and join onto the root.
    fn full_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        match path.strip_prefix("/") {
            Ok(relative) => self.root.join(relative),
            Err(_) => self.root.join(path),
        }
    }
}

#[async_trait]
impl StorageBackend for Filesystem {
    type Metadata = FsMetadata;

    fn supported_features(&self) -> u32 {
        crate::storage::FEATURE_RESTART
    }

    async fn metadata<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<Self::Metadata> {
        let full_path = self.full_path(path);
        let inner = tokio::fs::metadata(full_path).await?;
        Ok(FsMetadata { inner })
    }

    async fn list<P: AsRef<Path> + Send + Debug>(&self, path: P, show_hidden: bool) -> Result<Vec<Fileinfo<PathBuf, Self::Metadata>>>
    where
        <Self as StorageBackend>::Metadata: Metadata,
    {
        let full_path = self.full_path(path);
        let mut rd = tokio::fs::read_dir(full_path).await?;

        let mut fis: Vec<Fileinfo<PathBuf, Self::Metadata>> = vec![];
        while let Some(dir_entry) = rd.next_entry().await? {
            let name = dir_entry.file_name().to_string_lossy().to_string();
            if !show_hidden && name.starts_with('.') {
                continue;
            }
            let inner = tokio::fs::metadata(dir_entry.path()).await?;
            fis.push(Fileinfo {
                path: PathBuf::from(name),
                metadata: FsMetadata { inner },
            });
        }
        fis.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(fis)
    }

    async fn get<P: AsRef<Path> + Send + Debug>(&self, path: P, start_pos: u64) -> Result<Box<dyn AsyncRead + Send + Sync + Unpin>> {
        let full_path = self.full_path(path);
        let mut file = tokio::fs::File::open(full_path).await?;
        if start_pos > 0 {
            file.seek(std::io::SeekFrom::Start(start_pos)).await?;
        }
        Ok(Box::new(file))
    }

    async fn put<P: AsRef<Path> + Send + Debug, R: AsyncRead + Send + Sync + Unpin + 'static>(
        &self,
        mut bytes: R,
        path: P,
        start_pos: u64,
        append: bool,
    ) -> Result<u64> {
        let full_path = self.full_path(path);
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true);
        if append {
            options.append(true);
        }
        let mut file = options.open(full_path).await?;
        if !append {
            // A plain STOR replaces content from the offset on.
            file.set_len(start_pos).await?;
            file.seek(std::io::SeekFrom::Start(start_pos)).await?;
        }

        let bytes_copied = tokio::io::copy(&mut bytes, &mut file).await?;
        file.flush().await?;
        Ok(bytes_copied)
    }

    async fn del<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()> {
        let full_path = self.full_path(path);
        let meta = tokio::fs::metadata(&full_path).await?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(full_path).await?;
        } else {
            tokio::fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn mkd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()> {
        tokio::fs::create_dir(self.full_path(path)).await?;
        Ok(())
    }

    async fn rename<P: AsRef<Path> + Send + Debug>(&self, from: P, to: P) -> Result<()> {
        tokio::fs::rename(self.full_path(from), self.full_path(to)).await?;
        Ok(())
    }

    async fn rmd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()> {
        tokio::fs::remove_dir_all(self.full_path(path)).await?;
        Ok(())
    }

    async fn cwd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()> {
        let meta = tokio::fs::metadata(self.full_path(path)).await?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(Error::from(ErrorKind::PermanentFileNotAvailable))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn put_get_roundtrip_with_offset() {
        let dir = tempfile::tempdir().unwrap();
        let fs = Filesystem::new(dir.path());

        fs.put(&b"hello world"[..], "/greeting.txt", 0, false).await.unwrap();
        let meta = fs.metadata("/greeting.txt").await.unwrap();
        assert_eq!(meta.len(), 11);

        let mut out = Vec::new();
        fs.get_into("/greeting.txt", 6, &mut out).await.unwrap();
        assert_eq!(out, b"world");
    }

    #[tokio::test]
    async fn append_adds_to_the_end() {
        let dir = tempfile::tempdir().unwrap();
        let fs = Filesystem::new(dir.path());

        fs.put(&b"hello"[..], "/log.txt", 0, false).await.unwrap();
        fs.put(&b" again"[..], "/log.txt", 0, true).await.unwrap();

        let mut out = Vec::new();
        fs.get_into("/log.txt", 0, &mut out).await.unwrap();
        assert_eq!(out, b"hello again");
    }

    #[tokio::test]
    async fn list_hides_dot_files_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let fs = Filesystem::new(dir.path());

        fs.put(&b"x"[..], "/visible.txt", 0, false).await.unwrap();
        fs.put(&b"x"[..], "/.hidden", 0, false).await.unwrap();

        let names: Vec<String> = fs.list("/", false).await.unwrap().iter().map(|fi| fi.path.display().to_string()).collect();
        assert_eq!(names, vec!["visible.txt"]);

        let all = fs.list("/", true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn mkdir_then_delete_removes_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let fs = Filesystem::new(dir.path());

        fs.mkd("/sub").await.unwrap();
        fs.put(&b"x"[..], "/sub/a.txt", 0, false).await.unwrap();
        fs.del("/sub").await.unwrap();
        assert!(fs.metadata("/sub").await.is_err());
    }

    #[tokio::test]
    async fn rename_moves_files() {
        let dir = tempfile::tempdir().unwrap();
        let fs = Filesystem::new(dir.path());

        fs.put(&b"x"[..], "/a.txt", 0, false).await.unwrap();
        fs.rename("/a.txt", "/b.txt").await.unwrap();
        assert!(fs.metadata("/a.txt").await.is_err());
        assert_eq!(fs.metadata("/b.txt").await.unwrap().len(), 1);
    }
}
