//! A [`StorageBackend`] that keeps the FTP namespace in an HTTP object-store
//! gateway.
//!
//! The store itself is flat: there are objects with keys, nothing else.
//! Directories are emulated with zero byte `.emptyFolderPlaceholder` objects
//! whose last-modified time doubles as the directory mtime. Listings and
//! renames go through the gateway's JSON API, downloads stream through
//! short-lived signed URLs with Range headers, and uploads run over a
//! resumable chunked-upload protocol.

mod client;
mod media_type;
mod path;
mod response_body;
mod upload;

pub use client::GatewayConfig;
pub use response_body::ObjectMetadata;

use crate::storage::{Error, ErrorKind, Fileinfo, Result, StorageBackend};
use client::{StoreClient, LIST_LIMIT};
use media_type::media_type_of;
use path::{validate_name, StoreRoot};
use response_body::ObjectRecord;
use upload::ResumableUploader;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tokio::io::AsyncRead;

/// The zero byte object that marks an emulated directory as existing.
pub const PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// The object-store backed virtual filesystem.
#[derive(Debug)]
pub struct ObjectStorage {
    client: StoreClient,
    uploader: ResumableUploader,
    root: StoreRoot,
}

impl ObjectStorage {
    /// Creates a backend confined to `root`, which is `"bucket"` or
    /// `"bucket/prefix"`. Fails when the root does not parse as a valid
    /// bucket reference.
    pub fn new(config: GatewayConfig, root: &str) -> Result<Self> {
        let root = StoreRoot::parse(root)?;
        let client = StoreClient::new(config);
        let uploader = ResumableUploader::new(client.endpoint().to_string(), client.service_key().to_string(), client.bytes_client());
        Ok(ObjectStorage { client, uploader, root })
    }

    fn bucket(&self) -> &str {
        self.root.bucket()
    }

    fn key<P: AsRef<Path>>(&self, path: P) -> String {
        self.root.key_of(path)
    }

    // Recovers a directory's mtime from its placeholder object; entries
    // created out-of-band have none, so "now" is the best we can do.
    async fn directory_mtime(&self, dir_key: &str) -> SystemTime {
        match self.client.list(self.bucket(), dir_key, Some(PLACEHOLDER), 1, 0).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.updated_at.or(row.created_at))
                .map(SystemTime::from)
                .unwrap_or_else(SystemTime::now),
            Err(_) => SystemTime::now(),
        }
    }

    fn child_key(parent_key: &str, name: &str) -> String {
        if parent_key.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", parent_key, name)
        }
    }

    // Removes everything below `dir_key`: files in one batch per directory
    // level, sub-directories recursively, and finally the placeholder.
    fn delete_dir<'a>(&'a self, dir_key: String) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let rows = self.client.list(self.bucket(), &dir_key, None, LIST_LIMIT, 0).await?;

            let file_keys: Vec<String> = rows
                .iter()
                .filter(|row| row.is_file())
                .map(|row| Self::child_key(&dir_key, &row.name))
                .collect();
            self.client.remove(self.bucket(), file_keys).await?;

            for row in rows.iter().filter(|row| !row.is_file()) {
                self.delete_dir(Self::child_key(&dir_key, &row.name)).await?;
            }

            // The placeholder was part of the file batch when it existed;
            // removing it again tolerates directories created out-of-band.
            let _ = self.client.remove(self.bucket(), vec![Self::child_key(&dir_key, PLACEHOLDER)]).await;
            Ok(())
        })
    }

    // Moves a directory by creating the destination placeholder, moving
    // every child and dropping the source placeholder last.
    fn move_dir<'a>(&'a self, from_key: String, to_key: String) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.client.put_empty(self.bucket(), &Self::child_key(&to_key, PLACEHOLDER)).await?;

            let rows = self.client.list(self.bucket(), &from_key, None, LIST_LIMIT, 0).await?;
            for row in rows.iter() {
                let source = Self::child_key(&from_key, &row.name);
                let destination = Self::child_key(&to_key, &row.name);
                if row.is_file() {
                    if row.name == PLACEHOLDER {
                        continue;
                    }
                    self.client.move_object(self.bucket(), &source, &destination).await?;
                } else {
                    self.move_dir(source, destination).await?;
                }
            }

            // A directory created without a placeholder has nothing to drop.
            let _ = self.client.remove(self.bucket(), vec![Self::child_key(&from_key, PLACEHOLDER)]).await;
            Ok(())
        })
    }

    // Finds the entry for `path` by searching its parent's listing, falling
    // back to a placeholder probe for directories the listing missed.
    async fn find_entry(&self, path: &Path) -> Result<ObjectMetadata> {
        let key = self.key(path);
        if key.is_empty() || path == Path::new("/") || path == Path::new(".") {
            return Ok(ObjectMetadata::directory(self.directory_mtime(&key).await));
        }

        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::from(ErrorKind::PermanentFileNotAvailable))?;
        let parent_key = self.key(path.parent().unwrap_or_else(|| Path::new("/")));

        let rows = self.client.list(self.bucket(), &parent_key, Some(&base), LIST_LIMIT, 0).await?;
        if let Some(row) = rows.iter().find(|row| row.name == base) {
            if row.is_file() {
                return row.to_metadata();
            }
            return Ok(ObjectMetadata::directory(self.directory_mtime(&key).await));
        }

        // The search can miss directories whose only marker is the
        // placeholder object below them.
        let probe = self.client.list(self.bucket(), &key, Some(PLACEHOLDER), 1, 0).await?;
        match probe.first() {
            Some(row) => {
                let modified = row.updated_at.or(row.created_at).map(SystemTime::from).unwrap_or_else(SystemTime::now);
                Ok(ObjectMetadata::directory(modified))
            }
            None => Err(Error::from(ErrorKind::PermanentFileNotAvailable)),
        }
    }
}

#[async_trait]
impl StorageBackend for ObjectStorage {
    type Metadata = ObjectMetadata;

    fn name(&self) -> &str {
        "object-store"
    }

    fn supported_features(&self) -> u32 {
        crate::storage::FEATURE_RESTART
    }

    async fn metadata<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<Self::Metadata> {
        self.find_entry(path.as_ref()).await
    }

    async fn list<P: AsRef<Path> + Send + Debug>(&self, path: P, show_hidden: bool) -> Result<Vec<Fileinfo<PathBuf, Self::Metadata>>> {
        let dir_key = self.key(&path);
        let rows: Vec<ObjectRecord> = self.client.list(self.bucket(), &dir_key, None, LIST_LIMIT, 0).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            if row.name == PLACEHOLDER {
                continue;
            }
            if !show_hidden && row.name.starts_with('.') {
                continue;
            }
            let metadata = if row.is_file() {
                row.to_metadata()?
            } else {
                ObjectMetadata::directory(self.directory_mtime(&Self::child_key(&dir_key, &row.name)).await)
            };
            entries.push(Fileinfo {
                path: PathBuf::from(row.name),
                metadata,
            });
        }
        Ok(entries)
    }

    async fn get<P: AsRef<Path> + Send + Debug>(&self, path: P, start_pos: u64) -> Result<Box<dyn AsyncRead + Send + Sync + Unpin>> {
        validate_name(&path)?;
        let key = self.key(&path);
        let signed_path = self.client.sign(self.bucket(), &key).await?;
        self.client.download(&signed_path, start_pos).await
    }

    async fn put<P: AsRef<Path> + Send + Debug, R: AsyncRead + Send + Sync + Unpin + 'static>(
        &self,
        bytes: R,
        path: P,
        start_pos: u64,
        append: bool,
    ) -> Result<u64> {
        validate_name(&path)?;
        let key = self.key(&path);
        let content_type = media_type_of(&path.as_ref().to_string_lossy());
        self.uploader.upload(self.bucket(), &key, &content_type, bytes, start_pos, append).await
    }

    async fn del<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()> {
        let metadata = self.find_entry(path.as_ref()).await?;
        let key = self.key(&path);
        if metadata.is_file {
            self.client.remove(self.bucket(), vec![key]).await
        } else {
            self.delete_dir(key).await
        }
    }

    async fn mkd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()> {
        validate_name(&path)?;
        let key = self.key(&path);
        self.client.put_empty(self.bucket(), &Self::child_key(&key, PLACEHOLDER)).await
    }

    async fn rename<P: AsRef<Path> + Send + Debug>(&self, from: P, to: P) -> Result<()> {
        validate_name(&to)?;
        let metadata = self.find_entry(from.as_ref()).await?;
        let from_key = self.key(&from);
        let to_key = self.key(&to);
        if metadata.is_file {
            self.client.move_object(self.bucket(), &from_key, &to_key).await
        } else {
            self.move_dir(from_key, to_key).await
        }
    }

    async fn rmd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()> {
        let key = self.key(&path);
        self.delete_dir(key).await
    }

    async fn cwd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()> {
        validate_name(&path)?;
        let key = self.key(&path);
        if key.is_empty() {
            // The root always exists.
            return Ok(());
        }
        let rows = self.client.list(self.bucket(), &key, None, 1, 0).await?;
        if rows.is_empty() {
            Err(Error::new(ErrorKind::PermanentFileNotAvailable, "Directory does not exist"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn storage() -> ObjectStorage {
        ObjectStorage::new(GatewayConfig::new("https://store.example.com", "key"), "bucket/ftp").unwrap()
    }

    #[test]
    fn new_rejects_invalid_roots() {
        let config = GatewayConfig::new("https://store.example.com", "key");
        assert!(ObjectStorage::new(config.clone(), "Bad Bucket").is_err());
        assert!(ObjectStorage::new(config.clone(), "/").is_err());
        assert!(ObjectStorage::new(config, "ok-bucket").is_ok());
    }

    #[test]
    fn keys_carry_the_prefix() {
        let storage = storage();
        assert_eq!(storage.key("/a/b.txt"), "ftp/a/b.txt");
        assert_eq!(storage.key("/"), "ftp");
    }

    #[test]
    fn child_keys_join_cleanly() {
        assert_eq!(ObjectStorage::child_key("", "a"), "a");
        assert_eq!(ObjectStorage::child_key("x/y", "a"), "x/y/a");
    }
}
