//! Defines the service provider interface for storage back-end implementors
//! plus the two implementations that ship with the crate: the object-store
//! gateway backend and a plain local filesystem backend.

/// Storage backend error types.
pub mod error;
mod filesystem;
pub mod object_store;

pub use error::{Error, ErrorKind};
pub use filesystem::Filesystem;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    fmt::{self, Debug, Formatter, Write},
    path::{Component, Path, PathBuf},
    result,
    time::SystemTime,
};

/// Tells if STOR/RETR restarts are supported by the storage back-end
/// i.e. starting from a different byte offset.
pub const FEATURE_RESTART: u32 = 0b0000_0001;

/// Result type used by traits in this module
pub type Result<T> = result::Result<T, Error>;

/// Represents the metadata of an _FTP File_
pub trait Metadata {
    /// Returns the length (size) of the file in bytes.
    fn len(&self) -> u64;

    /// Returns `self.len() == 0`.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the path is a directory.
    fn is_dir(&self) -> bool;

    /// Returns true if the path is a file.
    fn is_file(&self) -> bool;

    /// Returns the last modified time of the path.
    fn modified(&self) -> Result<SystemTime>;

    /// Returns the unix permission bits. Object stores know no modes, so the
    /// default synthesizes `0o755` for directories and `0o644` for files.
    fn permissions(&self) -> Permissions {
        Permissions(if self.is_dir() { 0o755 } else { 0o644 })
    }

    /// The media type of the content, when the backend knows it.
    fn media_type(&self) -> Option<&str> {
        None
    }
}

/// Represents the permissions of an _FTP File_
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions(pub u32);

const PERM_READ: u32 = 0b100100100;
const PERM_WRITE: u32 = 0b010010010;
const PERM_EXEC: u32 = 0b001001001;
const PERM_USER: u32 = 0b111000000;
const PERM_GROUP: u32 = 0b000111000;
const PERM_OTHERS: u32 = 0b000000111;

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char(if self.0 & PERM_USER & PERM_READ > 0 { 'r' } else { '-' })?;
        f.write_char(if self.0 & PERM_USER & PERM_WRITE > 0 { 'w' } else { '-' })?;
        f.write_char(if self.0 & PERM_USER & PERM_EXEC > 0 { 'x' } else { '-' })?;
        f.write_char(if self.0 & PERM_GROUP & PERM_READ > 0 { 'r' } else { '-' })?;
        f.write_char(if self.0 & PERM_GROUP & PERM_WRITE > 0 { 'w' } else { '-' })?;
        f.write_char(if self.0 & PERM_GROUP & PERM_EXEC > 0 { 'x' } else { '-' })?;
        f.write_char(if self.0 & PERM_OTHERS & PERM_READ > 0 { 'r' } else { '-' })?;
        f.write_char(if self.0 & PERM_OTHERS & PERM_WRITE > 0 { 'w' } else { '-' })?;
        f.write_char(if self.0 & PERM_OTHERS & PERM_EXEC > 0 { 'x' } else { '-' })?;
        Ok(())
    }
}

/// Fileinfo pairs the path of a file with its [`Metadata`].
///
/// [`Metadata`]: ./trait.Metadata.html
#[derive(Clone, Debug)]
pub struct Fileinfo<P, M>
where
    P: AsRef<Path>,
    M: Metadata,
{
    /// The full path to the file
    pub path: P,
    /// The file's metadata
    pub metadata: M,
}

impl<P, M> fmt::Display for Fileinfo<P, M>
where
    P: AsRef<Path>,
    M: Metadata,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let modified: String = self
            .metadata
            .modified()
            .map(|x| DateTime::<Utc>::from(x).format("%b %d %H:%M").to_string())
            .unwrap_or_else(|_| "--- -- --:--".to_string());
        let basename = self.path.as_ref().components().next_back();
        let path = match basename {
            Some(v) => v.as_os_str().to_string_lossy(),
            None => {
                return Err(std::fmt::Error);
            }
        };
        write!(
            f,
            "{filetype}{permissions} 1 1 1 {size:>12} {modified} {path}",
            filetype = if self.metadata.is_dir() { "d" } else { "-" },
            permissions = self.metadata.permissions(),
            size = self.metadata.len(),
        )
    }
}

/// Resolves a client supplied path against the working directory into a
/// normalized, absolute virtual path. Double slashes collapse, `.` and `..`
/// segments resolve, and `..` can never climb above the root.
pub fn resolve_virtual<P: AsRef<Path>>(cwd: P, dir: &str) -> PathBuf {
    let dir = dir.trim();
    let joined = if dir.starts_with('/') {
        PathBuf::from(dir)
    } else {
        cwd.as_ref().join(dir)
    };
    let mut resolved = PathBuf::from("/");
    for component in joined.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::ParentDir => {
                resolved.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    resolved
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 output is ascii")
}

/// Derives a unique variant of `name` for STOU: the extension is kept and
/// the stem gets a timestamp and a random suffix, both base36.
pub fn unique_name(name: &str) -> String {
    use rand::Rng;

    let millis = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let random: String = (0..13).map(|_| BASE36[rng.gen_range(0..36)] as char).collect();

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}_{}.{}", stem, base36(millis), random, ext),
        _ => format!("{}_{}_{}", name, base36(millis), random),
    }
}

/// The `StorageBackend` trait defines the virtual filesystem that the FTP
/// commands operate on. Once implemented it needs to be registered with the
/// [`Server`] on construction.
///
/// All paths passed in are normalized, absolute virtual paths (leading `/`);
/// what they map to on the other side is the backend's business.
///
/// [`Server`]: ../struct.Server.html
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// The concrete type of the _metadata_ used by this storage backend.
    type Metadata: Metadata + Sync + Send;

    /// Implement to set the name of the storage back-end. By default it
    /// returns the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Tells which optional features are supported by the storage back-end.
    /// Return a value with bits set according to the FEATURE_* constants.
    fn supported_features(&self) -> u32 {
        0
    }

    /// Returns the `Metadata` for the given file or directory.
    ///
    /// [`Metadata`]: ./trait.Metadata.html
    async fn metadata<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<Self::Metadata>;

    /// Returns the list of files in the given directory, sorted ascending by
    /// name. Entries whose names start with a dot are filtered out unless
    /// `show_hidden` is set.
    async fn list<P: AsRef<Path> + Send + Debug>(&self, path: P, show_hidden: bool) -> Result<Vec<Fileinfo<PathBuf, Self::Metadata>>>
    where
        <Self as StorageBackend>::Metadata: Metadata;

    /// Returns the content of the given file from offset `start_pos` as a
    /// stream.
    async fn get<P: AsRef<Path> + Send + Debug>(&self, path: P, start_pos: u64) -> Result<Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>>;

    /// Gets the content of the given file from offset `start_pos` by copying
    /// it into the output writer, returning the number of bytes copied.
    async fn get_into<'a, P, W: ?Sized>(&self, path: P, start_pos: u64, output: &'a mut W) -> Result<u64>
    where
        W: tokio::io::AsyncWrite + Unpin + Sync + Send,
        P: AsRef<Path> + Send + Debug,
    {
        let mut reader = self.get(path, start_pos).await?;
        Ok(tokio::io::copy(&mut reader, output).await?)
    }

    /// Writes bytes from the given reader to the file at `path`, starting at
    /// offset `start_pos`. With `append` the bytes land after the existing
    /// content instead of replacing it.
    async fn put<P: AsRef<Path> + Send + Debug, R: tokio::io::AsyncRead + Send + Sync + Unpin + 'static>(
        &self,
        input: R,
        path: P,
        start_pos: u64,
        append: bool,
    ) -> Result<u64>;

    /// Deletes the file at the given path. For directories the contents are
    /// deleted recursively first.
    async fn del<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()>;

    /// Creates the given directory.
    async fn mkd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()>;

    /// Renames the given file or directory.
    async fn rename<P: AsRef<Path> + Send + Debug>(&self, from: P, to: P) -> Result<()>;

    /// Deletes the given directory, contents included.
    async fn rmd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()>;

    /// Verifies that the given path is a directory that can be changed into.
    async fn cwd<P: AsRef<Path> + Send + Debug>(&self, path: P) -> Result<()>;

    /// Changes the permission bits of a path. Backends without a notion of
    /// modes accept and ignore this.
    async fn chmod<P: AsRef<Path> + Send + Debug>(&self, _path: P, _mode: u32) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_relative_and_absolute() {
        assert_eq!(resolve_virtual("/books", "fiction"), PathBuf::from("/books/fiction"));
        assert_eq!(resolve_virtual("/books", "/music"), PathBuf::from("/music"));
        assert_eq!(resolve_virtual("/", "readme.txt"), PathBuf::from("/readme.txt"));
    }

    #[test]
    fn resolve_collapses_dots() {
        assert_eq!(resolve_virtual("/books", "./fiction/../poetry"), PathBuf::from("/books/poetry"));
        assert_eq!(resolve_virtual("/books/fiction", ".."), PathBuf::from("/books"));
        assert_eq!(resolve_virtual("/books", "a//b///c"), PathBuf::from("/books/a/b/c"));
    }

    #[test]
    fn resolve_clamps_escapes_at_root() {
        assert_eq!(resolve_virtual("/", "../../.."), PathBuf::from("/"));
        assert_eq!(resolve_virtual("/books", "../../../../etc/passwd"), PathBuf::from("/etc/passwd"));
        assert_eq!(resolve_virtual("/", "/../.."), PathBuf::from("/"));
    }

    #[test]
    fn unique_name_keeps_extension() {
        let name = unique_name("report.pdf");
        assert!(name.starts_with("report_"));
        assert!(name.ends_with(".pdf"));
        assert_ne!(unique_name("report.pdf"), unique_name("report.pdf"));
    }

    #[test]
    fn unique_name_without_extension() {
        let name = unique_name("README");
        assert!(name.starts_with("README_"));
        assert!(!name.contains('.'));
    }

    #[test]
    fn base36_encodes() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }
}
