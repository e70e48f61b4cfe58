//! Root parsing and virtual path mapping for the object-store backend.
//!
//! A configured root of `"bucket"` or `"bucket/prefix"` pins every operation
//! of the backend inside that bucket and prefix. Virtual paths (always
//! absolute, already normalized by the control channel) map 1:1 onto keys:
//! `/a/b.txt` becomes `prefix/a/b.txt`.

use crate::storage::{Error, ErrorKind};

use std::path::Path;

const MAX_BUCKET_LEN: usize = 63;

// Characters that can never appear in an object name.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// The bucket and optional key prefix all operations are confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRoot {
    bucket: String,
    prefix: String,
}

impl StoreRoot {
    /// Parses `"bucket"` or `"bucket/prefix"`. The bucket name must be
    /// lowercase alphanumeric with inner dashes/underscores, 1 to 63
    /// characters; the root as a whole may not be empty, whitespace or `/`.
    pub fn parse(root: &str) -> Result<StoreRoot, Error> {
        let root = root.trim();
        if root.is_empty() || root == "/" || root.contains(char::is_whitespace) {
            return Err(Error::from(ErrorKind::FileNameNotAllowedError));
        }
        let root = root.trim_matches('/');
        let (bucket, prefix) = match root.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix.trim_matches('/')),
            None => (root, ""),
        };
        if !valid_bucket_name(bucket) {
            return Err(Error::from(ErrorKind::FileNameNotAllowedError));
        }
        Ok(StoreRoot {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Maps an absolute virtual path onto its object key, prefix included.
    /// The empty key denotes the root itself.
    pub fn key_of<P: AsRef<Path>>(&self, virtual_path: P) -> String {
        let relative = virtual_path.as_ref().to_string_lossy();
        let relative = relative.trim_matches('/');
        match (self.prefix.is_empty(), relative.is_empty()) {
            (true, true) => String::new(),
            (true, false) => relative.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}/{}", self.prefix, relative),
        }
    }
}

// The accepted shape is one lowercase alphanumeric character, or one at each
// end with dashes/underscores allowed in between.
fn valid_bucket_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_BUCKET_LEN {
        return false;
    }
    let inner_ok = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_';
    let edge_ok = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let mut chars = name.chars();
    let first = chars.next().expect("non-empty checked above");
    match chars.next_back() {
        None => edge_ok(first),
        Some(last) => edge_ok(first) && edge_ok(last) && chars.all(inner_ok),
    }
}

/// Rejects path segments containing characters an object name can not carry:
/// `<`, `>`, `:`, `"`, `|`, `?`, `*` and control characters.
pub fn validate_name<P: AsRef<Path>>(virtual_path: P) -> Result<(), Error> {
    let path = virtual_path.as_ref().to_string_lossy();
    if path.chars().any(|c| FORBIDDEN.contains(&c) || c.is_control()) {
        return Err(Error::from(ErrorKind::FileNameNotAllowedError));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bucket_only() {
        let root = StoreRoot::parse("my-bucket").unwrap();
        assert_eq!(root.bucket(), "my-bucket");
        assert_eq!(root.key_of("/a.txt"), "a.txt");
        assert_eq!(root.key_of("/"), "");
    }

    #[test]
    fn parses_bucket_with_prefix() {
        let root = StoreRoot::parse("my-bucket/ftp/home").unwrap();
        assert_eq!(root.bucket(), "my-bucket");
        assert_eq!(root.key_of("/a/b.txt"), "ftp/home/a/b.txt");
        assert_eq!(root.key_of("/"), "ftp/home");
    }

    #[test]
    fn rejects_bad_roots() {
        assert!(StoreRoot::parse("").is_err());
        assert!(StoreRoot::parse("  ").is_err());
        assert!(StoreRoot::parse("/").is_err());
        assert!(StoreRoot::parse("has space/x").is_err());
    }

    #[test]
    fn validates_bucket_names() {
        assert!(valid_bucket_name("b"));
        assert!(valid_bucket_name("bucket-1"));
        assert!(valid_bucket_name("0_0"));
        assert!(!valid_bucket_name("-bucket"));
        assert!(!valid_bucket_name("bucket-"));
        assert!(!valid_bucket_name("Bucket"));
        assert!(!valid_bucket_name(&"b".repeat(64)));
        assert!(valid_bucket_name(&"b".repeat(63)));
    }

    #[test]
    fn rejects_forbidden_name_characters() {
        assert!(validate_name("/ok/file.txt").is_ok());
        for bad in ["/a<b", "/a>b", "/a:b", "/a\"b", "/a|b", "/a?b", "/a*b", "/a\u{1}b"] {
            assert!(validate_name(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
