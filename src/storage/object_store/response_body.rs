//! Serde DTOs for the gateway's JSON API, plus the conversion into the
//! metadata type the FTP layer consumes.

use crate::storage::{Error, ErrorKind, Metadata, Result};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

// One row of a list call. Rows without `metadata` are prefixes, i.e. the
// gateway's way of saying "directory".
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct ObjectRecord {
    pub name: String,
    #[allow(dead_code)]
    pub id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub metadata: Option<ObjectBlobMeta>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct ObjectBlobMeta {
    #[serde(default)]
    pub size: u64,
    pub mimetype: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    pub signed_url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListRequest<'a> {
    pub prefix: &'a str,
    pub limit: u32,
    pub offset: u32,
    pub sort_by: SortBy<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<&'a str>,
}

#[derive(Serialize, Debug)]
pub(crate) struct SortBy<'a> {
    pub column: &'a str,
    pub order: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MoveRequest<'a> {
    pub bucket_id: &'a str,
    pub source_key: &'a str,
    pub destination_key: &'a str,
}

#[derive(Serialize, Debug)]
pub(crate) struct RemoveRequest {
    pub prefixes: Vec<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignRequest {
    pub expires_in: u32,
}

impl ObjectRecord {
    pub(crate) fn is_file(&self) -> bool {
        self.metadata.is_some()
    }

    pub(crate) fn to_metadata(&self) -> Result<ObjectMetadata> {
        let modified = self
            .updated_at
            .or(self.created_at)
            .map(SystemTime::from)
            .unwrap_or_else(SystemTime::now);
        match &self.metadata {
            Some(blob) => Ok(ObjectMetadata {
                size: blob.size,
                modified,
                is_file: true,
                media_type: blob.mimetype.clone(),
            }),
            None => Ok(ObjectMetadata {
                size: 0,
                modified,
                is_file: false,
                media_type: None,
            }),
        }
    }
}

/// The metadata of one object or emulated directory in the store.
#[derive(Clone, Debug)]
pub struct ObjectMetadata {
    pub(crate) size: u64,
    pub(crate) modified: SystemTime,
    pub(crate) is_file: bool,
    pub(crate) media_type: Option<String>,
}

impl ObjectMetadata {
    pub(crate) fn directory(modified: SystemTime) -> Self {
        ObjectMetadata {
            size: 0,
            modified,
            is_file: false,
            media_type: None,
        }
    }
}

impl Metadata for ObjectMetadata {
    fn len(&self) -> u64 {
        self.size
    }

    fn is_dir(&self) -> bool {
        !self.is_file
    }

    fn is_file(&self) -> bool {
        self.is_file
    }

    fn modified(&self) -> Result<SystemTime> {
        Ok(self.modified)
    }

    fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

#[allow(dead_code)]
pub(crate) fn parse_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::LocalError, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_rows_have_metadata() {
        let row: ObjectRecord = serde_json::from_str(
            r#"{"name":"readme.txt","id":"0d1","updated_at":"2024-01-02T03:04:05Z","created_at":"2024-01-01T00:00:00Z","metadata":{"size":10,"mimetype":"text/plain"}}"#,
        )
        .unwrap();
        assert!(row.is_file());
        let meta = row.to_metadata().unwrap();
        assert_eq!(meta.len(), 10);
        assert!(meta.is_file());
        assert_eq!(meta.media_type(), Some("text/plain"));
    }

    #[test]
    fn prefix_rows_are_directories() {
        let row: ObjectRecord = serde_json::from_str(r#"{"name":"sub","id":null,"updated_at":null,"created_at":null,"metadata":null}"#).unwrap();
        assert!(!row.is_file());
        let meta = row.to_metadata().unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.len(), 0);
    }

    #[test]
    fn signed_url_field_name() {
        let resp: SignedUrlResponse = serde_json::from_str(r#"{"signedURL":"/object/sign/b/a.txt?token=xyz"}"#).unwrap();
        assert_eq!(resp.signed_url, "/object/sign/b/a.txt?token=xyz");
    }

    #[test]
    fn list_request_serializes_camel_case() {
        let body = serde_json::to_string(&ListRequest {
            prefix: "sub",
            limit: 1000,
            offset: 0,
            sort_by: SortBy { column: "name", order: "asc" },
            search: None,
        })
        .unwrap();
        assert_eq!(body, r#"{"prefix":"sub","limit":1000,"offset":0,"sortBy":{"column":"name","order":"asc"}}"#);
    }
}
