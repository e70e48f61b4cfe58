//! The resumable chunked-upload client. Uploads are created with a POST
//! carrying the object metadata, then pushed in 6 MiB PATCH requests with an
//! explicit offset, the way the tus protocol does it. Failed chunks back off
//! and retry; an upload that still fails keeps its URL around so a later
//! write to the same object can resume where it stopped.

use crate::storage::object_store::client::{create_http_client, error_for_status, HttpClientBytes};
use crate::storage::{Error, ErrorKind};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{header, Method, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

// One PATCH per this many bytes.
const CHUNK_SIZE: usize = 6 * 1024 * 1024;

// Backoff schedule for a failing chunk; the first attempt goes out
// immediately.
const RETRY_DELAYS_MS: [u64; 5] = [0, 3000, 5000, 10000, 20000];

const TUS_VERSION: &str = "1.0.0";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

type HttpClientEmpty = Client<HttpsConnector<HttpConnector>, Empty<Bytes>>;

#[derive(Debug)]
pub(crate) struct ResumableUploader {
    endpoint: String,
    service_key: String,
    client_bytes: HttpClientBytes,
    client_empty: HttpClientEmpty,
    // Upload URLs of unfinished uploads, keyed by "bucket/key", so a later
    // write to the same object can pick up where the last one stopped.
    sessions: Mutex<HashMap<String, String>>,
}

impl ResumableUploader {
    pub(crate) fn new(endpoint: String, service_key: String, client_bytes: HttpClientBytes) -> Self {
        ResumableUploader {
            endpoint,
            service_key,
            client_bytes,
            client_empty: create_http_client(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Streams `src` into `bucket`/`key`. Returns the number of bytes read
    /// from `src`. With `append` (or a positive restart offset) a previous
    /// unfinished upload of the same object is resumed when one exists.
    pub(crate) async fn upload<R>(&self, bucket: &str, key: &str, content_type: &str, mut src: R, start_pos: u64, append: bool) -> Result<u64, Error>
    where
        R: AsyncRead + Send + Sync + Unpin,
    {
        let session_key = format!("{}/{}", bucket, key);

        let (upload_url, mut offset) = match self.resume_candidate(&session_key, append || start_pos > 0).await {
            Some((url, offset)) => (url, offset),
            None => {
                let url = self.create_upload(bucket, key, content_type, append).await?;
                (url, 0)
            }
        };

        let mut total_read: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let mut filled = 0;
            while filled < CHUNK_SIZE {
                let n = src
                    .read(&mut buf[filled..])
                    .await
                    .map_err(|e| Error::new(ErrorKind::LocalError, e))?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            let last = filled < CHUNK_SIZE;
            let chunk = Bytes::copy_from_slice(&buf[..filled]);

            if let Err(err) = self.patch_chunk(&upload_url, offset, chunk, last).await {
                // Keep the upload URL so the next write to this object can
                // resume instead of starting over.
                self.sessions.lock().await.insert(session_key, upload_url);
                return Err(err);
            }

            offset += filled as u64;
            total_read += filled as u64;
            if last {
                break;
            }
        }

        self.sessions.lock().await.remove(&session_key);
        Ok(total_read)
    }

    // Returns the persisted upload URL and its current offset when resuming
    // makes sense and the gateway still knows the upload.
    async fn resume_candidate(&self, session_key: &str, want_resume: bool) -> Option<(String, u64)> {
        if !want_resume {
            self.sessions.lock().await.remove(session_key);
            return None;
        }
        let url = self.sessions.lock().await.remove(session_key)?;
        match self.query_offset(&url).await {
            Ok(offset) => Some((url, offset)),
            Err(_) => None,
        }
    }

    async fn create_upload(&self, bucket: &str, key: &str, content_type: &str, upsert: bool) -> Result<String, Error> {
        let uri: Uri = format!("{}/upload/resumable", self.endpoint)
            .parse()
            .map_err(|_| Error::from(ErrorKind::FileNameNotAllowedError))?;

        let metadata = format!(
            "bucketName {},objectName {},contentType {}",
            BASE64.encode(bucket),
            BASE64.encode(key),
            BASE64.encode(content_type),
        );

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.service_key))
            .header("apikey", self.service_key.clone())
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Defer-Length", "1")
            .header("Upload-Metadata", metadata);
        if upsert {
            request = request.header("x-upsert", "true");
        }
        let request = request.body(Empty::<Bytes>::new()).map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let response = self
            .client_empty
            .request(request)
            .await
            .map_err(|e| Error::new(ErrorKind::TransientFileNotAvailable, e))?;

        if response.status() != StatusCode::CREATED && !response.status().is_success() {
            return Err(error_for_status(response.status()));
        }
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::new(ErrorKind::LocalError, "upload create response carried no Location header"))?;

        // Location may be absolute or relative to the endpoint.
        let url = if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}{}", self.endpoint, location)
        };
        Ok(url)
    }

    async fn query_offset(&self, upload_url: &str) -> Result<u64, Error> {
        let uri: Uri = upload_url.parse().map_err(|_| Error::from(ErrorKind::LocalError))?;
        let request = Request::builder()
            .method(Method::HEAD)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.service_key))
            .header("apikey", self.service_key.clone())
            .header("Tus-Resumable", TUS_VERSION)
            .body(Empty::<Bytes>::new())
            .map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let response = self
            .client_empty
            .request(request)
            .await
            .map_err(|e| Error::new(ErrorKind::TransientFileNotAvailable, e))?;
        if !response.status().is_success() {
            return Err(error_for_status(response.status()));
        }
        response
            .headers()
            .get("Upload-Offset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::new(ErrorKind::LocalError, "upload HEAD response carried no Upload-Offset"))
    }

    // Sends one chunk, retrying per the backoff schedule. The final chunk
    // also settles the deferred length so the gateway completes the object.
    async fn patch_chunk(&self, upload_url: &str, offset: u64, chunk: Bytes, last: bool) -> Result<(), Error> {
        let uri: Uri = upload_url.parse().map_err(|_| Error::from(ErrorKind::LocalError))?;
        let mut last_err = Error::from(ErrorKind::LocalError);

        for delay_ms in RETRY_DELAYS_MS {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let mut request = Request::builder()
                .method(Method::PATCH)
                .uri(uri.clone())
                .header(header::AUTHORIZATION, format!("Bearer {}", self.service_key))
                .header("apikey", self.service_key.clone())
                .header("Tus-Resumable", TUS_VERSION)
                .header("Upload-Offset", offset.to_string())
                .header(header::CONTENT_TYPE, OFFSET_CONTENT_TYPE);
            if last {
                request = request.header("Upload-Length", (offset + chunk.len() as u64).to_string());
            }
            let request = match request.body(Full::new(chunk.clone())) {
                Ok(request) => request,
                Err(e) => return Err(Error::new(ErrorKind::LocalError, e)),
            };

            match self.client_bytes.request(request).await {
                Ok(response) if response.status().is_success() => {
                    let _ = response.collect().await;
                    return Ok(());
                }
                Ok(response) => {
                    // Client-side faults will not get better by retrying.
                    let status = response.status();
                    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(error_for_status(status));
                    }
                    last_err = error_for_status(status);
                }
                Err(e) => {
                    last_err = Error::new(ErrorKind::TransientFileNotAvailable, e);
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn metadata_header_is_base64_pairs() {
        let bucket = BASE64.encode("b");
        let object = BASE64.encode("a/b.txt");
        let mime = BASE64.encode("text/plain");
        let header = format!("bucketName {},objectName {},contentType {}", bucket, object, mime);
        assert_eq!(header, "bucketName Yg==,objectName YS9iLnR4dA==,contentType dGV4dC9wbGFpbg==");
    }

    #[test]
    fn backoff_schedule_matches_upload_policy() {
        assert_eq!(RETRY_DELAYS_MS, [0, 3000, 5000, 10000, 20000]);
        assert_eq!(CHUNK_SIZE, 6 * 1024 * 1024);
    }
}
