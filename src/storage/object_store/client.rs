//! The HTTP client for the object-store gateway: listing, moving and
//! removing objects through the JSON API, plus ranged downloads through
//! short-lived signed URLs.

use crate::storage::object_store::response_body::{ListRequest, MoveRequest, ObjectRecord, RemoveRequest, SignRequest, SignedUrlResponse, SortBy};
use crate::storage::{Error, ErrorKind};

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{header, Method, Request, Response, StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use std::fmt;
use tokio::io::AsyncRead;
use tokio_util::compat::FuturesAsyncReadCompatExt;

// How long a signed download URL stays valid. Downloads start immediately,
// so this only needs to cover connection setup.
pub(crate) const SIGNED_URL_TTL_SECS: u32 = 30;

// Upper bound on entries per list call.
pub(crate) const LIST_LIMIT: u32 = 1000;

// Key characters that survive percent encoding; slashes separate segments
// and are encoded per segment.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

type HttpClientJson = Client<HttpsConnector<HttpConnector>, String>;
type HttpClientEmpty = Client<HttpsConnector<HttpConnector>, Empty<Bytes>>;
pub(crate) type HttpClientBytes = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Where the object-store gateway lives and how to authenticate against it.
#[derive(Clone)]
pub struct GatewayConfig {
    pub(crate) endpoint: String,
    pub(crate) service_key: String,
}

impl GatewayConfig {
    /// A gateway at `endpoint` (scheme and host, no trailing slash) accessed
    /// with the given service key.
    pub fn new<S: Into<String>>(endpoint: S, service_key: S) -> Self {
        let mut endpoint = endpoint.into();
        while endpoint.ends_with('/') {
            endpoint.pop();
        }
        GatewayConfig {
            endpoint,
            service_key: service_key.into(),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("endpoint", &self.endpoint)
            .field("service_key", &"*******")
            .finish()
    }
}

pub(crate) fn create_http_client<T>() -> Client<HttpsConnector<HttpConnector>, T>
where
    T: hyper::body::Body + Send + 'static,
    T::Data: Send + 'static,
{
    let https = HttpsConnectorBuilder::new()
        .with_native_roots()
        .expect("could not load native TLS roots")
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new()).build(https)
}

#[derive(Clone, Debug)]
pub(crate) struct StoreClient {
    config: GatewayConfig,
    client_json: HttpClientJson,
    client_empty: HttpClientEmpty,
    client_bytes: HttpClientBytes,
}

impl StoreClient {
    pub(crate) fn new(config: GatewayConfig) -> Self {
        StoreClient {
            config,
            client_json: create_http_client(),
            client_empty: create_http_client(),
            client_bytes: create_http_client(),
        }
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub(crate) fn service_key(&self) -> &str {
        &self.config.service_key
    }

    pub(crate) fn bytes_client(&self) -> HttpClientBytes {
        self.client_bytes.clone()
    }

    /// Lists up to `limit` entries below `prefix`, sorted ascending by name.
    /// `search` narrows the result to names containing the given needle.
    pub(crate) async fn list(&self, bucket: &str, prefix: &str, search: Option<&str>, limit: u32, offset: u32) -> Result<Vec<ObjectRecord>, Error> {
        let uri = self.make_uri(format!("/object/list/{}", bucket))?;
        let body = serde_json::to_string(&ListRequest {
            prefix,
            limit,
            offset,
            sort_by: SortBy { column: "name", order: "asc" },
            search,
        })
        .map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        self.http_json(Method::POST, uri, body).await
    }

    /// Moves one object to a new key within the bucket.
    pub(crate) async fn move_object(&self, bucket: &str, from: &str, to: &str) -> Result<(), Error> {
        let uri = self.make_uri("/object/move".to_string())?;
        let body = serde_json::to_string(&MoveRequest {
            bucket_id: bucket,
            source_key: from,
            destination_key: to,
        })
        .map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let response = self.http_json_raw(Method::POST, uri, body).await?;
        consume(response).await
    }

    /// Removes a batch of objects in one call.
    pub(crate) async fn remove(&self, bucket: &str, keys: Vec<String>) -> Result<(), Error> {
        if keys.is_empty() {
            return Ok(());
        }
        let uri = self.make_uri(format!("/object/{}", bucket))?;
        let body = serde_json::to_string(&RemoveRequest { prefixes: keys }).map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let response = self.http_json_raw(Method::DELETE, uri, body).await?;
        consume(response).await
    }

    /// Writes a zero byte object, used for the directory placeholders.
    pub(crate) async fn put_empty(&self, bucket: &str, key: &str) -> Result<(), Error> {
        let uri = self.make_uri(format!("/object/{}/{}", bucket, encode_key(key)))?;
        let request = self
            .request_builder(Method::POST, uri)
            .header(header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
            .header(header::CONTENT_LENGTH, "0")
            .header("x-upsert", "true")
            .body(Empty::<Bytes>::new())
            .map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let response = self
            .client_empty
            .request(request)
            .await
            .map_err(|e| Error::new(ErrorKind::TransientFileNotAvailable, e))?;
        consume(response).await
    }

    /// Asks the gateway for a time-limited download URL for one object.
    pub(crate) async fn sign(&self, bucket: &str, key: &str) -> Result<String, Error> {
        let uri = self.make_uri(format!("/object/sign/{}/{}", bucket, encode_key(key)))?;
        let body = serde_json::to_string(&SignRequest {
            expires_in: SIGNED_URL_TTL_SECS,
        })
        .map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let response: SignedUrlResponse = self.http_json(Method::POST, uri, body).await?;
        Ok(response.signed_url)
    }

    /// Fetches the object behind a signed URL, starting at `start`. Both 200
    /// and 206 count as success; anything else is an error.
    pub(crate) async fn download(&self, signed_path: &str, start: u64) -> Result<Box<dyn AsyncRead + Send + Sync + Unpin>, Error> {
        let uri = self.make_uri(signed_path.to_string())?;
        let mut request = Request::builder().uri(uri).method(Method::GET);
        if start > 0 {
            request = request.header(header::RANGE, format!("bytes={}-", start));
        }
        let request = request.body(Empty::<Bytes>::new()).map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let response = self
            .client_empty
            .request(request)
            .await
            .map_err(|e| Error::new(ErrorKind::TransientFileNotAvailable, e))?;

        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {}
            status => return Err(error_for_status(status)),
        }

        let reader = response
            .into_body()
            .into_data_stream()
            .map_err(std::io::Error::other)
            .into_async_read()
            .compat();

        Ok(Box::new(reader))
    }

    pub(crate) fn make_uri(&self, path_and_query: String) -> Result<Uri, Error> {
        let absolute = if path_and_query.starts_with("http://") || path_and_query.starts_with("https://") {
            path_and_query
        } else if path_and_query.starts_with('/') {
            format!("{}{}", self.config.endpoint, path_and_query)
        } else {
            format!("{}/{}", self.config.endpoint, path_and_query)
        };
        Uri::try_from(absolute).map_err(|_| Error::from(ErrorKind::FileNameNotAllowedError))
    }

    fn request_builder(&self, method: Method, uri: Uri) -> hyper::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.service_key))
            .header("apikey", self.config.service_key.clone())
    }

    async fn http_json_raw(&self, method: Method, uri: Uri, body: String) -> Result<Response<hyper::body::Incoming>, Error> {
        let request = self
            .request_builder(method, uri)
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(body)
            .map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let response = self
            .client_json
            .request(request)
            .await
            .map_err(|e| Error::new(ErrorKind::TransientFileNotAvailable, e))?;
        Ok(response)
    }

    async fn http_json<T>(&self, method: Method, uri: Uri, body: String) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let response = self.http_json_raw(method, uri, body).await?;
        deserialize(response).await
    }
}

/// Percent-encodes an object key, keeping the `/` separators intact.
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<String>>()
        .join("/")
}

pub(crate) fn error_for_status(status: StatusCode) -> Error {
    let kind = match status.as_u16() {
        404 => ErrorKind::PermanentFileNotAvailable,
        401 | 403 => ErrorKind::PermissionDenied,
        429 => ErrorKind::TransientFileNotAvailable,
        _ => ErrorKind::LocalError,
    };
    Error::new(kind, format!("gateway returned HTTP status {}", status))
}

async fn deserialize<T>(response: Response<hyper::body::Incoming>) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response.collect().await.map_err(|e| Error::new(ErrorKind::LocalError, e))?.to_bytes();
    if !status.is_success() {
        return Err(error_for_status(status));
    }
    serde_json::from_slice(&body).map_err(|e| Error::new(ErrorKind::LocalError, e))
}

async fn consume(response: Response<hyper::body::Incoming>) -> Result<(), Error> {
    let status = response.status();
    let _ = response.collect().await.map_err(|e| Error::new(ErrorKind::LocalError, e))?;
    if !status.is_success() {
        return Err(error_for_status(status));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encodes_key_segments_but_not_separators() {
        assert_eq!(encode_key("a/b c/d.txt"), "a/b%20c/d.txt");
        assert_eq!(encode_key("plain.txt"), "plain.txt");
        assert_eq!(encode_key("ü.txt"), "%C3%BC.txt");
    }

    #[test]
    fn uri_building_joins_endpoint_and_path() {
        let client = StoreClient::new(GatewayConfig::new("https://store.example.com/", "key"));
        let uri = client.make_uri("/object/list/b".to_string()).unwrap();
        assert_eq!(uri.to_string(), "https://store.example.com/object/list/b");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(error_for_status(StatusCode::NOT_FOUND).kind(), ErrorKind::PermanentFileNotAvailable);
        assert_eq!(error_for_status(StatusCode::FORBIDDEN).kind(), ErrorKind::PermissionDenied);
        assert_eq!(error_for_status(StatusCode::TOO_MANY_REQUESTS).kind(), ErrorKind::TransientFileNotAvailable);
        assert_eq!(error_for_status(StatusCode::INTERNAL_SERVER_ERROR).kind(), ErrorKind::LocalError);
    }
}
