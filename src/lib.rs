#![deny(missing_docs)]
#![forbid(unsafe_code)]

//! An FTP(S) server library for Rust that serves files straight out of an
//! HTTP object-store gateway.
//!
//! bucketftp speaks standards compliant FTP to clients (RFC 959, 2228, 2389,
//! 2428 and 3659) while mapping every filesystem operation onto object-store
//! primitives: listings and renames go through the gateway's JSON API,
//! downloads stream through short-lived signed URLs and uploads are pushed
//! through a resumable chunked-upload protocol. Because the store has no real
//! directories, the virtual filesystem emulates them with zero-byte
//! placeholder objects.
//!
//! Storage back-ends are pluggable through the [`storage::StorageBackend`]
//! trait; next to the object-store backend a plain local-filesystem backend
//! is included, mostly so the integration tests can run without a gateway.
//!
//! # Quick start
//!
//! ```no_run
//! use bucketftp::{Server, auth::AnonymousAuthenticator};
//! use bucketftp::storage::object_store::{GatewayConfig, ObjectStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = GatewayConfig::new("https://store.example.com", "service-key");
//!     let server = Server::new(Box::new(move |grant| {
//!         ObjectStorage::new(gateway.clone(), &grant.root).unwrap()
//!     }))
//!     .greeting("Welcome to my FTP server")
//!     .passive_ports(50000..=65535)
//!     .authenticator(Arc::new(AnonymousAuthenticator::new("my-bucket")));
//!
//!     server.listen("127.0.0.1:2121").await.unwrap();
//! }
//! ```

pub mod auth;
pub mod notification;
pub(crate) mod server;
pub mod storage;

pub use crate::server::ftpserver::{error::ServerError, Server};
pub use crate::server::options;
pub use crate::server::shutdown;

/// The boxed error type used as an error source throughout the crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
