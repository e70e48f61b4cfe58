//! Contains the error type produced when starting the server.

use thiserror::Error;

/// The errors that can be returned when building or binding the
/// [`Server`](crate::Server).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The bind URL did not parse or resolve.
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),
    /// Something about the configuration does not add up.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The TLS certificate or key failed to load.
    #[error("could not load TLS material")]
    Tls(#[source] std::io::Error),
    /// Binding or accepting on the control port failed.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
