//! Contains the `ControlChanError` struct that defines the control channel
//! error type.

use super::line_parser::{ParseError, ParseErrorKind};
use crate::BoxError;

use derive_more::Display;
use thiserror::Error;

/// The error type produced by the control channel event loop and the command
/// handlers. The kind tells the loop which reply to send and whether the
/// session survives.
#[derive(Debug, Error)]
#[error("control channel error: {kind}")]
pub struct ControlChanError {
    kind: ControlChanErrorKind,
    #[source]
    source: Option<BoxError>,
}

/// A list specifying categories of FTP control channel errors.
#[derive(Eq, PartialEq, Debug, Display)]
#[allow(dead_code)]
pub enum ControlChanErrorKind {
    /// We encountered a system IO error.
    #[display(fmt = "failed to perform IO")]
    IoError,
    /// Internal server error, i.e. a state that should be unreachable.
    #[display(fmt = "internal server error")]
    InternalServerError,
    /// The authentication backend returned an error.
    #[display(fmt = "something went wrong when trying to authenticate")]
    AuthenticationError,
    /// We encountered a non-UTF8 character in the command.
    #[display(fmt = "non-UTF8 character in command")]
    Utf8Error,
    /// The line was empty, too long, or its directive token was malformed.
    #[display(fmt = "invalid directive")]
    InvalidDirective,
    /// The client issued a command that we know about, but in an invalid way
    /// (e.g. `USER` without a username).
    #[display(fmt = "invalid command (invalid parameter)")]
    InvalidCommand,
    /// EPRT named a network protocol we do not speak.
    #[display(fmt = "unsupported network protocol")]
    UnsupportedNetworkProtocol,
    /// The idle timer on the control channel elapsed.
    #[display(fmt = "encountered read timeout on the control channel")]
    ControlChannelTimeout,
    /// The client exceeded the per-session command rate limit.
    #[display(fmt = "command rate limit exceeded")]
    RateLimitExceeded,
    /// The control channel is out of sync with the session, e.g. a RNTO
    /// without a preceding RNFR.
    #[display(fmt = "control channel in illegal state")]
    IllegalState,
}

impl ControlChanError {
    /// Creates a new control channel error with the specified kind
    pub fn new(kind: ControlChanErrorKind) -> Self {
        ControlChanError { kind, source: None }
    }

    /// Creates a new control channel error with a source error attached
    pub fn new_with_source<E>(kind: ControlChanErrorKind, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        ControlChanError {
            kind,
            source: Some(source.into()),
        }
    }

    /// Return the inner error kind of this error.
    pub fn kind(&self) -> &ControlChanErrorKind {
        &self.kind
    }
}

impl From<ControlChanErrorKind> for ControlChanError {
    fn from(kind: ControlChanErrorKind) -> ControlChanError {
        ControlChanError { kind, source: None }
    }
}

impl From<std::io::Error> for ControlChanError {
    fn from(err: std::io::Error) -> ControlChanError {
        ControlChanError::new_with_source(ControlChanErrorKind::IoError, err)
    }
}

impl From<ParseError> for ControlChanError {
    fn from(err: ParseError) -> ControlChanError {
        let kind = match err.kind() {
            ParseErrorKind::InvalidUtf8 => ControlChanErrorKind::Utf8Error,
            ParseErrorKind::EmptyLine | ParseErrorKind::LineTooLong | ParseErrorKind::InvalidDirective => ControlChanErrorKind::InvalidDirective,
            ParseErrorKind::InvalidCommand => ControlChanErrorKind::InvalidCommand,
            ParseErrorKind::UnsupportedProtocol => ControlChanErrorKind::UnsupportedNetworkProtocol,
        };
        ControlChanError::new_with_source(kind, err)
    }
}
