use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// The error type returned by the control channel line parser.
#[derive(Debug, Error)]
#[error("parse error: {kind}")]
pub struct ParseError {
    kind: ParseErrorKind,
}

impl ParseError {
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> ParseError {
        ParseError { kind }
    }
}

/// A list specifying the ways in which a command line can fail to parse.
#[derive(Debug, PartialEq, Eq, derive_more::Display)]
pub enum ParseErrorKind {
    /// The line contained a byte sequence that is not valid UTF-8.
    #[display(fmt = "non UTF-8 character in command")]
    InvalidUtf8,
    /// The line was empty after sanitizing.
    #[display(fmt = "empty command line")]
    EmptyLine,
    /// The line exceeded the 512 byte limit of RFC 959.
    #[display(fmt = "command line too long")]
    LineTooLong,
    /// The directive token contained non-letters or was longer than four
    /// characters.
    #[display(fmt = "invalid directive token")]
    InvalidDirective,
    /// The directive is known but its parameters are missing or malformed.
    #[display(fmt = "invalid command parameters")]
    InvalidCommand,
    /// EPRT named a network protocol other than 1 (IPv4) or 2 (IPv6).
    #[display(fmt = "unsupported network protocol")]
    UnsupportedProtocol,
}

impl From<std::str::Utf8Error> for ParseError {
    fn from(_: std::str::Utf8Error) -> ParseError {
        ParseErrorKind::InvalidUtf8.into()
    }
}

impl From<std::string::FromUtf8Error> for ParseError {
    fn from(_: std::string::FromUtf8Error) -> ParseError {
        ParseErrorKind::InvalidUtf8.into()
    }
}

impl From<std::num::ParseIntError> for ParseError {
    fn from(_: std::num::ParseIntError) -> ParseError {
        ParseErrorKind::InvalidCommand.into()
    }
}
