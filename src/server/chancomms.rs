//! Contains code pertaining to the communication between the data and
//! control channels.

use crate::storage;

use std::fmt;

// The transfer the data loop should perform. Paths are resolved, absolute
// virtual paths; the data loop passes them to the storage backend untouched
// and echoes them in completion messages.
#[derive(PartialEq, Eq, Debug)]
pub enum DataChanCmd {
    Retr {
        /// The file the client would like to retrieve.
        path: String,
        /// The REST offset in effect when the command was issued.
        start: u64,
    },
    Stor {
        /// The file the client would like to store.
        path: String,
        /// The REST offset in effect when the command was issued.
        start: u64,
    },
    Appe {
        /// The file the client would like to append to.
        path: String,
        /// The REST offset in effect when the command was issued.
        start: u64,
    },
    /// A directory listing that was already rendered on the control side;
    /// the data loop only has to push the bytes and close.
    SendListing {
        /// The rendered listing, one CRLF terminated line per entry.
        payload: Vec<u8>,
    },
}

/// Messages that can be sent to the control channel loop.
#[derive(Debug)]
pub enum ControlChanMsg {
    /// Data was successfully sent to the client during a RETR.
    SentData {
        /// The path as resolved for the client
        path: String,
        /// The number of bytes transferred
        bytes: u64,
    },
    /// We've written the data from the client to the storage backend.
    WrittenData {
        /// The path as resolved for the client
        path: String,
        /// The number of bytes transferred
        bytes: u64,
    },
    /// A RETR failed against the storage backend.
    RetrFailed {
        /// The path as resolved for the client
        path: String,
        /// What went wrong
        error: storage::Error,
    },
    /// A STOR or APPE failed against the storage backend.
    StorFailed {
        /// The path as resolved for the client
        path: String,
        /// What went wrong
        error: storage::Error,
    },
    /// The transfer was cut short by an ABOR from the client.
    TransferAborted,
    /// The data connection was unexpectedly closed.
    ConnectionReset,
    /// The client never connected to the data port.
    DataConnectionTimeout,
    /// Listed the directory successfully.
    DirectorySuccessfullyListed,
    /// Failed to push the directory listing over the data connection.
    DirectoryListFailure,
    /// A client authenticated successfully.
    LoggedIn {
        /// The username that logged in
        username: String,
    },
    /// Quit the client connection.
    ExitControlLoop,
    /// Sent to switch the control channel to TLS mode.
    SecureControlChannel,
}

impl fmt::Display for ControlChanMsg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
