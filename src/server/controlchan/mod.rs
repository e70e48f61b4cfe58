//! Contains the control channel: everything between the bytes a client sends
//! and the reply bytes it gets back.

pub mod auth;
pub mod codecs;
pub mod command;
pub mod commands;
pub mod control_loop;
pub mod error;
pub mod event;
pub mod handler;
pub mod line_parser;
pub mod log;
pub mod middleware;
pub mod reply;

pub use command::Command;
pub use control_loop::{spawn_loop, LoopConfig};
pub use event::Event;
pub use reply::{Reply, ReplyCode};

use crate::storage;

/// Maps a storage error onto the FTP reply the client should see. Error
/// sources are for the logs; only the generic message goes on the wire.
pub(crate) fn reply_for_storage_error(error: &storage::Error) -> Reply {
    use storage::ErrorKind::*;
    match error.kind() {
        TransientFileNotAvailable => Reply::new(ReplyCode::TransientFileError, "File not available"),
        PermanentFileNotAvailable => Reply::new(ReplyCode::FileError, "File not found"),
        PermissionDenied => Reply::new(ReplyCode::FileError, "Permission denied"),
        IsADirectory => Reply::new(ReplyCode::FileError, "Cannot retrieve a directory"),
        LocalError => Reply::new(ReplyCode::LocalError, "Local error"),
        InsufficientStorageSpaceError => Reply::new(ReplyCode::OutOfSpace, "Insufficient storage space"),
        ExceededStorageAllocationError => Reply::new(ReplyCode::ExceededStorageAllocation, "Exceeded storage allocation"),
        FileNameNotAllowedError => Reply::new(ReplyCode::BadFileName, "File name not allowed"),
        CommandNotImplemented => Reply::new(ReplyCode::CommandNotImplemented, "Command not implemented"),
    }
}
