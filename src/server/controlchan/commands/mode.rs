//! The RFC 959 Transfer Mode (`MODE`) command
//
// Only Stream mode is supported; Block and Compressed died with the
// mainframes.

use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

/// The transfer modes defined by RFC 959.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ModeParam {
    /// Data is sent as a stream of bytes.
    Stream,
    /// Data is sent as a series of blocks (unsupported).
    Block,
    /// Data is compressed with a run-length encoding (unsupported).
    Compressed,
}

#[derive(Debug)]
pub struct Mode {
    mode: ModeParam,
}

impl Mode {
    pub fn new(mode: ModeParam) -> Self {
        Mode { mode }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Mode
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, _args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        match self.mode {
            ModeParam::Stream => Ok(Reply::new(ReplyCode::CommandOkay, "Using Stream transfer mode")),
            _ => Ok(Reply::new(ReplyCode::CommandNotImplementedForParameter, "Only Stream transfer mode is supported")),
        }
    }
}
