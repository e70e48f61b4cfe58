//! The RFC 3659 Restart of Interrupted Transfer (`REST`) command
//
// Sets the byte offset at which the next STOR, RETR or APPE starts. The
// offset applies to exactly one transfer and is reset when it finishes,
// whatever its outcome.

use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend, FEATURE_RESTART},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Rest {
    offset: u64,
}

impl Rest {
    pub fn new(offset: u64) -> Self {
        Rest { offset }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Rest
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        if args.storage_features & FEATURE_RESTART == 0 {
            return Ok(Reply::new(ReplyCode::CommandNotImplemented, "Restarts are not supported by the storage back-end"));
        }
        let mut session = args.session.lock().await;
        session.start_pos = self.offset;
        Ok(Reply::new_with_string(
            ReplyCode::FileActionPending,
            format!("Restarting next transfer at {}", self.offset),
        ))
    }
}
