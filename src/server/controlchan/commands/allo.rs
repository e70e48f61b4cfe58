//! The RFC 959 Allocate (`ALLO`) command
//
// Storage allocation means nothing on an object store; kept as a no-op for
// clients that still send it.

use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Allo;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Allo
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, _args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        Ok(Reply::new(ReplyCode::CommandOkayNotImplemented, "No storage allocation necessary"))
    }
}
