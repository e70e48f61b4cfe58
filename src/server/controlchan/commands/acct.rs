//! The RFC 959 Account (`ACCT`) command
//
// Accepted for syntax compatibility; this server keeps no accounts beyond
// the username, so the command is not implemented.

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
pub struct Acct;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Acct
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, _args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        Ok(Reply::new(ReplyCode::CommandNotImplemented, "ACCT not implemented"))
    }
}
