//! The RFC 2228 Protection Buffer Size (`PBSZ`) command
//
// With TLS the only meaningful buffer size is 0; we accept and store what
// the client sends. Without TLS the command is superfluous.

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
pub struct Pbsz {
    size: u32,
}

impl Pbsz {
    pub fn new(size: u32) -> Self {
        Pbsz { size }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Pbsz
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if session.cmd_tls {
            session.pbsz = self.size;
            Ok(Reply::new(ReplyCode::CommandOkay, "PBSZ=0"))
        } else {
            Ok(Reply::new(ReplyCode::CommandOkayNotImplemented, "PBSZ is superfluous without TLS"))
        }
    }
}
