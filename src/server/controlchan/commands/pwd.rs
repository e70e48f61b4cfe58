//! The RFC 959 Print Working Directory (`PWD`) command

use super::quote_path;
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
pub struct Pwd;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Pwd
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let session = args.session.lock().await;
        Ok(Reply::new_with_string(
            ReplyCode::DirCreated,
            format!("{} is the current directory", quote_path(&session.cwd)),
        ))
    }
}
