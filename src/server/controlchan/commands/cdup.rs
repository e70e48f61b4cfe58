//! The RFC 959 Change To Parent Directory (`CDUP`) command
//
// Equivalent to `CWD ..`, clamped at the root like every other path.

use super::{quote_path, storage_of};
use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        reply_for_storage_error, Reply, ReplyCode,
    },
    storage::{resolve_virtual, Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Cdup;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Cdup
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let storage = match storage_of(&args.session).await {
            Some(storage) => storage,
            None => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate")),
        };
        let cwd = args.session.lock().await.cwd.clone();
        let resolved = resolve_virtual(&cwd, "..");
        match storage.cwd(&resolved).await {
            Ok(()) => {
                let mut session = args.session.lock().await;
                session.cwd = resolved.clone();
                Ok(Reply::new_with_string(
                    ReplyCode::FileActionOkay,
                    format!("Directory changed to {}", quote_path(&resolved)),
                ))
            }
            Err(err) => Ok(reply_for_storage_error(&err)),
        }
    }
}
