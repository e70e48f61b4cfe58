//! The RFC 959 Remove Directory (`RMD`) command
//
// Directories and files delete the same way on an object store, so RMD is
// DELE by another name.

use super::storage_of;
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
pub struct Rmd {
    path: String,
}

impl Rmd {
    pub fn new(path: String) -> Self {
        Rmd { path }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Rmd
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
        let resolved = resolve_virtual(&cwd, &self.path);
        match storage.rmd(&resolved).await {
            Ok(()) => Ok(Reply::new_with_string(
                ReplyCode::FileActionOkay,
                format!("Removed {}", resolved.display()),
            )),
            Err(err) => {
                slog::warn!(args.logger, "RMD {:?} failed: {:?}", resolved, err);
                Ok(reply_for_storage_error(&err))
            }
        }
    }
}
