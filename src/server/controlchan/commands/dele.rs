//! The RFC 959 Delete File (`DELE`) command
//
// On this virtual filesystem DELE also removes directories: the contents go
// first, recursively, then the placeholder object.

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
pub struct Dele {
    path: String,
}

impl Dele {
    pub fn new(path: String) -> Self {
        Dele { path }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Dele
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
        match storage.del(&resolved).await {
            Ok(()) => Ok(Reply::new_with_string(
                ReplyCode::FileActionOkay,
                format!("Removed {}", resolved.display()),
            )),
            Err(err) => {
                slog::warn!(args.logger, "DELE {:?} failed: {:?}", resolved, err);
                Ok(reply_for_storage_error(&err))
            }
        }
    }
}
