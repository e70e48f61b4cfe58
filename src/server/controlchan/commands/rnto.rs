//! The RFC 959 Rename To (`RNTO`) command
//
// The stored rename-from path is consumed whatever happens: success, storage
// failure or bad sequencing all clear it.

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
use std::path::PathBuf;

#[derive(Debug)]
pub struct Rnto {
    file: PathBuf,
}

impl Rnto {
    pub fn new(file: PathBuf) -> Self {
        Rnto { file }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Rnto
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let storage = match storage_of(&args.session).await {
            Some(storage) => storage,
            None => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate")),
        };
        let (cwd, from) = {
            let mut session = args.session.lock().await;
            (session.cwd.clone(), session.rename_from.take())
        };
        let from = match from {
            Some(from) => from,
            None => return Ok(Reply::new(ReplyCode::BadCommandSequence, "Issue RNFR first")),
        };
        let to = resolve_virtual(&cwd, &self.file.to_string_lossy());
        match storage.rename(&from, &to).await {
            Ok(()) => Ok(Reply::new_with_string(
                ReplyCode::FileActionOkay,
                format!("Renamed {} to {}", from.display(), to.display()),
            )),
            Err(err) => {
                slog::warn!(args.logger, "RNTO {:?} -> {:?} failed: {:?}", from, to, err);
                Ok(reply_for_storage_error(&err))
            }
        }
    }
}
