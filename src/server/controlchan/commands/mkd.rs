//! The RFC 959 Make Directory (`MKD`) command
//
// On the object store this creates the zero byte placeholder object that
// marks the directory's existence.

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
use std::path::PathBuf;

#[derive(Debug)]
pub struct Mkd {
    path: PathBuf,
}

impl Mkd {
    pub fn new(path: PathBuf) -> Self {
        Mkd { path }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Mkd
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
        let resolved = resolve_virtual(&cwd, &self.path.to_string_lossy());
        match storage.mkd(&resolved).await {
            Ok(()) => Ok(Reply::new_with_string(ReplyCode::DirCreated, format!("{} created", quote_path(&resolved)))),
            Err(err) => {
                slog::warn!(args.logger, "MKD {:?} failed: {:?}", resolved, err);
                Ok(reply_for_storage_error(&err))
            }
        }
    }
}
