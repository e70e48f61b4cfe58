//! The RFC 959 Rename From (`RNFR`) command

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
pub struct Rnfr {
    file: PathBuf,
}

impl Rnfr {
    pub fn new(file: PathBuf) -> Self {
        Rnfr { file }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Rnfr
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
        let resolved = resolve_virtual(&cwd, &self.file.to_string_lossy());
        // The source must exist before we promise a rename.
        match storage.metadata(&resolved).await {
            Ok(_) => {
                let mut session = args.session.lock().await;
                session.rename_from = Some(resolved);
                Ok(Reply::new(ReplyCode::FileActionPending, "Ready for destination name"))
            }
            Err(err) => Ok(reply_for_storage_error(&err)),
        }
    }
}
