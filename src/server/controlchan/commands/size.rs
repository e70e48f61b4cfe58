//! The RFC 3659 File Size (`SIZE`) command

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
pub struct Size {
    file: PathBuf,
}

impl Size {
    pub fn new(file: PathBuf) -> Self {
        Size { file }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Size
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
        match storage.metadata(&resolved).await {
            Ok(metadata) if metadata.is_file() => Ok(Reply::new_with_string(ReplyCode::FileStatus, metadata.len().to_string())),
            Ok(_) => Ok(Reply::new(ReplyCode::FileError, "Not a regular file")),
            Err(err) => Ok(reply_for_storage_error(&err)),
        }
    }
}
