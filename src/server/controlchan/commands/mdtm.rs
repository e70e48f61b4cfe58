//! The RFC 3659 Modification Time (`MDTM`) command
//
// The query form reports `YYYYMMDDHHMMSS.sss` in UTC. The set-mtime form
// some clients send is acknowledged but performs nothing; the object store
// does not allow timestamps to be rewritten.

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
use chrono::{DateTime, Utc};
use std::path::PathBuf;

#[derive(Debug)]
pub struct Mdtm {
    file: PathBuf,
}

impl Mdtm {
    pub fn new(file: PathBuf) -> Self {
        Mdtm { file }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Mdtm
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
            Ok(metadata) => match metadata.modified() {
                Ok(modified) => {
                    let timestamp = DateTime::<Utc>::from(modified).format("%Y%m%d%H%M%S%.3f");
                    Ok(Reply::new_with_string(ReplyCode::FileStatus, timestamp.to_string()))
                }
                Err(err) => Ok(reply_for_storage_error(&err)),
            },
            Err(err) => Ok(reply_for_storage_error(&err)),
        }
    }
}

/// The `MDTM <timestamp> <path>` set-mtime form: accepted, not applied.
#[derive(Debug)]
pub struct MdtmSet {
    file: PathBuf,
}

impl MdtmSet {
    pub fn new(file: PathBuf) -> Self {
        MdtmSet { file }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for MdtmSet
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        slog::info!(args.logger, "MDTM set-mtime for {:?} acknowledged but not applied", self.file);
        Ok(Reply::new(ReplyCode::CommandOkay, "OK"))
    }
}
