//! The RFC 959 Store Unique (`STOU`) command
//
// A STOR under a server-chosen name: the suggested name gets a timestamp
// and a random suffix spliced in before the extension.

use super::storage_of;
use crate::{
    server::{
        chancomms::DataChanCmd,
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
    },
    storage::{resolve_virtual, unique_name, Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Stou {
    path: Option<String>,
}

impl Stou {
    pub fn new(path: Option<String>) -> Self {
        Stou { path }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Stou
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        if storage_of(&args.session).await.is_none() {
            return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate"));
        }
        let suggested = self.path.clone().unwrap_or_else(|| "file".to_string());
        let name = unique_name(&suggested);

        let (cwd, tx, start) = {
            let mut session = args.session.lock().await;
            (session.cwd.clone(), session.data_cmd_tx.take(), session.start_pos)
        };
        let resolved = resolve_virtual(&cwd, &name);
        match tx {
            Some(tx) => {
                if let Err(err) = tx
                    .send(DataChanCmd::Stor {
                        path: resolved.to_string_lossy().to_string(),
                        start,
                    })
                    .await
                {
                    slog::warn!(args.logger, "STOU: could not notify data channel: {}", err);
                    return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"));
                }
                Ok(Reply::new_with_string(ReplyCode::FileStatusOkay, format!("FILE: {}", name)))
            }
            None => {
                slog::warn!(args.logger, "STOU: no data connection established for {:?}", resolved);
                Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"))
            }
        }
    }
}
