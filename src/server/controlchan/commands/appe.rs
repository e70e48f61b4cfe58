//! The RFC 959 Append (`APPE`) command
//
// STOR with append semantics: the transferred bytes land after the existing
// content of the object instead of replacing it.

use super::storage_of;
use crate::{
    server::{
        chancomms::DataChanCmd,
        controlchan::{
            command::Command,
            error::{ControlChanError, ControlChanErrorKind},
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
    },
    storage::{resolve_virtual, Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Appe;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Appe
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let path = match &args.parsed_command {
            Command::Appe { path } => path.clone(),
            _ => return Err(ControlChanError::new(ControlChanErrorKind::IllegalState)),
        };
        if storage_of(&args.session).await.is_none() {
            return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate"));
        }
        let (cwd, tx, start) = {
            let mut session = args.session.lock().await;
            (session.cwd.clone(), session.data_cmd_tx.take(), session.start_pos)
        };
        let resolved = resolve_virtual(&cwd, &path);
        match tx {
            Some(tx) => {
                if let Err(err) = tx
                    .send(DataChanCmd::Appe {
                        path: resolved.to_string_lossy().to_string(),
                        start,
                    })
                    .await
                {
                    slog::warn!(args.logger, "APPE: could not notify data channel: {}", err);
                    return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"));
                }
                Ok(Reply::new(ReplyCode::FileStatusOkay, "Opening data connection"))
            }
            None => {
                slog::warn!(args.logger, "APPE: no data connection established for {:?}", resolved);
                Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"))
            }
        }
    }
}
