//! The RFC 959 Retrieve (`RETR`) command
//
// This command causes the server-DTP to transfer a copy of the file
// specified in the pathname to the client over the data connection.

use super::storage_of;
use crate::{
    server::{
        chancomms::DataChanCmd,
        controlchan::{
            command::Command,
            error::{ControlChanError, ControlChanErrorKind},
            handler::{CommandContext, CommandHandler},
            reply_for_storage_error, Reply, ReplyCode,
        },
    },
    storage::{resolve_virtual, ErrorKind, Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Retr;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Retr
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let path = match &args.parsed_command {
            Command::Retr { path } => path.clone(),
            _ => return Err(ControlChanError::new(ControlChanErrorKind::IllegalState)),
        };
        let storage = match storage_of(&args.session).await {
            Some(storage) => storage,
            None => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate")),
        };
        let cwd = args.session.lock().await.cwd.clone();
        let resolved = resolve_virtual(&cwd, &path);

        // Directories can be listed but never retrieved.
        match storage.metadata(&resolved).await {
            Ok(metadata) if metadata.is_dir() => {
                return Ok(Reply::new(ReplyCode::FileError, "Cannot retrieve a directory"));
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::PermanentFileNotAvailable => return Ok(reply_for_storage_error(&err)),
            // Backends that cannot stat cheaply still get to try the read.
            Err(_) => {}
        }

        let (tx, start) = {
            let mut session = args.session.lock().await;
            (session.data_cmd_tx.take(), session.start_pos)
        };
        match tx {
            Some(tx) => {
                let logger = args.logger;
                if let Err(err) = tx
                    .send(DataChanCmd::Retr {
                        path: resolved.to_string_lossy().to_string(),
                        start,
                    })
                    .await
                {
                    slog::warn!(logger, "RETR: could not notify data channel: {}", err);
                    return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"));
                }
                Ok(Reply::new(ReplyCode::FileStatusOkay, "Opening data connection"))
            }
            None => {
                slog::warn!(args.logger, "RETR: no data connection established for {:?}", resolved);
                Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"))
            }
        }
    }
}
