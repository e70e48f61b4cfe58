//! The RFC 959 Name List (`NLST`) command
//
// LIST's terse sibling: one bare name per line over the data connection.

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
        listfmt,
    },
    storage::{resolve_virtual, Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Nlst;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Nlst
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let path = match &args.parsed_command {
            Command::Nlst { path } => path.clone(),
            _ => return Err(ControlChanError::new(ControlChanErrorKind::IllegalState)),
        };
        let storage = match storage_of(&args.session).await {
            Some(storage) => storage,
            None => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate")),
        };
        let (cwd, has_connector) = {
            let session = args.session.lock().await;
            (session.cwd.clone(), session.has_data_connector())
        };
        if !has_connector {
            return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"));
        }
        let resolved = resolve_virtual(&cwd, path.as_deref().unwrap_or("."));

        let entries = match storage.list(&resolved, false).await {
            Ok(entries) => entries,
            Err(err) => {
                slog::warn!(args.logger, "NLST of {:?} failed: {:?}", resolved, err);
                return Ok(reply_for_storage_error(&err));
            }
        };
        let payload = listfmt::render_names(&entries);

        let tx = args.session.lock().await.data_cmd_tx.take();
        match tx {
            Some(tx) => {
                if let Err(err) = tx.send(DataChanCmd::SendListing { payload }).await {
                    slog::warn!(args.logger, "NLST: could not notify data channel: {}", err);
                    return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"));
                }
                Ok(Reply::new(ReplyCode::FileStatusOkay, "Accepted data connection"))
            }
            None => Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established")),
        }
    }
}
