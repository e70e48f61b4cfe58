//! The RFC 959 List (`LIST`) command
//
// The listing is rendered on the control side so the 150 can tell the
// client how many entries are coming; the data loop then only pushes the
// bytes. The `-a` flag includes dot files, `-l` is accepted and ignored
// since the long format is what we produce anyway.

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
pub struct List;

#[async_trait]
impl<Storage> CommandHandler<Storage> for List
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let (flags, path) = match &args.parsed_command {
            Command::List { flags, path } => (flags.clone(), path.clone()),
            _ => return Err(ControlChanError::new(ControlChanErrorKind::IllegalState)),
        };
        let storage = match storage_of(&args.session).await {
            Some(storage) => storage,
            None => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate")),
        };
        let (cwd, format, facts, has_connector) = {
            let session = args.session.lock().await;
            (session.cwd.clone(), session.list_format, session.mlst_facts.clone(), session.has_data_connector())
        };
        if !has_connector {
            return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"));
        }

        let show_hidden = flags.iter().any(|f| f == "-a");
        let resolved = resolve_virtual(&cwd, path.as_deref().unwrap_or("."));

        let entries = match storage.list(&resolved, show_hidden).await {
            Ok(entries) => entries,
            Err(err) => {
                slog::warn!(args.logger, "LIST of {:?} failed: {:?}", resolved, err);
                return Ok(reply_for_storage_error(&err));
            }
        };
        let count = entries.len();
        let payload = listfmt::render_listing(&entries, format, &facts);

        let tx = args.session.lock().await.data_cmd_tx.take();
        match tx {
            Some(tx) => {
                if let Err(err) = tx.send(DataChanCmd::SendListing { payload }).await {
                    slog::warn!(args.logger, "LIST: could not notify data channel: {}", err);
                    return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"));
                }
                Ok(Reply::new_with_string(
                    ReplyCode::FileStatusOkay,
                    format!("Accepted data connection, returning {} file(s)", count),
                ))
            }
            None => Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established")),
        }
    }
}
