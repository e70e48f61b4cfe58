//! The RFC 959 Abort (`ABOR`) command
//
// Tells the server to abort the previous FTP service command and any
// associated transfer of data. The control connection is never closed by
// this; the data connection gets the 426 and is torn down.

use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Abor;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Abor
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let abort_tx = {
            let mut session = args.session.lock().await;
            if session.data_abort_rx.is_some() {
                // The connector exists but its data loop never started
                // because the client never connected. Nothing is in flight;
                // tear down and carry on.
                session.clear_data_comms();
                None
            } else {
                // None here means no connector at all; Some means the data
                // loop holds the receiving end and will act on the signal.
                session.data_abort_tx.take()
            }
        };

        match abort_tx {
            Some(tx) => {
                if let Err(err) = tx.send(()).await {
                    slog::warn!(args.logger, "ABOR: data loop is already gone: {}", err);
                    let mut session = args.session.lock().await;
                    session.clear_data_comms();
                    return Ok(Reply::new(ReplyCode::DataConnectionOpen, "No transfer to abort"));
                }
                // The 226 follows from the data loop's TransferAborted
                // message once the 426 went out on the data socket.
                Ok(Reply::none())
            }
            None => Ok(Reply::new(ReplyCode::DataConnectionOpen, "No transfer to abort")),
        }
    }
}
