//! The RFC 959 Logout (`QUIT`) command
//
// This command terminates a USER and if file transfer is not
// in progress, the server closes the control connection.

use crate::{
    server::{
        chancomms::ControlChanMsg,
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Quit;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Quit
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        // The 221 goes out first; the exit message makes the loop close the
        // socket right after.
        if let Err(err) = args.tx_control_chan.send(ControlChanMsg::ExitControlLoop).await {
            slog::warn!(args.logger, "QUIT: could not send internal message to exit the control loop: {}", err);
        }
        Ok(Reply::new(ReplyCode::ClosingControlConnection, "Goodbye"))
    }
}
