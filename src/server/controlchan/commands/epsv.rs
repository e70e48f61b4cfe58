//! The RFC 2428 Extended Passive (`EPSV`) command
//
// Like PASV, but the reply only carries the TCP port, which makes it work
// for IPv6 and NAT setups alike.

use super::passive_common::start_passive_listener;
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
pub struct Epsv;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Epsv
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let port = match start_passive_listener(&args).await {
            Ok(port) => port,
            Err(err) => {
                slog::warn!(args.logger, "Could not open a passive listener: {}", err);
                return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No data connection established"));
            }
        };
        Ok(Reply::new_with_string(
            ReplyCode::EnteringExtendedPassiveMode,
            format!("EPSV OK (|||{}|)", port),
        ))
    }
}
