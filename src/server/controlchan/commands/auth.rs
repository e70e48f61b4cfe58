//! The RFC 2228 Authentication/Security Mechanism (`AUTH`) command
//
// The only mechanism we speak is TLS. After the 234 goes out the control
// loop takes the raw socket back and runs the TLS handshake on it.

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

/// The security mechanisms a client can name in AUTH.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AuthParam {
    /// `AUTH TLS`, the one we support.
    Tls,
    /// `AUTH SSL`, the obsolete spelling; refused.
    Ssl,
}

#[derive(Debug)]
pub struct Auth {
    protocol: AuthParam,
}

impl Auth {
    pub fn new(protocol: AuthParam) -> Self {
        Auth { protocol }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Auth
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        match (args.tls_configured, self.protocol) {
            (true, AuthParam::Tls) => {
                if let Err(err) = args.tx_control_chan.send(ControlChanMsg::SecureControlChannel).await {
                    slog::warn!(args.logger, "AUTH: could not notify control loop of TLS upgrade: {}", err);
                    return Ok(Reply::new(ReplyCode::FailedSecurityCheck, "TLS upgrade failed"));
                }
                Ok(Reply::new(ReplyCode::AuthOkayNoDataNeeded, "Enabling TLS, begin negotiation"))
            }
            (true, AuthParam::Ssl) => Ok(Reply::new(ReplyCode::CommandNotImplementedForParameter, "Use AUTH TLS")),
            (false, _) => Ok(Reply::new(ReplyCode::FtpsRequired, "TLS is not configured on this server")),
        }
    }
}
