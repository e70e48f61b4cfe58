//! The RFC 2228 Data Channel Protection Level (`PROT`) command

use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

/// The data channel protection levels defined by RFC 2228.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtParam {
    /// `PROT C`: plaintext data channel.
    Clear,
    /// `PROT S`: integrity protected (unsupported).
    Safe,
    /// `PROT E`: confidentiality protected (unsupported).
    Confidential,
    /// `PROT P`: TLS protected data channel.
    Private,
}

#[derive(Debug)]
pub struct Prot {
    param: ProtParam,
}

impl Prot {
    pub fn new(param: ProtParam) -> Self {
        Prot { param }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Prot
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        match self.param {
            ProtParam::Clear => {
                session.data_tls = false;
                Ok(Reply::new(ReplyCode::CommandOkay, "Protection level Clear"))
            }
            ProtParam::Private => {
                session.data_tls = true;
                Ok(Reply::new(ReplyCode::CommandOkay, "Protection level Private"))
            }
            _ => Ok(Reply::new(ReplyCode::UnsupportedProtLevel, "Only Clear and Private are supported")),
        }
    }
}
