//! The RFC 959 Representation Type (`TYPE`) command
//
// The type is tracked per session but has no effect on the bytes: ascii
// transfers are byte-for-byte identical to binary ones, which is what most
// real world servers do.

use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

/// The transfer representation types we understand.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TypeParam {
    /// `TYPE A`: ascii. Accepted, treated as binary.
    Ascii,
    /// `TYPE I` and `TYPE L 8`: image/binary.
    Binary,
}

#[derive(Debug)]
pub struct Type {
    type_param: TypeParam,
}

impl Type {
    pub fn new(type_param: TypeParam) -> Self {
        Type { type_param }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Type
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        session.transfer_type = self.type_param;
        let reply = match self.type_param {
            TypeParam::Ascii => Reply::new(ReplyCode::CommandOkay, "Switching to ASCII mode"),
            TypeParam::Binary => Reply::new(ReplyCode::CommandOkay, "Switching to binary mode"),
        };
        Ok(reply)
    }
}
