//! The RFC 959 File Structure (`STRU`) command
//
// Only the default File structure is supported.

use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

/// The file structures defined by RFC 959.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StruParam {
    /// "Regular" file structure, a stream of bytes.
    File,
    /// Files made up of records (unsupported).
    Record,
    /// Files made up of pages (unsupported).
    Page,
}

#[derive(Debug)]
pub struct Stru {
    structure: StruParam,
}

impl Stru {
    pub fn new(structure: StruParam) -> Self {
        Stru { structure }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Stru
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, _args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        match self.structure {
            StruParam::File => Ok(Reply::new(ReplyCode::CommandOkay, "File structure selected")),
            _ => Ok(Reply::new(ReplyCode::CommandNotImplementedForParameter, "Only File structure is supported")),
        }
    }
}
