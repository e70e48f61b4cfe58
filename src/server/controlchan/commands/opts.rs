//! The RFC 2389 Options (`OPTS`) command
//
// Three targets are understood: UTF8 ON/OFF toggles the session encoding,
// MLST narrows the facts that MLST/MLSD report, and LIST switches the long
// listing format between ls and EPLF.

use crate::{
    server::{
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
        options::ListFormat,
        session::{default_mlst_facts, TextEncoding},
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

/// The parameters that can be given to the `OPTS` command.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Opt {
    /// The client wants to toggle UTF-8 encoding for file paths and such.
    Utf8 {
        /// ON or OFF
        on: bool,
    },
    /// The client wants MLST/MLSD to report only these facts.
    MlstFacts {
        /// The requested fact names; unknown ones are dropped.
        facts: Vec<String>,
    },
    /// The client wants LIST output in another format.
    ListFormat {
        /// `-L` for ls, `-E` for EPLF.
        format: ListFormat,
    },
}

#[derive(Debug)]
pub struct Opts {
    option: Opt,
}

impl Opts {
    pub fn new(option: Opt) -> Self {
        Opts { option }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Opts
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        match &self.option {
            Opt::Utf8 { on: true } => {
                session.encoding = TextEncoding::Utf8;
                Ok(Reply::new(ReplyCode::CommandOkay, "UTF8 mode enabled"))
            }
            Opt::Utf8 { on: false } => {
                session.encoding = TextEncoding::Ascii;
                Ok(Reply::new(ReplyCode::CommandOkay, "UTF8 mode disabled"))
            }
            Opt::MlstFacts { facts } => {
                let supported = default_mlst_facts();
                let accepted: Vec<String> = supported
                    .into_iter()
                    .filter(|known| facts.iter().any(|requested| requested.eq_ignore_ascii_case(known)))
                    .collect();
                let summary = accepted.iter().map(|f| format!("{};", f)).collect::<String>();
                session.mlst_facts = accepted;
                Ok(Reply::new_with_string(ReplyCode::CommandOkay, format!("MLST OPTS {}", summary)))
            }
            Opt::ListFormat { format } => {
                session.list_format = *format;
                Ok(Reply::new(ReplyCode::CommandOkay, "LIST format changed"))
            }
        }
    }
}
