//! The RFC 959 Help (`HELP`) command
//
// With an argument the syntax and description of that directive are
// returned; without one, a column formatted list of everything in the
// registry.

use super::registry;
use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

// Directives per row in the no-argument listing.
const COLUMNS: usize = 6;

#[derive(Debug)]
pub struct Help {
    subject: Option<String>,
}

impl Help {
    pub fn new(subject: Option<String>) -> Self {
        Help { subject }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Help
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, _args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        match &self.subject {
            Some(subject) => match registry::lookup(&subject.to_uppercase()) {
                Some(spec) => Ok(Reply::new_multiline(
                    ReplyCode::HelpMessage,
                    vec![format!("Syntax: {}", spec.syntax_line()), spec.description.to_string()],
                )),
                None => Ok(Reply::new_with_string(
                    ReplyCode::ParameterSyntaxError,
                    format!("Unknown command: {}", subject),
                )),
            },
            None => {
                let mut lines = vec!["The following commands are recognized:".to_string()];
                let directives: Vec<&str> = registry::all().iter().map(|spec| spec.directive).collect();
                for row in directives.chunks(COLUMNS) {
                    lines.push(row.iter().map(|d| format!(" {:<5}", d)).collect::<String>());
                }
                lines.push("Help OK".to_string());
                Ok(Reply::new_multiline(ReplyCode::SystemStatus, lines))
            }
        }
    }
}
