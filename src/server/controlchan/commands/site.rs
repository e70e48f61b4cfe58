//! The RFC 959 Site Parameters (`SITE`) command
//
// CHMOD is the only sub command we accept. Object stores have no permission
// bits, so the mode is validated, logged and dropped.

use super::storage_of;
use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{resolve_virtual, Metadata, StorageBackend},
};
use async_trait::async_trait;

/// A parsed SITE sub command.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SiteParam {
    /// `SITE CHMOD <octal mode> <path>`
    Chmod {
        /// The requested permission bits.
        mode: u32,
        /// The path to apply them to.
        path: String,
    },
    /// Any other sub command; refused.
    Other {
        /// The sub command name as sent.
        command: String,
    },
}

#[derive(Debug)]
pub struct Site {
    param: SiteParam,
}

impl Site {
    pub fn new(param: SiteParam) -> Self {
        Site { param }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Site
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        match &self.param {
            SiteParam::Chmod { mode, path } => {
                let storage = match storage_of(&args.session).await {
                    Some(storage) => storage,
                    None => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate")),
                };
                let cwd = args.session.lock().await.cwd.clone();
                let resolved = resolve_virtual(&cwd, path);
                slog::warn!(args.logger, "SITE CHMOD {:o} {:?} accepted but modes are not persisted", mode, resolved);
                match storage.chmod(&resolved, *mode).await {
                    Ok(()) => Ok(Reply::new(ReplyCode::CommandOkay, "CHMOD OK")),
                    Err(err) => Ok(crate::server::controlchan::reply_for_storage_error(&err)),
                }
            }
            SiteParam::Other { command } => Ok(Reply::new_with_string(
                ReplyCode::CommandNotImplementedForParameter,
                format!("SITE {} is not supported", command),
            )),
        }
    }
}
