//! The RFC 959 Status (`STAT`) command
//
// Without a path: a short status of the session over the control channel.
// With a path: a single `ls` line for a file, or a long-listing block for a
// directory, also over the control channel.

use super::storage_of;
use crate::{
    server::{
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            reply_for_storage_error, Reply, ReplyCode,
        },
        listfmt,
    },
    storage::{resolve_virtual, Metadata, StorageBackend},
};
use async_trait::async_trait;
use chrono::Utc;

#[derive(Debug)]
pub struct Stat {
    path: Option<String>,
}

impl Stat {
    pub fn new(path: Option<String>) -> Self {
        Stat { path }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Stat
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let path = match &self.path {
            None => {
                let session = args.session.lock().await;
                let lines = vec![
                    "bucketftp server status:".to_string(),
                    format!("Connected from {}", args.peer_addr),
                    format!(
                        "Logged in as {}",
                        session.username.as_deref().unwrap_or("(not logged in)")
                    ),
                    format!("Working directory {}", session.cwd.display()),
                    "End of status".to_string(),
                ];
                return Ok(Reply::new_multiline(ReplyCode::SystemStatus, lines));
            }
            Some(path) => path.clone(),
        };

        let storage = match storage_of(&args.session).await {
            Some(storage) => storage,
            None => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate")),
        };
        let cwd = args.session.lock().await.cwd.clone();
        let resolved = resolve_virtual(&cwd, &path);

        let metadata = match storage.metadata(&resolved).await {
            Ok(metadata) => metadata,
            Err(err) => return Ok(reply_for_storage_error(&err)),
        };

        if metadata.is_file() {
            let fi = crate::storage::Fileinfo {
                path: resolved,
                metadata,
            };
            Ok(Reply::new_multiline(
                ReplyCode::DirectoryStatus,
                vec![format!("Status of {}:", path), listfmt::ls_line(&fi, Utc::now()), "End of status".to_string()],
            ))
        } else {
            match storage.list(&resolved, false).await {
                Ok(entries) => {
                    let now = Utc::now();
                    let mut lines = vec![format!("Status of {}:", path)];
                    lines.extend(entries.iter().map(|fi| listfmt::ls_line(fi, now)));
                    lines.push("End of status".to_string());
                    Ok(Reply::new_multiline(ReplyCode::FileStatus, lines))
                }
                Err(err) => Ok(reply_for_storage_error(&err)),
            }
        }
    }
}
