//! The RFC 3659 Machine List Object (`MLST`) command
//
// Unlike MLSD this reports a single object and does so on the control
// channel, as a 250 block with the fact line indented by one space.

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
    storage::{resolve_virtual, Fileinfo, Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Mlst {
    path: Option<String>,
}

impl Mlst {
    pub fn new(path: Option<String>) -> Self {
        Mlst { path }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Mlst
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let storage = match storage_of(&args.session).await {
            Some(storage) => storage,
            None => return Ok(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate")),
        };
        let (cwd, facts) = {
            let session = args.session.lock().await;
            (session.cwd.clone(), session.mlst_facts.clone())
        };
        let arg = self.path.clone().unwrap_or_else(|| ".".to_string());
        let resolved = resolve_virtual(&cwd, &arg);

        match storage.metadata(&resolved).await {
            Ok(metadata) => {
                let fi = Fileinfo {
                    path: resolved.clone(),
                    metadata,
                };
                let fact_line = listfmt::mlsd_line(&fi, &facts);
                Ok(Reply::new_multiline(
                    ReplyCode::FileActionOkay,
                    vec![format!("Listing {}", resolved.display()), format!(" {}", fact_line), "End".to_string()],
                ))
            }
            Err(err) => Ok(reply_for_storage_error(&err)),
        }
    }
}
