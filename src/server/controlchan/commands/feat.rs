//! The RFC 2389 Feature (`FEAT`) command
//
// The feature block is rendered from the registry so that every advertised
// feature is guaranteed to have a dispatchable directive behind it.

use super::registry;
use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::{Metadata, StorageBackend, FEATURE_RESTART},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct Feat;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Feat
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        // Each feature line must be indented by a space.
        let mut feat_text: Vec<String> = registry::all()
            .iter()
            .filter_map(|spec| spec.feat)
            .filter(|feat| match *feat {
                "AUTH TLS" | "PBSZ" | "PROT" => args.tls_configured,
                "REST STREAM" => args.storage_features & FEATURE_RESTART > 0,
                _ => true,
            })
            .map(|feat| format!(" {}", feat))
            .collect();

        feat_text.push(" UTF8".to_string());
        if args.anonymous_enabled {
            feat_text.push(" ANON".to_string());
        }

        // Show them in alphabetical order.
        feat_text.sort_unstable();
        feat_text.insert(0, "Extensions supported:".to_string());
        feat_text.push("END".to_string());

        Ok(Reply::new_multiline(ReplyCode::SystemStatus, feat_text))
    }
}
