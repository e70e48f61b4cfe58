//! The dispatch gate: applies the registry, blacklist/whitelist and
//! authentication rules before a command reaches its handler.

use crate::server::{
    controlchan::{
        command::Command,
        commands::registry,
        error::{ControlChanError, ControlChanErrorKind},
        event::Event,
        middleware::ControlChanMiddleware,
        Reply, ReplyCode,
    },
    session::{SessionState, SharedSession},
};
use crate::storage::{Metadata, StorageBackend};

use async_trait::async_trait;

// GateMiddleware rejects commands that are not in the registry, that the
// server or login grant denied, or that require authentication the session
// does not have. It also enforces the per-session command rate limit.
pub struct GateMiddleware<Storage, Next>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
    Next: ControlChanMiddleware,
{
    pub session: SharedSession<Storage>,
    pub next: Next,
}

#[async_trait]
impl<Storage, Next> ControlChanMiddleware for GateMiddleware<Storage, Next>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
    Next: ControlChanMiddleware,
{
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError> {
        let command = match &event {
            Event::InternalMsg(_) => return self.next.handle(event).await,
            Event::Command(command) => command.clone(),
        };

        let directive = command.directive().to_string();
        let denied = {
            let mut session = self.session.lock().await;

            if !session.cmd_rate.record() {
                return Err(ControlChanErrorKind::RateLimitExceeded.into());
            }

            let spec = match command {
                Command::Other { .. } => None,
                _ => registry::lookup(&directive),
            };

            let blacklisted = session.blacklist.iter().any(|d| d.eq_ignore_ascii_case(&directive));
            let not_whitelisted = !session.whitelist.is_empty() && !session.whitelist.iter().any(|d| d.eq_ignore_ascii_case(&directive));

            match spec {
                None => Some(Reply::new_with_string(
                    ReplyCode::CommandNotImplemented,
                    format!("Command not allowed: {}", directive),
                )),
                Some(_) if blacklisted || not_whitelisted => Some(Reply::new_with_string(
                    ReplyCode::CommandNotImplemented,
                    format!("Command not allowed: {}", directive),
                )),
                Some(spec) if !spec.no_auth && session.state != SessionState::WaitCmd => {
                    Some(Reply::new(ReplyCode::NotLoggedIn, "Please authenticate"))
                }
                Some(_) => None,
            }
        };

        let result = match denied {
            Some(reply) => Ok(reply),
            None => self.next.handle(event).await,
        };

        // Record the dispatched command so sequenced commands (RNTO after
        // RNFR) can verify their predecessor.
        let mut session = self.session.lock().await;
        session.previous_command = Some(command);

        result
    }
}
