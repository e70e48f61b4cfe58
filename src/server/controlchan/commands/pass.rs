//! The RFC 959 Password (`PASS`) command
//
// The argument field is a Telnet string specifying the user's
// password.  This command must be immediately preceded by the
// user name command, and, for some sites, completes the user's
// identification for access control.

use crate::{
    auth::Credentials,
    server::{
        chancomms::ControlChanMsg,
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
        password::Password,
        session::SessionState,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct Pass {
    password: Password,
}

impl Pass {
    pub fn new(password: Password) -> Self {
        Pass { password }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Pass
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let (state, username) = {
            let session = args.session.lock().await;
            (session.state, session.username.clone())
        };
        let username = match (state, username) {
            (SessionState::WaitPass, Some(username)) => username,
            _ => return Ok(Reply::new(ReplyCode::BadCommandSequence, "Please supply a username first")),
        };

        let credentials = Credentials {
            password: Some(self.password.as_ref().to_string()),
            source_ip: args.peer_addr.ip(),
        };

        match args.authenticator.authenticate(&username, &credentials).await {
            Ok(grant) => {
                let storage = (args.storage_factory)(&grant);
                let mut session = args.session.lock().await;
                session.storage = Some(Arc::new(storage));
                session.cwd = grant.cwd.clone();
                session.blacklist.extend(grant.blacklist.iter().map(|d| d.to_uppercase()));
                session.whitelist.extend(grant.whitelist.iter().map(|d| d.to_uppercase()));
                session.state = SessionState::WaitCmd;
                drop(session);

                let logger = args.logger;
                if let Err(err) = args.tx_control_chan.send(ControlChanMsg::LoggedIn { username: username.clone() }).await {
                    slog::warn!(logger, "Could not notify control channel of login: {}", err);
                }
                Ok(Reply::new(ReplyCode::UserLoggedIn, "User logged in, proceed"))
            }
            Err(err) => {
                slog::warn!(args.logger, "Failed login for {}: {}", username, err);
                let mut session = args.session.lock().await;
                // RFC 959: a failed PASS returns the session to the start of
                // the login sequence.
                session.state = SessionState::New;
                session.username = None;
                Ok(Reply::new(ReplyCode::NotLoggedIn, "Authentication failed"))
            }
        }
    }
}
