//! The RFC 959 User Name (`USER`) command
//
// The argument field is a Telnet string identifying the user.
// The user identification is that which is required by the
// server for access to its file system.

use crate::{
    server::{
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
        session::SessionState,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;

#[derive(Debug)]
pub struct User {
    username: String,
}

impl User {
    pub fn new(username: String) -> Self {
        User { username }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for User
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        // A USER while logged in drops the authentication and starts a new
        // login sequence.
        if session.state == SessionState::WaitCmd {
            session.storage = None;
            session.cwd = "/".into();
            session.rename_from = None;
        }
        session.username = Some(self.username.clone());
        session.state = SessionState::WaitPass;
        Ok(Reply::new_with_string(
            ReplyCode::NeedPassword,
            format!("Password required for {}", self.username),
        ))
    }
}
