use crate::server::controlchan::{error::ControlChanError, event::Event, Reply};

use async_trait::async_trait;

// A chain of links, of which each may or may not handle the event, pass it on
// to the next link, or short circuit with a reply of its own.
#[async_trait]
pub(crate) trait ControlChanMiddleware: Send + Sync {
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError>;
}
