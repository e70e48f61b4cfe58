//! The RFC 2428 Extended Data Port (`EPRT`) command
//
// The |proto|addr|port| form of PORT. Protocol numbers other than 1 (IPv4)
// and 2 (IPv6) were already refused by the parser with a 522.

use super::port::connect_active;
use crate::{
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;
use std::net::SocketAddr;

#[derive(Debug)]
pub struct Eprt {
    addr: SocketAddr,
}

impl Eprt {
    pub fn new(addr: SocketAddr) -> Self {
        Eprt { addr }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Eprt
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        connect_active(args, self.addr, "EPRT").await
    }
}
