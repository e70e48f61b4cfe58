use crate::{
    auth::Authenticator,
    server::{
        chancomms::ControlChanMsg,
        controlchan::{command::Command, error::ControlChanError, Reply},
        ftpserver::options::PassiveHost,
        portpool::PortPool,
        session::SharedSession,
    },
    storage::{Metadata, StorageBackend},
};

use async_trait::async_trait;
use std::{net::SocketAddr, ops::RangeInclusive, sync::Arc};
use tokio::sync::mpsc::Sender;

/// The function that builds a storage backend for a freshly authenticated
/// session, from the grant the authenticator issued for it.
pub type StorageFactory<Storage> = dyn Fn(&crate::auth::LoginGrant) -> Storage + Send + Sync;

// Common interface for all handlers of `Command`s
#[async_trait]
pub(crate) trait CommandHandler<Storage>: Send + Sync + std::fmt::Debug
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError>;
}

/// Represents arguments passed to a `CommandHandler`
pub(crate) struct CommandContext<Storage>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata + Sync,
{
    pub parsed_command: Command,
    pub session: SharedSession<Storage>,
    pub authenticator: Arc<dyn Authenticator>,
    pub storage_factory: Arc<StorageFactory<Storage>>,
    pub tls_configured: bool,
    pub anonymous_enabled: bool,
    pub passive_ports: RangeInclusive<u16>,
    pub passive_host: PassiveHost,
    pub port_pool: Arc<PortPool>,
    pub tx_control_chan: Sender<ControlChanMsg>,
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
    pub storage_features: u32,
    pub logger: slog::Logger,
}
