//! The RFC 959 Data Port (`PORT`) command
//
// The client names an endpoint it is listening on and we connect out to it.
// Endpoints that do not belong to the control connection's peer are refused;
// we will not be talked into connecting somewhere else.

use super::passive_common::setup_inter_loop_comms;
use crate::{
    server::{
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
        datachan,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr, SocketAddrV4};
use tokio::net::TcpStream;

#[derive(Debug)]
pub struct Port {
    addr: SocketAddrV4,
}

impl Port {
    pub fn new(addr: SocketAddrV4) -> Self {
        Port { addr }
    }
}

#[async_trait]
impl<Storage> CommandHandler<Storage> for Port
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        connect_active(args, SocketAddr::V4(self.addr), "PORT").await
    }
}

// Shared by PORT and EPRT: validate the endpoint, connect, start the data
// loop on the established socket.
pub(crate) async fn connect_active<Storage>(args: CommandContext<Storage>, addr: SocketAddr, directive: &str) -> Result<Reply, ControlChanError>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    let control_ip: IpAddr = args.peer_addr.ip();
    if !datachan::peers_match(control_ip, addr.ip()) {
        slog::warn!(args.logger, "{} to {} refused; control peer is {}", directive, addr, control_ip);
        return Ok(Reply::new_with_string(
            ReplyCode::CommandSyntaxError,
            format!("Illegal {} address", directive),
        ));
    }

    match TcpStream::connect(addr).await {
        Ok(socket) => {
            setup_inter_loop_comms(args.session.clone(), args.tx_control_chan.clone()).await;
            datachan::spawn_processing(args.logger, args.session, socket).await;
            Ok(Reply::new_with_string(ReplyCode::CommandOkay, format!("{} command successful", directive)))
        }
        Err(err) => {
            slog::warn!(args.logger, "Could not connect to {} endpoint {}: {}", directive, addr, err);
            Ok(Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection"))
        }
    }
}
