//! The RFC 959 Passive (`PASV`) command
//
// This command requests the server-DTP to "listen" on a data port and to
// wait for a connection rather than initiate one upon receipt of a transfer
// command. The response includes the host and port this server is listening
// on, as four address octets and two port bytes.

use super::passive_common::start_passive_listener;
use crate::{
    server::{
        controlchan::{
            error::ControlChanError,
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
        ftpserver::options::PassiveHost,
    },
    storage::{Metadata, StorageBackend},
};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug)]
pub struct Pasv;

#[async_trait]
impl<Storage> CommandHandler<Storage> for Pasv
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&self, args: CommandContext<Storage>) -> Result<Reply, ControlChanError> {
        // The address we advertise must be IPv4; the dotted-octet reply
        // format knows nothing else. IPv6 clients use EPSV.
        let advertised: Ipv4Addr = match &args.passive_host {
            PassiveHost::Ip(ip) => *ip,
            PassiveHost::Resolver(resolve) => resolve(args.peer_addr.ip()),
            PassiveHost::FromConnection => match args.local_addr.ip() {
                IpAddr::V4(ip) => ip,
                IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
                    Some(ip) => ip,
                    None => {
                        slog::warn!(args.logger, "PASV on an IPv6 control connection; advise the client to use EPSV");
                        return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "PASV not available on IPv6, use EPSV"));
                    }
                },
            },
        };

        let port = match start_passive_listener(&args).await {
            Ok(port) => port,
            Err(err) => {
                slog::warn!(args.logger, "Could not open a passive listener: {}", err);
                return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No data connection established"));
            }
        };

        let octets = advertised.octets();
        let p1 = port >> 8;
        let p2 = port & 0xff;
        Ok(Reply::new_with_string(
            ReplyCode::EnteringPassiveMode,
            format!("PASV OK ({},{},{},{},{},{})", octets[0], octets[1], octets[2], octets[3], p1, p2),
        ))
    }
}
