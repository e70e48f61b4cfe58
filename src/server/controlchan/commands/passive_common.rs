//! Contains shared code for the PASV and EPSV commands: allocating a port,
//! listening for exactly one inbound data connection, validating its peer
//! and handing it to the data loop.

use crate::{
    server::{
        chancomms::{ControlChanMsg, DataChanCmd},
        controlchan::handler::CommandContext,
        datachan,
        session::SharedSession,
    },
    storage::{Metadata, StorageBackend},
};
use std::time::Duration;
use tokio::sync::mpsc::{channel, Receiver, Sender};

// How long the passive listener waits for the client before tearing itself
// down.
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

// Modifies the session by adding the channels that connect the control loop
// to the data connection processing loop.
pub(crate) async fn setup_inter_loop_comms<S>(session: SharedSession<S>, control_loop_tx: Sender<ControlChanMsg>)
where
    S: StorageBackend + 'static,
    S::Metadata: Metadata,
{
    let (cmd_tx, cmd_rx): (Sender<DataChanCmd>, Receiver<DataChanCmd>) = channel(1);
    let (data_abort_tx, data_abort_rx): (Sender<()>, Receiver<()>) = channel(1);

    let mut session = session.lock().await;
    session.data_cmd_tx = Some(cmd_tx);
    session.data_cmd_rx = Some(cmd_rx);
    session.data_abort_tx = Some(data_abort_tx);
    session.data_abort_rx = Some(data_abort_rx);
    session.control_msg_tx = Some(control_loop_tx);
}

// Binds a listener on a pooled passive port and spawns the task that waits
// for the single inbound data connection. Returns the chosen port, or an
// error when the passive range is exhausted.
pub(crate) async fn start_passive_listener<S>(args: &CommandContext<S>) -> std::io::Result<u16>
where
    S: StorageBackend + 'static,
    S::Metadata: Metadata,
{
    let (listener, lease) = args.port_pool.bind(args.local_addr.ip()).await?;
    let port = lease.port();

    setup_inter_loop_comms(args.session.clone(), args.tx_control_chan.clone()).await;

    let session = args.session.clone();
    let logger = args.logger.clone();
    let control_ip = args.peer_addr.ip();
    let tx = args.tx_control_chan.clone();

    // Open the data connection in a new task and process it. We cannot await
    // this since we first need to let the client know where to connect.
    tokio::spawn(async move {
        let accepted = tokio::time::timeout(ACCEPT_TIMEOUT, listener.accept()).await;
        match accepted {
            Ok(Ok((socket, peer))) => {
                if !datachan::peers_match(control_ip, peer.ip()) {
                    slog::warn!(logger, "Data connection from {} does not match control peer {}; rejecting", peer, control_ip);
                    drop(socket);
                    abandon_connector(&session, &tx, &logger).await;
                } else {
                    datachan::spawn_processing(logger, session, socket).await;
                }
            }
            Ok(Err(e)) => {
                slog::error!(logger, "Error waiting for data connection: {}", e);
                abandon_connector(&session, &tx, &logger).await;
            }
            Err(_) => {
                slog::warn!(logger, "Client did not connect to the data port in time");
                abandon_connector(&session, &tx, &logger).await;
            }
        }
        // The lease drops here, putting the port back in the pool.
        drop(lease);
    });

    Ok(port)
}

// Clears the connector on a session whose data connection never came. When a
// transfer command is already pending its 425 comes from the timeout
// message.
async fn abandon_connector<S>(session: &SharedSession<S>, tx: &Sender<ControlChanMsg>, logger: &slog::Logger)
where
    S: StorageBackend + 'static,
    S::Metadata: Metadata,
{
    let transfer_pending = {
        let mut session = session.lock().await;
        let pending = session.data_cmd_tx.is_none() && session.data_cmd_rx.is_some();
        session.clear_data_comms();
        pending
    };
    if transfer_pending {
        if let Err(err) = tx.send(ControlChanMsg::DataConnectionTimeout).await {
            slog::warn!(logger, "Could not notify control loop of data connection timeout: {}", err);
        }
    }
}
