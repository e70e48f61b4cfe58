//! Contains code pertaining to the FTP *data* channel: the loop that takes
//! one transfer command from the control side, moves the bytes between the
//! data socket and the storage backend, and reports how it went.

use super::chancomms::{ControlChanMsg, DataChanCmd};
use super::tls::FtpsConfig;
use crate::server::session::SharedSession;
use crate::storage::{Metadata, StorageBackend};

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_rustls::TlsAcceptor;

// How long a data connection may sit idle before we give up on ever getting
// a transfer command for it.
const DATA_CHANNEL_TIMEOUT_SECS: u64 = 5 * 60;

// The line we put on the data socket when a transfer is torn down by ABOR.
const ABORT_NOTICE: &[u8] = b"426 Connection closed; transfer aborted\r\n";

// The 426 on the data socket is best effort: a stalled or closed socket must
// not hold the abort handling hostage.
const ABORT_NOTICE_TIMEOUT: Duration = Duration::from_millis(500);

/// Tells whether a data connection peer is acceptable for a session whose
/// control connection came from `control`. The addresses must be equal after
/// normalization (IPv4-mapped IPv6 addresses compare as their IPv4 form); as
/// the one exception, two distinct loopback addresses match each other.
pub fn peers_match(control: IpAddr, data: IpAddr) -> bool {
    let control = normalize(control);
    let data = normalize(data);
    if control == data {
        return true;
    }
    control.is_loopback() && data.is_loopback()
}

fn normalize(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

struct DataCommandExecutor<Storage>
where
    Storage: StorageBackend,
    Storage::Metadata: Metadata,
{
    socket: tokio::net::TcpStream,
    control_msg_tx: Sender<ControlChanMsg>,
    storage: Arc<Storage>,
    ftps_mode: FtpsConfig,
    logger: slog::Logger,
}

impl<Storage> DataCommandExecutor<Storage>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn execute(self, cmd: DataChanCmd, abort_rx: &mut Receiver<()>) {
        let logger = self.logger.clone();
        let tx = self.control_msg_tx.clone();
        let storage = self.storage.clone();

        let stream: Box<dyn AsyncReadAsyncWriteSendUnpin> = match Self::maybe_tls(self.socket, self.ftps_mode, &logger).await {
            Some(stream) => stream,
            None => {
                if let Err(err) = tx.send(ControlChanMsg::ConnectionReset).await {
                    slog::error!(logger, "Could not notify control channel of TLS failure: {}", err);
                }
                return;
            }
        };
        let (rd, mut wr) = tokio::io::split(stream);

        let msg = match cmd {
            DataChanCmd::Retr { path, start } => Self::exec_retr(storage, path, start, &mut wr, abort_rx, &logger).await,
            DataChanCmd::Stor { path, start } => Self::exec_stor(storage, path, start, false, rd, &mut wr, abort_rx, &logger).await,
            DataChanCmd::Appe { path, start } => Self::exec_stor(storage, path, start, true, rd, &mut wr, abort_rx, &logger).await,
            DataChanCmd::SendListing { payload } => Self::exec_listing(payload, &mut wr, &logger).await,
        };

        match tokio::time::timeout(ABORT_NOTICE_TIMEOUT, wr.shutdown()).await {
            Ok(Err(err)) => slog::debug!(logger, "Could not shutdown data socket cleanly: {}", err),
            Err(_) => slog::debug!(logger, "Data socket shutdown timed out"),
            Ok(Ok(())) => {}
        }
        if let Err(err) = tx.send(msg).await {
            slog::error!(logger, "Could not notify control channel of transfer result: {}", err);
        }
    }

    async fn exec_retr<W>(
        storage: Arc<Storage>,
        path: String,
        start_pos: u64,
        output: &mut W,
        abort_rx: &mut Receiver<()>,
        logger: &slog::Logger,
    ) -> ControlChanMsg
    where
        W: AsyncWrite + Unpin + Sync + Send,
    {
        let outcome = tokio::select! {
            result = storage.get_into(path.clone(), start_pos, output) => Some(result),
            _ = abort_rx.recv() => None,
        };
        match outcome {
            Some(Ok(bytes)) => ControlChanMsg::SentData { path, bytes },
            Some(Err(error)) => {
                slog::warn!(logger, "Error copying streams during RETR: {}", error);
                ControlChanMsg::RetrFailed { path, error }
            }
            None => {
                slog::info!(logger, "RETR of {} aborted by client", path);
                let _ = tokio::time::timeout(ABORT_NOTICE_TIMEOUT, output.write_all(ABORT_NOTICE)).await;
                ControlChanMsg::TransferAborted
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn exec_stor<W>(
        storage: Arc<Storage>,
        path: String,
        start_pos: u64,
        append: bool,
        input: ReadHalf<Box<dyn AsyncReadAsyncWriteSendUnpin>>,
        output: &mut W,
        abort_rx: &mut Receiver<()>,
        logger: &slog::Logger,
    ) -> ControlChanMsg
    where
        W: AsyncWrite + Unpin + Sync + Send,
    {
        let outcome = tokio::select! {
            result = storage.put(input, path.clone(), start_pos, append) => Some(result),
            _ = abort_rx.recv() => None,
        };
        match outcome {
            Some(Ok(bytes)) => ControlChanMsg::WrittenData { path, bytes },
            Some(Err(error)) => {
                slog::warn!(logger, "Error writing to storage during STOR: {}", error);
                ControlChanMsg::StorFailed { path, error }
            }
            None => {
                slog::info!(logger, "STOR of {} aborted by client", path);
                let _ = tokio::time::timeout(ABORT_NOTICE_TIMEOUT, output.write_all(ABORT_NOTICE)).await;
                ControlChanMsg::TransferAborted
            }
        }
    }

    async fn exec_listing<W>(payload: Vec<u8>, output: &mut W, logger: &slog::Logger) -> ControlChanMsg
    where
        W: AsyncWrite + Unpin + Sync + Send,
    {
        match output.write_all(&payload).await {
            Ok(()) => ControlChanMsg::DirectorySuccessfullyListed,
            Err(err) => {
                slog::warn!(logger, "Failed to send directory listing: {}", err);
                ControlChanMsg::DirectoryListFailure
            }
        }
    }

    // Wraps the socket in TLS when the session negotiated PROT P. None means
    // the handshake failed and the transfer can not proceed.
    async fn maybe_tls(
        socket: tokio::net::TcpStream,
        ftps_mode: FtpsConfig,
        logger: &slog::Logger,
    ) -> Option<Box<dyn AsyncReadAsyncWriteSendUnpin>> {
        match ftps_mode {
            FtpsConfig::Off | FtpsConfig::Building { .. } => Some(Box::new(socket)),
            FtpsConfig::On { tls_config } => {
                let acceptor: TlsAcceptor = tls_config.into();
                match acceptor.accept(socket).await {
                    Ok(stream) => Some(Box::new(stream)),
                    Err(err) => {
                        slog::warn!(logger, "TLS handshake failed on data channel: {}", err);
                        None
                    }
                }
            }
        }
    }
}

pub trait AsyncReadAsyncWriteSendUnpin: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Sync + Unpin> AsyncReadAsyncWriteSendUnpin for T {}

/// Processing for the data connection: spawns a task that waits for a single
/// transfer command (or an abort, or a timeout) and runs it against the
/// given, already validated data socket.
pub async fn spawn_processing<Storage>(logger: slog::Logger, session_arc: SharedSession<Storage>, socket: tokio::net::TcpStream)
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    // Block scope keeps the lock on the session minimal: we copy what the
    // data loop needs and unlock.
    let (command_executor, mut data_cmd_rx, mut data_abort_rx) = {
        let mut session = session_arc.lock().await;
        let username = session.username.as_ref().cloned().unwrap_or_else(|| String::from("unknown"));
        let logger = logger.new(slog::o!("username" => username));
        let control_msg_tx: Sender<ControlChanMsg> = match session.control_msg_tx {
            Some(ref tx) => tx.clone(),
            None => {
                slog::error!(logger, "Control loop message sender expected to be set up. Aborting data loop.");
                return;
            }
        };
        let data_cmd_rx = match session.data_cmd_rx.take() {
            Some(rx) => rx,
            None => {
                slog::error!(logger, "Data loop command receiver expected to be set up. Aborting data loop.");
                return;
            }
        };
        let data_abort_rx = match session.data_abort_rx.take() {
            Some(rx) => rx,
            None => {
                slog::error!(logger, "Data loop abort receiver expected to be set up. Aborting data loop.");
                return;
            }
        };
        let storage = match session.storage {
            Some(ref storage) => Arc::clone(storage),
            None => {
                slog::error!(logger, "Data connection established before login. Aborting data loop.");
                return;
            }
        };
        let ftps_mode = if session.data_tls { session.ftps_config.clone() } else { FtpsConfig::Off };
        let command_executor = DataCommandExecutor {
            socket,
            control_msg_tx,
            storage,
            ftps_mode,
            logger,
        };

        // The control channel needs to know the data channel is busy so that
        // the idle timer doesn't fire mid transfer.
        session.data_busy = true;

        (command_executor, data_cmd_rx, data_abort_rx)
    };

    tokio::spawn(async move {
        let logger = command_executor.logger.clone();
        let tx = command_executor.control_msg_tx.clone();
        let timeout = tokio::time::sleep(std::time::Duration::from_secs(DATA_CHANNEL_TIMEOUT_SECS));

        enum NextStep {
            Transfer(DataChanCmd),
            Abort,
            Timeout,
        }
        let step = tokio::select! {
            Some(command) = data_cmd_rx.recv() => NextStep::Transfer(command),
            Some(_) = data_abort_rx.recv() => NextStep::Abort,
            _ = timeout => NextStep::Timeout,
        };
        match step {
            NextStep::Transfer(command) => {
                slog::info!(logger, "Data channel command received: {:?}", command);
                command_executor.execute(command, &mut data_abort_rx).await;
            }
            NextStep::Abort => {
                slog::info!(logger, "Data channel abort received before a transfer started");
                let mut socket = command_executor.socket;
                let _ = tokio::time::timeout(ABORT_NOTICE_TIMEOUT, socket.write_all(ABORT_NOTICE)).await;
                if let Err(err) = tx.send(ControlChanMsg::TransferAborted).await {
                    slog::error!(logger, "Could not notify control channel of abort: {}", err);
                }
            }
            NextStep::Timeout => {
                slog::warn!(logger, "Data channel connection timed out waiting for a command");
            }
        }

        let mut session = session_arc.lock().await;
        session.data_busy = false;
        session.clear_data_comms();
    });
}

#[cfg(test)]
mod tests {
    use super::peers_match;
    use std::net::IpAddr;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn matching_v4_peers() {
        assert!(peers_match(ip("192.0.2.1"), ip("192.0.2.1")));
        assert!(!peers_match(ip("192.0.2.1"), ip("192.0.2.2")));
    }

    #[test]
    fn v4_mapped_v6_matches_v4() {
        assert!(peers_match(ip("192.0.2.1"), ip("::ffff:192.0.2.1")));
        assert!(peers_match(ip("::ffff:192.0.2.1"), ip("192.0.2.1")));
    }

    #[test]
    fn loopback_variants_match_each_other() {
        assert!(peers_match(ip("127.0.0.1"), ip("::1")));
    }

    #[test]
    fn loopback_control_rejects_remote_data() {
        assert!(!peers_match(ip("127.0.0.1"), ip("192.0.2.1")));
    }
}
