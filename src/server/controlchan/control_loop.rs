use crate::{
    auth::Authenticator,
    notification::{DataEvent, DataListener, EventMeta, PresenceEvent, PresenceListener},
    server::{
        chancomms::ControlChanMsg,
        controlchan::{
            auth::GateMiddleware,
            codecs::FtpCodec,
            command::Command,
            commands,
            error::{ControlChanError, ControlChanErrorKind},
            event::Event,
            handler::{CommandContext, CommandHandler, StorageFactory},
            log::LoggingMiddleware,
            middleware::ControlChanMiddleware,
            reply_for_storage_error, Reply, ReplyCode,
        },
        ftpserver::options::{ListFormat, PassiveHost, RateLimit},
        portpool::PortPool,
        ratelimit::SlidingWindow,
        session::{Session, SharedSession, TraceId},
        shutdown,
        tls::FtpsConfig,
    },
    storage::{Metadata, StorageBackend},
};

use crate::server::datachan::AsyncReadAsyncWriteSendUnpin;
use futures_util::{SinkExt, StreamExt};
use std::{net::SocketAddr, ops::RangeInclusive, sync::Arc, time::Duration};
use tokio::sync::{
    mpsc::{channel, Receiver, Sender},
    Mutex,
};
use tokio_util::codec::{Decoder, Framed};

// When the embedder disables the idle timeout we still need a sleep to
// select on; one day of idleness is as good as forever.
const NO_TIMEOUT_SLEEP: Duration = Duration::from_secs(60 * 60 * 24);

/// Everything one control loop needs to run a session.
pub struct LoopConfig<Storage>
where
    Storage: StorageBackend,
{
    pub storage_factory: Arc<StorageFactory<Storage>>,
    pub greeting: Vec<String>,
    pub authenticator: Arc<dyn Authenticator>,
    pub passive_ports: RangeInclusive<u16>,
    pub passive_host: PassiveHost,
    pub port_pool: Arc<PortPool>,
    pub ftps_config: FtpsConfig,
    pub idle_session_timeout: Duration,
    pub logger: slog::Logger,
    pub anonymous: bool,
    pub list_format: ListFormat,
    pub blacklist: Vec<String>,
    pub whitelist: Vec<String>,
    pub command_rate: RateLimit,
    pub storage_features: u32,
    pub data_listener: Arc<dyn DataListener>,
    pub presence_listener: Arc<dyn PresenceListener>,
}

impl<Storage> Clone for LoopConfig<Storage>
where
    Storage: StorageBackend,
{
    fn clone(&self) -> Self {
        LoopConfig {
            storage_factory: self.storage_factory.clone(),
            greeting: self.greeting.clone(),
            authenticator: self.authenticator.clone(),
            passive_ports: self.passive_ports.clone(),
            passive_host: self.passive_host.clone(),
            port_pool: self.port_pool.clone(),
            ftps_config: self.ftps_config.clone(),
            idle_session_timeout: self.idle_session_timeout,
            logger: self.logger.clone(),
            anonymous: self.anonymous,
            list_format: self.list_format,
            blacklist: self.blacklist.clone(),
            whitelist: self.whitelist.clone(),
            command_rate: self.command_rate,
            storage_features: self.storage_features,
            data_listener: self.data_listener.clone(),
            presence_listener: self.presence_listener.clone(),
        }
    }
}

/// Spawns the per session control loop on an accepted (and possibly already
/// TLS wrapped, for implicit FTPS) control connection.
pub async fn spawn_loop<Storage>(
    config: LoopConfig<Storage>,
    stream: Box<dyn AsyncReadAsyncWriteSendUnpin>,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    secure: bool,
    mut shutdown: shutdown::Listener,
) -> Result<(), ControlChanError>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    let (control_msg_tx, mut control_msg_rx): (Sender<ControlChanMsg>, Receiver<ControlChanMsg>) = channel(8);
    let mut session: Session<Storage> = Session::new(peer_addr, SlidingWindow::new(config.command_rate))
        .ftps(config.ftps_config.clone())
        .control_msg_tx(control_msg_tx.clone())
        .list_format(config.list_format)
        .denied_directives(config.blacklist.clone(), config.whitelist.clone());
    session.cmd_tls = secure;
    let trace_id = session.trace_id;

    let logger = config
        .logger
        .new(slog::o!("trace-id" => format!("{}", trace_id), "source" => format!("{}", peer_addr)));

    let shared_session: SharedSession<Storage> = Arc::new(Mutex::new(session));
    let idle_timeout = if config.idle_session_timeout.is_zero() {
        NO_TIMEOUT_SLEEP
    } else {
        config.idle_session_timeout
    };

    let presence_listener = config.presence_listener.clone();
    presence_listener
        .receive_presence_event(PresenceEvent::Connected, meta(&shared_session, trace_id, 0).await)
        .await;

    let event_chain = PrimaryEventHandler {
        logger: logger.clone(),
        session: shared_session.clone(),
        authenticator: config.authenticator.clone(),
        storage_factory: config.storage_factory.clone(),
        tls_configured: !matches!(config.ftps_config, FtpsConfig::Off),
        anonymous_enabled: config.anonymous,
        passive_ports: config.passive_ports.clone(),
        passive_host: config.passive_host.clone(),
        port_pool: config.port_pool.clone(),
        tx_control_chan: control_msg_tx,
        local_addr,
        peer_addr,
        storage_features: config.storage_features,
        data_listener: config.data_listener.clone(),
        presence_listener: config.presence_listener.clone(),
        trace_id,
        event_sequence: 0,
    };

    let event_chain = GateMiddleware {
        session: shared_session.clone(),
        next: event_chain,
    };

    let mut event_chain = LoggingMiddleware {
        logger: logger.clone(),
        sequence_nr: 0,
        next: event_chain,
    };

    let codec = FtpCodec::new();
    let cmd_and_reply_stream: Framed<Box<dyn AsyncReadAsyncWriteSendUnpin>, FtpCodec> = codec.framed(stream);
    let (mut reply_sink, mut command_source) = cmd_and_reply_stream.split();

    reply_sink.send(greeting_reply(&config.greeting)).await?;
    reply_sink.flush().await?;

    let ftps_config = config.ftps_config.clone();

    tokio::spawn(async move {
        slog::info!(logger, "Starting control loop");
        loop {
            let incoming = {
                let mut incoming = None;
                let mut timeout_delay = Box::pin(tokio::time::sleep(idle_timeout));
                tokio::select! {
                    cmd_result = command_source.next() => {
                        match cmd_result {
                            Some(result) => incoming = Some(result.map(Event::Command)),
                            None => {
                                slog::info!(logger, "Client closed the control connection");
                                end_session(&shared_session, &presence_listener, trace_id).await;
                                return;
                            }
                        }
                    },
                    Some(msg) = control_msg_rx.recv() => {
                        incoming = Some(Ok(Event::InternalMsg(msg)));
                    },
                    _ = &mut timeout_delay => {
                        let data_busy = shared_session.lock().await.data_busy;
                        if !data_busy {
                            incoming = Some(Err(ControlChanError::new(ControlChanErrorKind::ControlChannelTimeout)));
                        }
                    },
                    _ = shutdown.listen() => {
                        slog::info!(logger, "Shutting down control loop");
                        let _ = reply_sink.send(Reply::new(ReplyCode::ServiceNotAvailable, "Service shutting down, goodbye")).await;
                        end_session(&shared_session, &presence_listener, trace_id).await;
                        return;
                    }
                };
                incoming
            };
            match incoming {
                None => {} // Loop again
                Some(Ok(Event::InternalMsg(ControlChanMsg::ExitControlLoop))) => {
                    slog::info!(logger, "Exiting control loop");
                    end_session(&shared_session, &presence_listener, trace_id).await;
                    return;
                }
                Some(Ok(event)) => {
                    if let Event::InternalMsg(ControlChanMsg::SecureControlChannel) = event {
                        slog::info!(logger, "Upgrading control channel to TLS");

                        // Get back the original TCP stream
                        let codec_io = match reply_sink.reunite(command_source) {
                            Ok(io) => io,
                            Err(_) => {
                                slog::error!(logger, "Could not reunite control channel halves for TLS upgrade");
                                return;
                            }
                        };
                        let io = codec_io.into_inner();

                        // Wrap in a TLS stream
                        let acceptor: tokio_rustls::TlsAcceptor = match ftps_config.clone() {
                            FtpsConfig::On { tls_config } => tls_config.into(),
                            _ => {
                                slog::error!(logger, "AUTH TLS accepted without TLS configuration. Closing control channel.");
                                return;
                            }
                        };
                        let io: Box<dyn AsyncReadAsyncWriteSendUnpin> = match acceptor.accept(io).await {
                            Ok(stream) => Box::new(stream),
                            Err(err) => {
                                slog::warn!(logger, "Closing control channel. Could not upgrade to TLS: {}", err);
                                end_session(&shared_session, &presence_listener, trace_id).await;
                                return;
                            }
                        };

                        // Wrap in the codec again and get sink + source
                        let codec = FtpCodec::new();
                        let cmd_and_reply_stream = codec.framed(io);
                        let (sink, src) = cmd_and_reply_stream.split();
                        reply_sink = sink;
                        command_source = src;
                    }

                    match event_chain.handle(event).await {
                        Err(e) => {
                            let (reply, close_connection) = handle_control_channel_error(&logger, e);
                            let result = reply_sink.send(reply).await;
                            if result.is_err() {
                                slog::warn!(logger, "Could not send error reply to client");
                                end_session(&shared_session, &presence_listener, trace_id).await;
                                return;
                            }
                            if close_connection {
                                end_session(&shared_session, &presence_listener, trace_id).await;
                                return;
                            }
                        }
                        Ok(reply) => {
                            let result = reply_sink.send(reply).await;
                            if result.is_err() {
                                // A failed reply write is never retried.
                                slog::warn!(logger, "Could not send reply to client");
                                end_session(&shared_session, &presence_listener, trace_id).await;
                                return;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    let (reply, close_connection) = handle_control_channel_error(&logger, e);
                    let result = reply_sink.send(reply).await;
                    if result.is_err() {
                        slog::warn!(logger, "Could not send error reply to client");
                        end_session(&shared_session, &presence_listener, trace_id).await;
                        return;
                    }
                    if close_connection {
                        end_session(&shared_session, &presence_listener, trace_id).await;
                        return;
                    }
                }
            }
        }
    });

    Ok(())
}

fn greeting_reply(greeting: &[String]) -> Reply {
    match greeting {
        [] => Reply::from_code(ReplyCode::ServiceReady),
        [line] => Reply::new(ReplyCode::ServiceReady, line),
        lines => Reply::new_multiline(ReplyCode::ServiceReady, lines.iter()),
    }
}

// Tears down the connector and tells the presence listener the client left.
async fn end_session<Storage>(session: &SharedSession<Storage>, listener: &Arc<dyn PresenceListener>, trace_id: TraceId)
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    let m = {
        let mut session = session.lock().await;
        if let Some(tx) = session.data_abort_tx.take() {
            let _ = tx.try_send(());
        }
        session.clear_data_comms();
        session.rename_from = None;
        EventMeta {
            username: session.username.clone().unwrap_or_else(|| "unknown".to_string()),
            trace_id: trace_id.to_string(),
            sequence_number: 0,
        }
    };
    listener.receive_presence_event(PresenceEvent::Disconnected, m).await;
}

async fn meta<Storage>(session: &SharedSession<Storage>, trace_id: TraceId, sequence_number: u64) -> EventMeta
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    let session = session.lock().await;
    EventMeta {
        username: session.username.clone().unwrap_or_else(|| "unknown".to_string()),
        trace_id: trace_id.to_string(),
        sequence_number,
    }
}

// Gets the reply to be sent to the client and tells if the connection should
// be closed.
fn handle_control_channel_error(logger: &slog::Logger, error: ControlChanError) -> (Reply, bool) {
    slog::warn!(logger, "Control channel error: {:?}", error);
    match error.kind() {
        ControlChanErrorKind::InvalidDirective => (Reply::new(ReplyCode::CommandSyntaxError, "Syntax error, command unrecognized"), false),
        ControlChanErrorKind::Utf8Error => (Reply::new(ReplyCode::CommandSyntaxError, "Invalid UTF8 in command"), true),
        ControlChanErrorKind::InvalidCommand => (Reply::new(ReplyCode::ParameterSyntaxError, "Invalid parameter"), false),
        ControlChanErrorKind::UnsupportedNetworkProtocol => (
            Reply::new(ReplyCode::ExtendedPortUnknownProtocol, "Network protocol not supported, use (1,2)"),
            false,
        ),
        ControlChanErrorKind::ControlChannelTimeout => (
            Reply::new(ReplyCode::ServiceNotAvailable, "Session timed out. Closing control connection"),
            true,
        ),
        ControlChanErrorKind::RateLimitExceeded => (Reply::new(ReplyCode::ServiceNotAvailable, "Too many commands, slow down"), true),
        _ => (Reply::new(ReplyCode::LocalError, "Unknown internal server error, please try again later"), true),
    }
}

struct PrimaryEventHandler<Storage>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    logger: slog::Logger,
    session: SharedSession<Storage>,
    authenticator: Arc<dyn Authenticator>,
    storage_factory: Arc<StorageFactory<Storage>>,
    tls_configured: bool,
    anonymous_enabled: bool,
    passive_ports: RangeInclusive<u16>,
    passive_host: PassiveHost,
    port_pool: Arc<PortPool>,
    tx_control_chan: Sender<ControlChanMsg>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    storage_features: u32,
    data_listener: Arc<dyn DataListener>,
    presence_listener: Arc<dyn PresenceListener>,
    trace_id: TraceId,
    event_sequence: u64,
}

impl<Storage> PrimaryEventHandler<Storage>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle_internal_msg(&mut self, msg: ControlChanMsg) -> Result<Reply, ControlChanError> {
        use ControlChanMsg::*;

        match msg {
            SentData { path, bytes } => {
                self.reset_transfer_state().await;
                self.notify_data(DataEvent::Got { path, bytes }).await;
                Ok(Reply::new(ReplyCode::ClosingDataConnection, "Closing data connection"))
            }
            WrittenData { path, bytes } => {
                self.reset_transfer_state().await;
                self.notify_data(DataEvent::Put { path: path.clone(), bytes }).await;
                Ok(Reply::new_with_string(ReplyCode::ClosingDataConnection, path))
            }
            RetrFailed { path, error } => {
                slog::warn!(self.logger, "RETR of {} failed: {:?}", path, error);
                self.reset_transfer_state().await;
                self.notify_data(DataEvent::GotFailed { path }).await;
                Ok(reply_for_storage_error(&error))
            }
            StorFailed { path, error } => {
                slog::warn!(self.logger, "STOR of {} failed: {:?}", path, error);
                self.reset_transfer_state().await;
                self.notify_data(DataEvent::PutFailed { path }).await;
                Ok(reply_for_storage_error(&error))
            }
            TransferAborted => {
                self.reset_transfer_state().await;
                Ok(Reply::new(
                    ReplyCode::ClosingDataConnection,
                    "Closing data connection. Requested file action successful (file transfer aborted)",
                ))
            }
            ConnectionReset => {
                self.reset_transfer_state().await;
                Ok(Reply::new(ReplyCode::ConnectionClosed, "Data channel unexpectedly closed"))
            }
            DataConnectionTimeout => {
                self.reset_transfer_state().await;
                Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No connection established"))
            }
            DirectorySuccessfullyListed => Ok(Reply::new(ReplyCode::ClosingDataConnection, "Listed the directory")),
            DirectoryListFailure => Ok(Reply::new(ReplyCode::LocalError, "Failed to list the directory")),
            LoggedIn { username } => {
                let m = EventMeta {
                    username,
                    trace_id: self.trace_id.to_string(),
                    sequence_number: self.next_sequence(),
                };
                self.presence_listener.receive_presence_event(PresenceEvent::LoggedIn, m).await;
                Ok(Reply::none())
            }
            // ExitControlLoop never reaches this point; the loop intercepts
            // it because the socket has to be closed.
            ExitControlLoop => Ok(Reply::new(ReplyCode::ClosingControlConnection, "Bye!")),
            SecureControlChannel => {
                let mut session = self.session.lock().await;
                session.cmd_tls = true;
                Ok(Reply::none())
            }
        }
    }

    async fn reset_transfer_state(&self) {
        let mut session = self.session.lock().await;
        // The REST offset applies to exactly one transfer.
        session.start_pos = 0;
        session.data_busy = false;
    }

    fn next_sequence(&mut self) -> u64 {
        self.event_sequence += 1;
        self.event_sequence
    }

    async fn notify_data(&mut self, event: DataEvent) {
        let username = {
            let session = self.session.lock().await;
            session.username.clone().unwrap_or_else(|| "unknown".to_string())
        };
        let m = EventMeta {
            username,
            trace_id: self.trace_id.to_string(),
            sequence_number: self.next_sequence(),
        };
        self.data_listener.receive_data_event(event, m).await;
    }

    async fn handle_command(&self, cmd: Command) -> Result<Reply, ControlChanError> {
        let args: CommandContext<Storage> = CommandContext {
            parsed_command: cmd.clone(),
            session: self.session.clone(),
            authenticator: self.authenticator.clone(),
            storage_factory: self.storage_factory.clone(),
            tls_configured: self.tls_configured,
            anonymous_enabled: self.anonymous_enabled,
            passive_ports: self.passive_ports.clone(),
            passive_host: self.passive_host.clone(),
            port_pool: self.port_pool.clone(),
            tx_control_chan: self.tx_control_chan.clone(),
            local_addr: self.local_addr,
            peer_addr: self.peer_addr,
            storage_features: self.storage_features,
            logger: self.logger.clone(),
        };

        let handler: Box<dyn CommandHandler<Storage>> = match cmd {
            Command::User { username } => Box::new(commands::User::new(username)),
            Command::Pass { password } => Box::new(commands::Pass::new(password)),
            Command::Acct { .. } => Box::new(commands::Acct),
            Command::Syst => Box::new(commands::Syst),
            Command::Stat { path } => Box::new(commands::Stat::new(path)),
            Command::Type { type_param } => Box::new(commands::Type::new(type_param)),
            Command::Stru { structure } => Box::new(commands::Stru::new(structure)),
            Command::Mode { mode } => Box::new(commands::Mode::new(mode)),
            Command::Help { subject } => Box::new(commands::Help::new(subject)),
            Command::Noop => Box::new(commands::Noop),
            Command::Pasv => Box::new(commands::Pasv),
            Command::Epsv => Box::new(commands::Epsv),
            Command::Port { addr } => Box::new(commands::Port::new(addr)),
            Command::Eprt { addr } => Box::new(commands::Eprt::new(addr)),
            Command::Retr { .. } => Box::new(commands::Retr),
            Command::Stor { .. } => Box::new(commands::Stor),
            Command::Appe { .. } => Box::new(commands::Appe),
            Command::Stou { path } => Box::new(commands::Stou::new(path)),
            Command::List { .. } => Box::new(commands::List),
            Command::Nlst { .. } => Box::new(commands::Nlst),
            Command::Mlsd { .. } => Box::new(commands::Mlsd),
            Command::Mlst { path } => Box::new(commands::Mlst::new(path)),
            Command::Feat => Box::new(commands::Feat),
            Command::Pwd => Box::new(commands::Pwd),
            Command::Cwd { path } => Box::new(commands::Cwd::new(path)),
            Command::Cdup => Box::new(commands::Cdup),
            Command::Opts { option } => Box::new(commands::Opts::new(option)),
            Command::Dele { path } => Box::new(commands::Dele::new(path)),
            Command::Rmd { path } => Box::new(commands::Rmd::new(path)),
            Command::Mkd { path } => Box::new(commands::Mkd::new(path)),
            Command::Quit => Box::new(commands::Quit),
            Command::Allo => Box::new(commands::Allo),
            Command::Abor => Box::new(commands::Abor),
            Command::Rnfr { file } => Box::new(commands::Rnfr::new(file)),
            Command::Rnto { file } => Box::new(commands::Rnto::new(file)),
            Command::Auth { protocol } => Box::new(commands::Auth::new(protocol)),
            Command::Pbsz { size } => Box::new(commands::Pbsz::new(size)),
            Command::Prot { param } => Box::new(commands::Prot::new(param)),
            Command::Size { file } => Box::new(commands::Size::new(file)),
            Command::Rest { offset } => Box::new(commands::Rest::new(offset)),
            Command::Mdtm { file } => Box::new(commands::Mdtm::new(file)),
            Command::MdtmSet { file } => Box::new(commands::MdtmSet::new(file)),
            Command::Site { param } => Box::new(commands::Site::new(param)),
            Command::Other { directive } => {
                return Ok(Reply::new_with_string(
                    ReplyCode::CommandNotImplemented,
                    format!("Command not allowed: {}", directive),
                ))
            }
        };

        handler.handle(args).await
    }
}

#[async_trait::async_trait]
impl<Storage> ControlChanMiddleware for PrimaryEventHandler<Storage>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError> {
        match event {
            Event::Command(cmd) => self.handle_command(cmd).await,
            Event::InternalMsg(msg) => self.handle_internal_msg(msg).await,
        }
    }
}
