//! Contains the code that listens for control channel connections and
//! spawns a control loop for each, subject to the connection rate limit.

use crate::server::controlchan::{self, LoopConfig};
use crate::server::datachan::AsyncReadAsyncWriteSendUnpin;
use crate::server::ratelimit::ConnectionLimiter;
use crate::server::shutdown;
use crate::server::tls::FtpsConfig;
use crate::storage::{Metadata, StorageBackend};

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

// Listener listens for control channel connections on a TCP port and spawns
// a control channel loop in a new task for each incoming connection.
pub struct Listener<Storage>
where
    Storage: StorageBackend,
{
    pub bind_address: SocketAddr,
    pub implicit_tls: bool,
    pub logger: slog::Logger,
    pub config: LoopConfig<Storage>,
    pub shutdown_topic: Arc<shutdown::Notifier>,
    pub connection_limiter: Arc<ConnectionLimiter>,
}

impl<Storage> Listener<Storage>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    // Starts listening, returning an error if the TCP address could not be
    // bound to. Runs until the shutdown topic fires.
    pub async fn listen(self) -> std::io::Result<()> {
        let Listener {
            logger,
            bind_address,
            implicit_tls,
            config,
            shutdown_topic,
            connection_limiter,
        } = self;
        let listener = TcpListener::bind(bind_address).await?;
        let mut stop_listening = shutdown_topic.subscribe().await;
        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = stop_listening.listen() => {
                    slog::info!(logger, "Shutting down the accept loop");
                    return Ok(());
                }
            };
            match accepted {
                Ok((tcp_stream, socket_addr)) => {
                    slog::info!(logger, "Incoming control connection from {:?}", socket_addr);

                    if !connection_limiter.check(socket_addr.ip()).await {
                        slog::warn!(logger, "Connection rate limit hit for {}; dropping connection", socket_addr.ip());
                        deny_connection(tcp_stream).await;
                        continue;
                    }

                    let shutdown_listener = shutdown_topic.subscribe().await;
                    let local_addr = match tcp_stream.local_addr() {
                        Ok(addr) => addr,
                        Err(err) => {
                            slog::error!(logger, "Could not determine local address: {:?}", err);
                            continue;
                        }
                    };

                    let stream: Box<dyn AsyncReadAsyncWriteSendUnpin> = if implicit_tls {
                        let acceptor: tokio_rustls::TlsAcceptor = match config.ftps_config.clone() {
                            FtpsConfig::On { tls_config } => tls_config.into(),
                            _ => {
                                slog::error!(logger, "Implicit TLS bind without TLS configuration; dropping connection");
                                continue;
                            }
                        };
                        match acceptor.accept(tcp_stream).await {
                            Ok(stream) => Box::new(stream),
                            Err(err) => {
                                slog::warn!(logger, "TLS handshake failed for {:?}: {}", socket_addr, err);
                                continue;
                            }
                        }
                    } else {
                        Box::new(tcp_stream)
                    };

                    let result = controlchan::spawn_loop::<Storage>(config.clone(), stream, socket_addr, local_addr, implicit_tls, shutdown_listener).await;
                    if let Err(err) = result {
                        slog::error!(logger, "Could not spawn control channel loop for connection from {:?}: {:?}", socket_addr, err);
                    }
                }
                Err(err) => {
                    slog::error!(logger, "Error accepting incoming control connection {:?}", err);
                }
            }
        }
    }
}

// Clients over the rate limit get one line of explanation, then the door.
async fn deny_connection(mut tcp_stream: TcpStream) {
    let _ = tcp_stream.write_all(b"421 Too many connections\r\n").await;
    let _ = tcp_stream.shutdown().await;
}
