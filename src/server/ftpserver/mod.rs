//! Contains the [`Server`] type, the public face of the crate: a builder for
//! the configuration surface and the `listen` call that runs the accept
//! loop.

pub mod error;
pub mod listen;
pub mod options;

use crate::auth::{AnonymousAuthenticator, Authenticator};
use crate::notification::{DataListener, NopListener, PresenceListener};
use crate::server::controlchan::handler::StorageFactory;
use crate::server::controlchan::LoopConfig;
use crate::server::ftpserver::error::ServerError;
use crate::server::ftpserver::options::{ListFormat, PassiveHost, RateLimit};
use crate::server::portpool::PortPool;
use crate::server::ratelimit::ConnectionLimiter;
use crate::server::shutdown;
use crate::server::tls::FtpsConfig;
use crate::storage::{Metadata, StorageBackend, FEATURE_RESTART};

use std::net::{SocketAddr, ToSocketAddrs};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// How long shutdown waits for sessions to finish before giving up on them.
const SHUTDOWN_LINGER: Duration = Duration::from_secs(1);

/// An instance of an FTP(S) server. It contains a reference to an
/// [`Authenticator`] that will be used for authentication, and a storage
/// factory that builds the [`StorageBackend`] a freshly authenticated user
/// operates on.
///
/// Server has a builder API: chain the option methods and finish with
/// [`listen`](Server::listen).
///
/// # Example
///
/// ```no_run
/// use bucketftp::Server;
/// use bucketftp::storage::Filesystem;
///
/// #[tokio::main]
/// async fn main() {
///     let server = Server::new(Box::new(|_grant| Filesystem::new("/srv/ftp")))
///         .greeting("Welcome to my FTP server")
///         .passive_ports(50000..=65535);
///     server.listen("127.0.0.1:2121").await.unwrap();
/// }
/// ```
pub struct Server<Storage>
where
    Storage: StorageBackend,
{
    storage_factory: Arc<StorageFactory<Storage>>,
    greeting: Vec<String>,
    authenticator: Arc<dyn Authenticator>,
    passive_ports: RangeInclusive<u16>,
    passive_host: PassiveHost,
    ftps_config: FtpsConfig,
    idle_session_timeout: Duration,
    anonymous: bool,
    list_format: ListFormat,
    blacklist: Vec<String>,
    whitelist: Vec<String>,
    connection_rate: RateLimit,
    command_rate: RateLimit,
    storage_features: u32,
    logger: slog::Logger,
    data_listener: Arc<dyn DataListener>,
    presence_listener: Arc<dyn PresenceListener>,
    shutdown_topic: Arc<shutdown::Notifier>,
}

impl<Storage> Server<Storage>
where
    Storage: StorageBackend + 'static,
    Storage::Metadata: Metadata,
{
    /// Construct a new [`Server`] with the given storage factory. The
    /// factory runs once per successful login and receives the
    /// [`LoginGrant`](crate::auth::LoginGrant) so it can root the backend
    /// wherever the authenticator said.
    pub fn new(storage_factory: Box<StorageFactory<Storage>>) -> Self {
        Server {
            storage_factory: Arc::from(storage_factory),
            greeting: vec![options::DEFAULT_GREETING.to_string()],
            authenticator: Arc::new(AnonymousAuthenticator::new("")),
            passive_ports: options::DEFAULT_PASSIVE_PORTS,
            passive_host: options::DEFAULT_PASSIVE_HOST,
            ftps_config: FtpsConfig::Off,
            idle_session_timeout: Duration::from_secs(options::DEFAULT_IDLE_SESSION_TIMEOUT_SECS),
            anonymous: false,
            list_format: ListFormat::Ls,
            blacklist: Vec::new(),
            whitelist: Vec::new(),
            connection_rate: RateLimit::connections_default(),
            command_rate: RateLimit::commands_default(),
            storage_features: FEATURE_RESTART,
            logger: slog::Logger::root(slog::Discard, slog::o!()),
            data_listener: Arc::new(NopListener),
            presence_listener: Arc::new(NopListener),
            shutdown_topic: Arc::new(shutdown::Notifier::new()),
        }
    }

    /// Set the greeting that will be sent to the client after connecting:
    /// one line, or several that render as a multi line 220.
    pub fn greeting<S: Into<String>>(mut self, greeting: S) -> Self {
        self.greeting = vec![greeting.into()];
        self
    }

    /// Set a multi line greeting banner.
    pub fn greeting_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.greeting = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Set the [`Authenticator`] that will be used for authentication.
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Set the inclusive range of ports used for passive data connections.
    /// Both ends must lie in the non-privileged range.
    pub fn passive_ports(mut self, range: RangeInclusive<u16>) -> Self {
        self.passive_ports = range;
        self
    }

    /// Set how the address in the PASV reply is determined.
    pub fn passive_host<H: Into<PassiveHost>>(mut self, host: H) -> Self {
        self.passive_host = host.into();
        self
    }

    /// Enable FTPS with the given PEM certificate chain and private key.
    /// Consulted for `AUTH TLS` upgrades and for `ftps://` binds.
    pub fn ftps<P: Into<PathBuf>>(mut self, certs_file: P, key_file: P) -> Self {
        self.ftps_config = FtpsConfig::Building {
            certs_file: certs_file.into(),
            key_file: key_file.into(),
        };
        self
    }

    /// Set the idle session timeout. Zero disables it.
    pub fn idle_session_timeout(mut self, timeout: Duration) -> Self {
        self.idle_session_timeout = timeout;
        self
    }

    /// Advertise anonymous access in the FEAT block.
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    /// Set the default LIST output format. Sessions can switch with
    /// `OPTS LIST`.
    pub fn list_format(mut self, format: ListFormat) -> Self {
        self.list_format = format;
        self
    }

    /// Directives to refuse for every session.
    pub fn blacklist<I, S>(mut self, directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = directives.into_iter().map(|d| d.into().to_uppercase()).collect();
        self
    }

    /// When non-empty, the only directives any session may use.
    pub fn whitelist<I, S>(mut self, directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = directives.into_iter().map(|d| d.into().to_uppercase()).collect();
        self
    }

    /// Limit on control connections per client IP.
    pub fn connection_rate(mut self, limit: RateLimit) -> Self {
        self.connection_rate = limit;
        self
    }

    /// Limit on commands per session.
    pub fn command_rate(mut self, limit: RateLimit) -> Self {
        self.command_rate = limit;
        self
    }

    /// Set the root logger; session loggers derive from it.
    pub fn logger(mut self, logger: slog::Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Register a listener for transfer events.
    pub fn data_listener(mut self, listener: Arc<dyn DataListener>) -> Self {
        self.data_listener = listener;
        self
    }

    /// Register a listener for connect/login/disconnect events.
    pub fn presence_listener(mut self, listener: Arc<dyn PresenceListener>) -> Self {
        self.presence_listener = listener;
        self
    }

    /// The notifier that triggers a graceful shutdown. The embedder decides
    /// what to wire it to (OS signals, an admin endpoint, a test harness);
    /// the library installs no signal handlers itself.
    pub fn shutdown_notifier(mut self, topic: Arc<shutdown::Notifier>) -> Self {
        self.shutdown_topic = topic;
        self
    }

    /// Runs the server on the given bind address until shutdown is
    /// triggered. Accepts `host:port`, `ftp://host[:port]` (default 21) and
    /// `ftps://host[:port]` (default 990, implicit TLS).
    pub async fn listen<T: AsRef<str>>(self, bind: T) -> Result<(), ServerError> {
        let (bind_address, implicit_tls) = parse_bind_url(bind.as_ref())?;

        if self.passive_ports.start() < &1024 {
            return Err(ServerError::InvalidConfig(format!(
                "passive port range must start at 1024 or above, got {}",
                self.passive_ports.start()
            )));
        }

        let ftps_config = match self.ftps_config.clone() {
            FtpsConfig::Building { certs_file, key_file } => FtpsConfig::On {
                tls_config: crate::server::tls::new_config(&certs_file, &key_file).map_err(ServerError::Tls)?,
            },
            other => other,
        };
        if implicit_tls && matches!(ftps_config, FtpsConfig::Off) {
            return Err(ServerError::InvalidConfig("an ftps:// bind requires certificates; call ftps() first".to_string()));
        }

        let config: LoopConfig<Storage> = LoopConfig {
            storage_factory: self.storage_factory.clone(),
            greeting: self.greeting.clone(),
            authenticator: self.authenticator.clone(),
            passive_ports: self.passive_ports.clone(),
            passive_host: self.passive_host.clone(),
            port_pool: PortPool::new(self.passive_ports.clone()),
            ftps_config,
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
        };

        let listener = listen::Listener {
            bind_address,
            implicit_tls,
            logger: self.logger.clone(),
            config,
            shutdown_topic: self.shutdown_topic.clone(),
            connection_limiter: Arc::new(ConnectionLimiter::new(self.connection_rate)),
        };

        listener.listen().await?;

        // Sessions got the shutdown notice too; give them a moment.
        let _ = tokio::time::timeout(SHUTDOWN_LINGER, self.shutdown_topic.linger()).await;
        Ok(())
    }
}

// Accepts "host:port", "ftp://host[:port]" and "ftps://host[:port]".
fn parse_bind_url(bind: &str) -> Result<(SocketAddr, bool), ServerError> {
    let (rest, implicit_tls, default_port) = if let Some(rest) = bind.strip_prefix("ftps://") {
        (rest, true, 990)
    } else if let Some(rest) = bind.strip_prefix("ftp://") {
        (rest, false, 21)
    } else {
        (bind, false, 21)
    };
    let rest = rest.trim_end_matches('/');

    let with_port = if rest.contains(':') && !rest.ends_with(']') {
        rest.to_string()
    } else {
        format!("{}:{}", rest, default_port)
    };

    with_port
        .to_socket_addrs()
        .map_err(|_| ServerError::InvalidBindAddress(bind.to_string()))?
        .next()
        .ok_or_else(|| ServerError::InvalidBindAddress(bind.to_string()))
        .map(|addr| (addr, implicit_tls))
}

#[cfg(test)]
mod tests {
    use super::parse_bind_url;

    #[test]
    fn parses_plain_host_port() {
        let (addr, tls) = parse_bind_url("127.0.0.1:2121").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:2121");
        assert!(!tls);
    }

    #[test]
    fn parses_ftp_scheme_with_default_port() {
        let (addr, tls) = parse_bind_url("ftp://127.0.0.1").unwrap();
        assert_eq!(addr.port(), 21);
        assert!(!tls);
    }

    #[test]
    fn parses_ftps_scheme() {
        let (addr, tls) = parse_bind_url("ftps://127.0.0.1:2990").unwrap();
        assert_eq!(addr.port(), 2990);
        assert!(tls);

        let (addr, _) = parse_bind_url("ftps://127.0.0.1").unwrap();
        assert_eq!(addr.port(), 990);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_bind_url("not an address").is_err());
    }
}
