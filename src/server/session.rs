//! The session module implements per-connection session state: who is logged
//! in, where they are, what the next transfer looks like and the plumbing
//! that connects the control loop to the data loop.

use super::chancomms::{ControlChanMsg, DataChanCmd};
use super::tls::FtpsConfig;
use crate::server::controlchan::command::Command;
use crate::server::controlchan::commands::TypeParam;
use crate::server::options::ListFormat;
use crate::server::ratelimit::SlidingWindow;
use crate::storage::{Metadata, StorageBackend};

use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

// TraceId is an identifier used to correlate log statements together and to
// tag a session in event notifications. Formats as 16 hex digits.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct TraceId(u64);

impl TraceId {
    pub fn new() -> Self {
        TraceId(rand::random())
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The authentication progress of a session.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SessionState {
    /// Freshly connected, no USER seen yet.
    New,
    /// USER was accepted, waiting for PASS.
    WaitPass,
    /// Logged in, commands are being processed.
    WaitCmd,
}

/// The character encoding used for paths on the control channel.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TextEncoding {
    Utf8,
    Ascii,
}

// The session, shared between the control loop, the command handlers and the
// data loop via an asynchronous lock.
pub type SharedSession<S> = Arc<tokio::sync::Mutex<Session<S>>>;

// This is where we keep the state for an FTP session.
pub struct Session<S>
where
    S: StorageBackend,
    S::Metadata: Metadata,
{
    pub trace_id: TraceId,
    // The username used to log in. None if not logged in.
    pub username: Option<String>,
    // The storage backend attached at login time; None before that.
    pub storage: Option<Arc<S>>,
    // The control loop uses this to hand transfer commands to the data loop.
    // Taken (None) while a transfer is pending, restored on teardown.
    pub data_cmd_tx: Option<Sender<DataChanCmd>>,
    // The data loop side of the above; taken when the data loop spawns.
    pub data_cmd_rx: Option<Receiver<DataChanCmd>>,
    // The control loop uses this to ask the data loop to abort.
    pub data_abort_tx: Option<Sender<()>>,
    // The data loop listens on this so it knows when to abort.
    pub data_abort_rx: Option<Receiver<()>>,
    // Lets the data loop (and helpers) push replies onto the control loop.
    pub control_msg_tx: Option<Sender<ControlChanMsg>>,
    // The address of the client's control connection, used to validate data
    // connection peers and active mode endpoints.
    pub source: SocketAddr,
    pub cwd: PathBuf,
    // After a RNFR command this holds the source path for the RNTO command.
    pub rename_from: Option<PathBuf>,
    pub state: SessionState,
    // Whether TLS is available to this session at all; cmd_tls/data_tls tell
    // whether the channels are actually encrypted right now.
    pub ftps_config: FtpsConfig,
    pub cmd_tls: bool,
    pub data_tls: bool,
    // The negotiated protection buffer size. Only 0 is meaningful.
    pub pbsz: u32,
    // The representation type set by TYPE. Ascii is accepted but transfers
    // are byte-for-byte identical to binary.
    pub transfer_type: TypeParam,
    // The long-listing format used by LIST, switchable with OPTS LIST.
    pub list_format: ListFormat,
    pub encoding: TextEncoding,
    // MLST facts as narrowed by OPTS MLST; starts out as the full set.
    pub mlst_facts: Vec<String>,
    // The starting byte for the next STOR/RETR/APPE, set by REST and cleared
    // when that transfer finishes, whatever its outcome.
    pub start_pos: u64,
    // The last command that was dispatched for this session.
    pub previous_command: Option<Command>,
    // Directives denied to this session, merged from server options and the
    // login grant. Checked uppercase.
    pub blacklist: Vec<String>,
    // When non-empty, the only directives allowed to this session.
    pub whitelist: Vec<String>,
    // True while the data loop runs a transfer, so the idle timer holds off.
    pub data_busy: bool,
    // Sliding window over the commands this session issued.
    pub cmd_rate: SlidingWindow,
}

impl<S> Session<S>
where
    S: StorageBackend + 'static,
    S::Metadata: Metadata,
{
    pub(super) fn new(source: SocketAddr, cmd_rate: SlidingWindow) -> Self {
        Session {
            trace_id: TraceId::new(),
            username: None,
            storage: None,
            data_cmd_tx: None,
            data_cmd_rx: None,
            data_abort_tx: None,
            data_abort_rx: None,
            control_msg_tx: None,
            source,
            cwd: "/".into(),
            rename_from: None,
            state: SessionState::New,
            ftps_config: FtpsConfig::Off,
            cmd_tls: false,
            data_tls: false,
            pbsz: 0,
            transfer_type: TypeParam::Binary,
            list_format: ListFormat::Ls,
            encoding: TextEncoding::Utf8,
            mlst_facts: default_mlst_facts(),
            start_pos: 0,
            previous_command: None,
            blacklist: Vec::new(),
            whitelist: Vec::new(),
            data_busy: false,
            cmd_rate,
        }
    }

    pub fn ftps(mut self, mode: FtpsConfig) -> Self {
        self.ftps_config = mode;
        self
    }

    pub fn control_msg_tx(mut self, sender: Sender<ControlChanMsg>) -> Self {
        self.control_msg_tx = Some(sender);
        self
    }

    pub fn list_format(mut self, format: ListFormat) -> Self {
        self.list_format = format;
        self
    }

    pub fn denied_directives(mut self, blacklist: Vec<String>, whitelist: Vec<String>) -> Self {
        self.blacklist = blacklist;
        self.whitelist = whitelist;
        self
    }

    /// Tells whether a data connector (passive listener or active
    /// connection) is currently associated with the session.
    pub fn has_data_connector(&self) -> bool {
        self.data_cmd_tx.is_some() || self.data_cmd_rx.is_some()
    }

    /// Drops all channels to the data loop, severing the connector.
    pub fn clear_data_comms(&mut self) {
        self.data_cmd_tx = None;
        self.data_cmd_rx = None;
        self.data_abort_tx = None;
        self.data_abort_rx = None;
    }
}

impl<S> Debug for Session<S>
where
    S: StorageBackend,
    S::Metadata: Metadata,
{
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("trace_id", &self.trace_id)
            .field("source", &self.source)
            .field("username", &self.username)
            .field("state", &self.state)
            .field("cwd", &self.cwd)
            .field("start_pos", &self.start_pos)
            .finish()
    }
}

/// The complete set of MLST facts this server can produce.
pub fn default_mlst_facts() -> Vec<String> {
    ["Type", "Size", "Modify", "Perm", "UNIX.mode"].iter().map(|s| s.to_string()).collect()
}
