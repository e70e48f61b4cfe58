use crate::server::controlchan::commands::{AuthParam, ModeParam, Opt, ProtParam, SiteParam, StruParam, TypeParam};
use crate::server::password::Password;

use std::net::{SocketAddr, SocketAddrV4};
use std::path::PathBuf;

/// A fully parsed FTP control channel command.
///
/// Every variant corresponds to one canonical directive; obsolete aliases
/// (XCWD, XMKD, XRMD, XCUP, XPWD) are folded onto their canonical variant by
/// the line parser. Arguments are typed: addresses are parsed socket
/// addresses, offsets are integers, paths stay as the client sent them so the
/// virtual filesystem can do its own resolution.
#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    User {
        /// The username the client wants to log in with.
        username: String,
    },
    Pass {
        /// The password belonging to the last USER. Display/Debug are masked.
        password: Password,
    },
    Acct {
        /// The account name. We accept the syntax but implement no accounting.
        account: String,
    },
    Syst,
    Stat {
        /// Path to report on; without it STAT describes the session itself.
        path: Option<String>,
    },
    Type {
        /// The representation type. Ascii is accepted but treated as binary.
        type_param: TypeParam,
    },
    Stru {
        /// The file structure. Only `File` is supported.
        structure: StruParam,
    },
    Mode {
        /// The transfer mode. Only `Stream` is supported.
        mode: ModeParam,
    },
    Help {
        /// A directive to describe, or None for the full command list.
        subject: Option<String>,
    },
    Noop,
    Pasv,
    Epsv,
    Port {
        /// The IPv4 endpoint the client listens on, from h1,h2,h3,h4,p1,p2.
        addr: SocketAddrV4,
    },
    Eprt {
        /// The endpoint the client listens on, from |proto|addr|port|.
        addr: SocketAddr,
    },
    Retr {
        /// The path to the file the client would like to retrieve.
        path: String,
    },
    Stor {
        /// The path to the file the client would like to store.
        path: String,
    },
    Appe {
        /// The path to the file the client would like to append to.
        path: String,
    },
    Stou {
        /// The suggested name; the server derives a unique variant of it.
        path: Option<String>,
    },
    List {
        /// Short-form flags given to LIST, e.g. `-a` or `-l`.
        flags: Vec<String>,
        /// The path of the file/directory the client wants to list.
        path: Option<String>,
    },
    Nlst {
        /// The path of the file/directory the client wants to list.
        path: Option<String>,
    },
    Mlsd {
        /// The path of the directory the client wants to list.
        path: Option<String>,
    },
    Mlst {
        /// The path to report a single machine-readable fact line for.
        path: Option<String>,
    },
    Feat,
    Pwd,
    Cwd {
        /// The path the client would like to change directory to.
        path: PathBuf,
    },
    Cdup,
    Opts {
        /// The option the client wants to set.
        option: Opt,
    },
    Dele {
        /// The file (or, for the RMD alias, directory) to delete.
        path: String,
    },
    Rmd {
        /// The directory to delete.
        path: String,
    },
    Mkd {
        /// The path to the directory the client wants to create.
        path: PathBuf,
    },
    Quit,
    Allo,
    Abor,
    Rnfr {
        /// The file to be renamed.
        file: PathBuf,
    },
    Rnto {
        /// The name to rename to.
        file: PathBuf,
    },
    Auth {
        /// The security mechanism, only TLS is understood.
        protocol: AuthParam,
    },
    Pbsz {
        /// The protection buffer size; only 0 is meaningful with TLS.
        size: u32,
    },
    Prot {
        /// The data channel protection level.
        param: ProtParam,
    },
    Size {
        /// The file to report the byte count of.
        file: PathBuf,
    },
    Rest {
        /// The byte offset at which the next transfer should restart.
        offset: u64,
    },
    Mdtm {
        /// The file to report the modification time of.
        file: PathBuf,
    },
    MdtmSet {
        /// The file a set-mtime was requested for. Acknowledged, not applied.
        file: PathBuf,
    },
    Site {
        /// The SITE sub command.
        param: SiteParam,
    },
    /// A syntactically valid directive that is not in the registry.
    Other {
        /// The directive as the client sent it, uppercased.
        directive: String,
    },
}

impl Command {
    /// The canonical directive name this command dispatches as.
    pub fn directive(&self) -> &str {
        match self {
            Command::User { .. } => "USER",
            Command::Pass { .. } => "PASS",
            Command::Acct { .. } => "ACCT",
            Command::Syst => "SYST",
            Command::Stat { .. } => "STAT",
            Command::Type { .. } => "TYPE",
            Command::Stru { .. } => "STRU",
            Command::Mode { .. } => "MODE",
            Command::Help { .. } => "HELP",
            Command::Noop => "NOOP",
            Command::Pasv => "PASV",
            Command::Epsv => "EPSV",
            Command::Port { .. } => "PORT",
            Command::Eprt { .. } => "EPRT",
            Command::Retr { .. } => "RETR",
            Command::Stor { .. } => "STOR",
            Command::Appe { .. } => "APPE",
            Command::Stou { .. } => "STOU",
            Command::List { .. } => "LIST",
            Command::Nlst { .. } => "NLST",
            Command::Mlsd { .. } => "MLSD",
            Command::Mlst { .. } => "MLST",
            Command::Feat => "FEAT",
            Command::Pwd => "PWD",
            Command::Cwd { .. } => "CWD",
            Command::Cdup => "CDUP",
            Command::Opts { .. } => "OPTS",
            Command::Dele { .. } => "DELE",
            Command::Rmd { .. } => "RMD",
            Command::Mkd { .. } => "MKD",
            Command::Quit => "QUIT",
            Command::Allo => "ALLO",
            Command::Abor => "ABOR",
            Command::Rnfr { .. } => "RNFR",
            Command::Rnto { .. } => "RNTO",
            Command::Auth { .. } => "AUTH",
            Command::Pbsz { .. } => "PBSZ",
            Command::Prot { .. } => "PROT",
            Command::Size { .. } => "SIZE",
            Command::Rest { .. } => "REST",
            Command::Mdtm { .. } | Command::MdtmSet { .. } => "MDTM",
            Command::Site { .. } => "SITE",
            Command::Other { directive } => directive.as_str(),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.directive())
    }
}
