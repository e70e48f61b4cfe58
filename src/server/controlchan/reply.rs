/// A reply that is send to the FTP client on the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing is written to the client at all.
    None,
    /// A single line reply: `<code> <msg>`.
    CodeAndMsg { code: ReplyCode, msg: String },
    /// A multi line reply following the RFC 959 continuation style: every
    /// line but the last is `<code>-<line>`, the last is `<code> <line>`.
    MultiLine { code: ReplyCode, lines: Vec<String> },
}

/// The reply codes according to RFC 959 and its extensions.
//
// The three digits form a code. Codes between 100 and 199 indicate marks;
// codes between 200 and 399 indicate acceptance; codes between 400 and 599
// indicate rejection. Clients are told not to look past the first digit, the
// rest is primarily for human consumption. Exceptions: greetings and the
// responses with code 227, 229 and 257 have a special format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
#[allow(dead_code)]
pub enum ReplyCode {
    RestartMarker = 110,
    InNMinutes = 120,
    ConnectionAlreadyOpen = 125,
    FileStatusOkay = 150,

    CommandOkay = 200,
    CommandOkayNotImplemented = 202,
    SystemStatus = 211,
    DirectoryStatus = 212,
    FileStatus = 213,
    HelpMessage = 214,
    SystemType = 215,
    ServiceReady = 220,
    ClosingControlConnection = 221,
    DataConnectionOpen = 225,
    ClosingDataConnection = 226,
    EnteringPassiveMode = 227,
    EnteringExtendedPassiveMode = 229,
    UserLoggedIn = 230,
    AuthOkayNoDataNeeded = 234,
    FileActionOkay = 250,
    DirCreated = 257,

    NeedPassword = 331,
    NeedAccount = 332,
    FileActionPending = 350,

    ServiceNotAvailable = 421,
    CantOpenDataConnection = 425,
    ConnectionClosed = 426,
    TransientFileError = 450,
    LocalError = 451,
    OutOfSpace = 452,

    CommandSyntaxError = 500,
    ParameterSyntaxError = 501,
    CommandNotImplemented = 502,
    BadCommandSequence = 503,
    CommandNotImplementedForParameter = 504,
    ExtendedPortUnknownProtocol = 522,
    NotLoggedIn = 530,
    NeedAccountToStore = 532,
    CommandDeniedPolicy = 533,
    FtpsRequired = 534,
    FailedSecurityCheck = 535,
    UnsupportedProtLevel = 536,
    ProtLevelNotSupportedBySecurity = 537,
    FileError = 550,
    PageTypeUnknown = 551,
    ExceededStorageAllocation = 552,
    BadFileName = 553,
}

impl ReplyCode {
    /// The canned message used when a reply is constructed without one.
    pub fn default_message(&self) -> &'static str {
        use ReplyCode::*;
        match self {
            RestartMarker => "Restart marker reply",
            InNMinutes => "Service ready soon",
            ConnectionAlreadyOpen => "Data connection already open; transfer starting",
            FileStatusOkay => "File status okay; about to open data connection",
            CommandOkay => "OK",
            CommandOkayNotImplemented => "Command not implemented, superfluous at this site",
            SystemStatus => "System status",
            DirectoryStatus => "Directory status",
            FileStatus => "File status",
            HelpMessage => "Help message",
            SystemType => "UNIX Type: L8",
            ServiceReady => "Service ready for new user",
            ClosingControlConnection => "Service closing control connection",
            DataConnectionOpen => "Data connection open; no transfer in progress",
            ClosingDataConnection => "Closing data connection",
            EnteringPassiveMode => "Entering passive mode",
            EnteringExtendedPassiveMode => "Entering extended passive mode",
            UserLoggedIn => "User logged in, proceed",
            AuthOkayNoDataNeeded => "AUTH okay, no data needed",
            FileActionOkay => "Requested file action okay, completed",
            DirCreated => "Directory created",
            NeedPassword => "User name okay, need password",
            NeedAccount => "Need account for login",
            FileActionPending => "Requested file action pending further information",
            ServiceNotAvailable => "Service not available, closing control connection",
            CantOpenDataConnection => "Can't open data connection",
            ConnectionClosed => "Connection closed; transfer aborted",
            TransientFileError => "Requested file action not taken",
            LocalError => "Requested action aborted; local error in processing",
            OutOfSpace => "Insufficient storage space in system",
            CommandSyntaxError => "Syntax error, command unrecognized",
            ParameterSyntaxError => "Syntax error in parameters or arguments",
            CommandNotImplemented => "Command not implemented",
            BadCommandSequence => "Bad sequence of commands",
            CommandNotImplementedForParameter => "Command not implemented for that parameter",
            ExtendedPortUnknownProtocol => "Network protocol not supported",
            NotLoggedIn => "Not logged in",
            NeedAccountToStore => "Need account for storing files",
            CommandDeniedPolicy => "Command protection level denied for policy reasons",
            FtpsRequired => "Request denied for policy reasons; use TLS",
            FailedSecurityCheck => "Failed security check",
            UnsupportedProtLevel => "Requested PROT level not implemented",
            ProtLevelNotSupportedBySecurity => "Command protection level not supported by security mechanism",
            FileError => "Requested action not taken; file unavailable",
            PageTypeUnknown => "Requested action aborted; page type unknown",
            ExceededStorageAllocation => "Requested file action aborted; exceeded storage allocation",
            BadFileName => "Requested action not taken; file name not allowed",
        }
    }
}

impl Reply {
    pub fn new(code: ReplyCode, message: &str) -> Self {
        Reply::CodeAndMsg {
            code,
            msg: message.to_string(),
        }
    }

    pub fn new_with_string(code: ReplyCode, msg: String) -> Self {
        Reply::CodeAndMsg { code, msg }
    }

    /// A reply with the canned message belonging to the code.
    pub fn from_code(code: ReplyCode) -> Self {
        Reply::CodeAndMsg {
            code,
            msg: code.default_message().to_string(),
        }
    }

    pub fn new_multiline<I>(code: ReplyCode, lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        Reply::MultiLine {
            code,
            lines: lines.into_iter().map(|item| format!("{}", item)).collect(),
        }
    }

    // A no-reply
    pub fn none() -> Self {
        Reply::None
    }

    /// Tells whether this reply indicates acceptance (2xx/3xx/1xx).
    pub fn is_positive(&self) -> bool {
        match self {
            Reply::None => false,
            Reply::CodeAndMsg { code, .. } | Reply::MultiLine { code, .. } => (*code as u32) < 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_code_fills_canned_message() {
        let reply = Reply::from_code(ReplyCode::CantOpenDataConnection);
        assert_eq!(
            reply,
            Reply::CodeAndMsg {
                code: ReplyCode::CantOpenDataConnection,
                msg: "Can't open data connection".to_string()
            }
        );
    }

    #[test]
    fn positive_and_negative_codes() {
        assert!(Reply::from_code(ReplyCode::CommandOkay).is_positive());
        assert!(Reply::from_code(ReplyCode::FileStatusOkay).is_positive());
        assert!(!Reply::from_code(ReplyCode::FileError).is_positive());
        assert!(!Reply::none().is_positive());
    }
}
