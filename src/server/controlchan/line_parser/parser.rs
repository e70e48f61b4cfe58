use super::error::{ParseErrorKind, Result};
use crate::server::controlchan::{
    command::Command,
    commands::{AuthParam, ModeParam, Opt, ProtParam, SiteParam, StruParam, TypeParam},
};
use crate::server::options::ListFormat;
use crate::server::password::Password;

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

// RFC 959 says the whole line, including the CRLF, may be at most 512 bytes.
const MAX_LINE_LEN: usize = 512;

// For these directives an argument may legitimately start with a dash, so no
// token is ever classified as a flag.
const KEEP_DASH_ARGS: &[&str] = &["RETR", "STOR", "SIZE"];

/// Parse the given bytes into a [`Command`].
///
/// The line is sanitized first: carriage returns, line feeds and control
/// characters are stripped. Lines that are empty, longer than 512 bytes, or
/// whose directive token contains non-letters or more than four characters
/// are rejected. Tokens of the form `-x` are classified as flags for all
/// directives where an argument can not look like one.
///
/// [`Command`]: ../command/enum.Command.html
pub fn parse<T>(line: T) -> Result<Command>
where
    T: AsRef<[u8]>,
{
    if line.as_ref().len() > MAX_LINE_LEN {
        return Err(ParseErrorKind::LineTooLong.into());
    }

    let line = String::from_utf8(line.as_ref().to_vec())?;
    let line: String = line.chars().filter(|c| !c.is_control()).collect();
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseErrorKind::EmptyLine.into());
    }

    let (directive, remainder) = match line.find(' ') {
        Some(pos) => (&line[..pos], line[pos + 1..].trim()),
        None => (line, ""),
    };

    if directive.len() > 4 || !directive.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ParseErrorKind::InvalidDirective.into());
    }
    let directive = directive.to_uppercase();

    let (flags, arg) = split_flags(&directive, remainder);
    let arg = arg.as_str();

    let cmd = match directive.as_str() {
        "USER" => Command::User {
            username: required(arg)?.to_string(),
        },
        "PASS" => Command::Pass {
            password: Password::new(required(arg)?.to_string()),
        },
        "ACCT" => Command::Acct {
            account: required(arg)?.to_string(),
        },
        "SYST" => Command::Syst,
        "STAT" => Command::Stat { path: optional(arg) },
        "TYPE" => Command::Type {
            type_param: parse_type(arg)?,
        },
        "STRU" => Command::Stru {
            structure: match arg {
                "F" | "f" => StruParam::File,
                "R" | "r" => StruParam::Record,
                "P" | "p" => StruParam::Page,
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            },
        },
        "MODE" => Command::Mode {
            mode: match arg {
                "S" | "s" => ModeParam::Stream,
                "B" | "b" => ModeParam::Block,
                "C" | "c" => ModeParam::Compressed,
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            },
        },
        "HELP" => Command::Help { subject: optional(arg) },
        "NOOP" => {
            if !arg.is_empty() {
                // NOOP params are prohibited
                return Err(ParseErrorKind::InvalidCommand.into());
            }
            Command::Noop
        }
        "PASV" => {
            if !arg.is_empty() {
                return Err(ParseErrorKind::InvalidCommand.into());
            }
            Command::Pasv
        }
        // EPSV takes an optional protocol argument or ALL; we listen on the
        // control connection's family regardless.
        "EPSV" => Command::Epsv,
        "PORT" => Command::Port { addr: parse_port_arg(arg)? },
        "EPRT" => Command::Eprt { addr: parse_eprt_arg(arg)? },
        "RETR" => Command::Retr {
            path: required(arg)?.to_string(),
        },
        "STOR" => Command::Stor {
            path: required(arg)?.to_string(),
        },
        "APPE" => Command::Appe {
            path: required(arg)?.to_string(),
        },
        "STOU" => Command::Stou { path: optional(arg) },
        "LIST" => Command::List {
            flags,
            path: optional(arg),
        },
        "NLST" => Command::Nlst { path: optional(arg) },
        "MLSD" => Command::Mlsd { path: optional(arg) },
        "MLST" => Command::Mlst { path: optional(arg) },
        "FEAT" => {
            if !arg.is_empty() {
                return Err(ParseErrorKind::InvalidCommand.into());
            }
            Command::Feat
        }
        "PWD" | "XPWD" => Command::Pwd,
        "CWD" | "XCWD" => Command::Cwd {
            path: required(arg)?.into(),
        },
        "CDUP" | "XCUP" => Command::Cdup,
        "OPTS" => Command::Opts { option: parse_opts(arg)? },
        "DELE" => Command::Dele {
            path: required(arg)?.to_string(),
        },
        "RMD" | "XRMD" => Command::Rmd {
            path: required(arg)?.to_string(),
        },
        "MKD" | "XMKD" => Command::Mkd {
            path: required(arg)?.into(),
        },
        "QUIT" => Command::Quit,
        "ALLO" => Command::Allo,
        "ABOR" => Command::Abor,
        "RNFR" => Command::Rnfr {
            file: required(arg)?.into(),
        },
        "RNTO" => Command::Rnto {
            file: required(arg)?.into(),
        },
        "AUTH" => Command::Auth {
            protocol: match arg.to_uppercase().as_str() {
                "TLS" => AuthParam::Tls,
                "SSL" => AuthParam::Ssl,
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            },
        },
        "PBSZ" => Command::Pbsz {
            size: required(arg)?.parse()?,
        },
        "PROT" => Command::Prot {
            param: match arg {
                "C" | "c" => ProtParam::Clear,
                "S" | "s" => ProtParam::Safe,
                "E" | "e" => ProtParam::Confidential,
                "P" | "p" => ProtParam::Private,
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            },
        },
        "SIZE" => Command::Size {
            file: required(arg)?.into(),
        },
        "REST" => Command::Rest {
            offset: required(arg)?.parse()?,
        },
        "MDTM" => parse_mdtm(arg)?,
        "SITE" => Command::Site { param: parse_site(arg)? },
        _ => Command::Other { directive },
    };

    Ok(cmd)
}

fn required(arg: &str) -> Result<&str> {
    if arg.is_empty() {
        return Err(ParseErrorKind::InvalidCommand.into());
    }
    Ok(arg)
}

fn optional(arg: &str) -> Option<String> {
    if arg.is_empty() {
        None
    } else {
        Some(arg.to_string())
    }
}

// Splits the remainder into flags (`-x` tokens) and the argument, the latter
// being the non-flag tokens joined by single spaces. Directives where the
// argument itself may start with a dash keep the remainder untouched.
fn split_flags(directive: &str, remainder: &str) -> (Vec<String>, String) {
    if KEEP_DASH_ARGS.contains(&directive) {
        return (Vec::new(), remainder.to_string());
    }
    let mut flags = Vec::new();
    let mut args = Vec::new();
    for token in remainder.split_whitespace() {
        if is_flag(token) {
            flags.push(token.to_string());
        } else {
            args.push(token);
        }
    }
    (flags, args.join(" "))
}

fn is_flag(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some('-') && matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric() || c == '_') && chars.next().is_none()
}

fn parse_type(arg: &str) -> Result<TypeParam> {
    // TYPE A and TYPE A N select ascii; I and the local byte type L select
    // binary. We track the type but never translate line endings.
    match arg.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('A') => Ok(TypeParam::Ascii),
        Some('I') | Some('L') => Ok(TypeParam::Binary),
        _ => Err(ParseErrorKind::InvalidCommand.into()),
    }
}

// h1,h2,h3,h4,p1,p2 with all six as decimal u8's.
fn parse_port_arg(arg: &str) -> Result<SocketAddrV4> {
    let bytes: Vec<u8> = arg.split(',').map(|t| t.parse::<u8>()).collect::<std::result::Result<Vec<u8>, _>>()?;
    if bytes.len() != 6 {
        return Err(ParseErrorKind::InvalidCommand.into());
    }
    let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = (u16::from(bytes[4]) << 8) | u16::from(bytes[5]);
    Ok(SocketAddrV4::new(ip, port))
}

// |proto|addr|port| where proto is 1 for IPv4 and 2 for IPv6. The delimiter
// is whatever character the client opened with.
fn parse_eprt_arg(arg: &str) -> Result<SocketAddr> {
    let delim = arg.chars().next().ok_or(ParseErrorKind::InvalidCommand)?;
    let parts: Vec<&str> = arg.split(delim).collect();
    // Split of "|1|host|port|" yields ["", "1", "host", "port", ""].
    if parts.len() != 5 || !parts[0].is_empty() || !parts[4].is_empty() {
        return Err(ParseErrorKind::InvalidCommand.into());
    }
    let port: u16 = parts[3].parse()?;
    let ip: IpAddr = match parts[1] {
        "1" => IpAddr::V4(parts[2].parse().map_err(|_| ParseErrorKind::InvalidCommand)?),
        "2" => IpAddr::V6(parts[2].parse().map_err(|_| ParseErrorKind::InvalidCommand)?),
        _ => return Err(ParseErrorKind::UnsupportedProtocol.into()),
    };
    Ok(SocketAddr::new(ip, port))
}

fn parse_opts(arg: &str) -> Result<Opt> {
    let (target, value) = match arg.find(' ') {
        Some(pos) => (&arg[..pos], arg[pos + 1..].trim()),
        None => (arg, ""),
    };
    match target.to_uppercase().as_str() {
        "UTF8" => match value.to_uppercase().as_str() {
            "ON" | "" => Ok(Opt::Utf8 { on: true }),
            "OFF" => Ok(Opt::Utf8 { on: false }),
            _ => Err(ParseErrorKind::InvalidCommand.into()),
        },
        "MLST" => Ok(Opt::MlstFacts {
            facts: value.split(';').filter(|f| !f.is_empty()).map(|f| f.trim().to_string()).collect(),
        }),
        "LIST" => match value.to_uppercase().as_str() {
            "-E" => Ok(Opt::ListFormat { format: ListFormat::Ep }),
            "-L" => Ok(Opt::ListFormat { format: ListFormat::Ls }),
            _ => Err(ParseErrorKind::InvalidCommand.into()),
        },
        _ => Err(ParseErrorKind::InvalidCommand.into()),
    }
}

// MDTM <path>, or the set-mtime form MDTM <YYYYMMDDHHMMSS[.sss]> <path>.
fn parse_mdtm(arg: &str) -> Result<Command> {
    let arg = required(arg)?;
    if let Some((first, rest)) = arg.split_once(' ') {
        let is_timestamp = first.len() >= 14 && first.chars().all(|c| c.is_ascii_digit() || c == '.');
        if is_timestamp && !rest.trim().is_empty() {
            return Ok(Command::MdtmSet { file: rest.trim().into() });
        }
    }
    Ok(Command::Mdtm { file: arg.into() })
}

fn parse_site(arg: &str) -> Result<SiteParam> {
    let arg = required(arg)?;
    let (sub, rest) = match arg.find(' ') {
        Some(pos) => (&arg[..pos], arg[pos + 1..].trim()),
        None => (arg, ""),
    };
    match sub.to_uppercase().as_str() {
        "CHMOD" => {
            let (mode, path) = rest.split_once(' ').ok_or(ParseErrorKind::InvalidCommand)?;
            let mode = u32::from_str_radix(mode, 8).map_err(|_| ParseErrorKind::InvalidCommand)?;
            if path.trim().is_empty() {
                return Err(ParseErrorKind::InvalidCommand.into());
            }
            Ok(SiteParam::Chmod {
                mode,
                path: path.trim().to_string(),
            })
        }
        other => Ok(SiteParam::Other { command: other.to_string() }),
    }
}
