use super::error::ParseErrorKind;
use super::parse;
use crate::server::controlchan::command::Command;
use crate::server::controlchan::commands::{AuthParam, Opt, ProtParam, SiteParam, StruParam, TypeParam};
use crate::server::options::ListFormat;

use pretty_assertions::assert_eq;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4};

#[test]
fn parse_user_cmd_crnl() {
    let input = "USER Dolores\r\n";
    assert_eq!(
        parse(input).unwrap(),
        Command::User {
            username: "Dolores".into()
        }
    );
}

#[test]
fn parse_user_lowercase_directive() {
    let input = "user Dolores\r\n";
    assert_eq!(
        parse(input).unwrap(),
        Command::User {
            username: "Dolores".into()
        }
    );
}

#[test]
fn parse_rejects_empty_line() {
    assert_eq!(*parse("\r\n").unwrap_err().kind(), ParseErrorKind::EmptyLine);
    assert_eq!(*parse("   \r\n").unwrap_err().kind(), ParseErrorKind::EmptyLine);
}

#[test]
fn parse_rejects_overlong_line() {
    let line = format!("STOR {}\r\n", "x".repeat(600));
    assert_eq!(*parse(line).unwrap_err().kind(), ParseErrorKind::LineTooLong);
}

#[test]
fn parse_rejects_bad_directives() {
    // longer than four characters
    assert_eq!(*parse("RETRIEVE f\r\n").unwrap_err().kind(), ParseErrorKind::InvalidDirective);
    // non-letters in the directive
    assert_eq!(*parse("R3TR f\r\n").unwrap_err().kind(), ParseErrorKind::InvalidDirective);
}

#[test]
fn parse_unknown_directive_is_other() {
    assert_eq!(parse("FROB\r\n").unwrap(), Command::Other { directive: "FROB".into() });
}

#[test]
fn parse_strips_control_characters() {
    assert_eq!(
        parse("USER Dolo\x07res\r\n").unwrap(),
        Command::User {
            username: "Dolores".into()
        }
    );
}

#[test]
fn parse_pass_masks_password() {
    let input = "PASS s3cr3t\r\n";
    let cmd = parse(input).unwrap();
    assert_eq!(format!("{:?}", cmd), "Pass { password: Password { bytes: ******* } }");
}

#[test]
fn parse_list_flags_and_path() {
    assert_eq!(
        parse("LIST -a -l sub dir\r\n").unwrap(),
        Command::List {
            flags: vec!["-a".into(), "-l".into()],
            path: Some("sub dir".into()),
        }
    );
    assert_eq!(
        parse("LIST\r\n").unwrap(),
        Command::List {
            flags: vec![],
            path: None
        }
    );
}

#[test]
fn parse_retr_keeps_dash_names() {
    // RETR, STOR and SIZE arguments may look like flags and must survive.
    assert_eq!(parse("RETR -a\r\n").unwrap(), Command::Retr { path: "-a".into() });
    assert_eq!(parse("STOR -x\r\n").unwrap(), Command::Stor { path: "-x".into() });
    assert_eq!(parse("SIZE -l\r\n").unwrap(), Command::Size { file: "-l".into() });
}

#[test]
fn parse_type_variants() {
    assert_eq!(parse("TYPE A\r\n").unwrap(), Command::Type { type_param: TypeParam::Ascii });
    assert_eq!(parse("TYPE A N\r\n").unwrap(), Command::Type { type_param: TypeParam::Ascii });
    assert_eq!(parse("TYPE I\r\n").unwrap(), Command::Type { type_param: TypeParam::Binary });
    assert_eq!(parse("TYPE L 8\r\n").unwrap(), Command::Type { type_param: TypeParam::Binary });
    assert_eq!(*parse("TYPE X\r\n").unwrap_err().kind(), ParseErrorKind::InvalidCommand);
}

#[test]
fn parse_port_happy() {
    assert_eq!(
        parse("PORT 127,0,0,1,4,1\r\n").unwrap(),
        Command::Port {
            addr: SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 1025)
        }
    );
}

#[test]
fn parse_port_rejects_bad_tuples() {
    assert_eq!(*parse("PORT 127,0,0,1,4\r\n").unwrap_err().kind(), ParseErrorKind::InvalidCommand);
    assert_eq!(*parse("PORT 300,0,0,1,4,1\r\n").unwrap_err().kind(), ParseErrorKind::InvalidCommand);
}

#[test]
fn parse_eprt_v4_and_v6() {
    assert_eq!(
        parse("EPRT |1|132.235.1.2|6275|\r\n").unwrap(),
        Command::Eprt {
            addr: (Ipv4Addr::new(132, 235, 1, 2), 6275).into()
        }
    );
    assert_eq!(
        parse("EPRT |2|1080::8:800:200C:417A|5282|\r\n").unwrap(),
        Command::Eprt {
            addr: ("1080::8:800:200C:417A".parse::<Ipv6Addr>().unwrap(), 5282).into()
        }
    );
}

#[test]
fn parse_eprt_unknown_protocol() {
    assert_eq!(*parse("EPRT |3|1.2.3.4|2000|\r\n").unwrap_err().kind(), ParseErrorKind::UnsupportedProtocol);
}

#[test]
fn parse_alias_directives() {
    assert_eq!(parse("XPWD\r\n").unwrap(), Command::Pwd);
    assert_eq!(parse("XCUP\r\n").unwrap(), Command::Cdup);
    assert_eq!(parse("XCWD /tmp\r\n").unwrap(), Command::Cwd { path: "/tmp".into() });
    assert_eq!(parse("XMKD books\r\n").unwrap(), Command::Mkd { path: "books".into() });
    assert_eq!(parse("XRMD books\r\n").unwrap(), Command::Rmd { path: "books".into() });
}

#[test]
fn parse_rest_offset() {
    assert_eq!(parse("REST 1024\r\n").unwrap(), Command::Rest { offset: 1024 });
    assert_eq!(*parse("REST -1\r\n").unwrap_err().kind(), ParseErrorKind::InvalidCommand);
    assert_eq!(*parse("REST\r\n").unwrap_err().kind(), ParseErrorKind::InvalidCommand);
}

#[test]
fn parse_auth_prot_stru() {
    assert_eq!(parse("AUTH TLS\r\n").unwrap(), Command::Auth { protocol: AuthParam::Tls });
    assert_eq!(parse("PROT P\r\n").unwrap(), Command::Prot { param: ProtParam::Private });
    assert_eq!(parse("STRU F\r\n").unwrap(), Command::Stru { structure: StruParam::File });
}

#[test]
fn parse_opts_variants() {
    assert_eq!(parse("OPTS UTF8 ON\r\n").unwrap(), Command::Opts { option: Opt::Utf8 { on: true } });
    assert_eq!(parse("OPTS UTF8 OFF\r\n").unwrap(), Command::Opts { option: Opt::Utf8 { on: false } });
    assert_eq!(
        parse("OPTS MLST Type;Size;Modify\r\n").unwrap(),
        Command::Opts {
            option: Opt::MlstFacts {
                facts: vec!["Type".into(), "Size".into(), "Modify".into()]
            }
        }
    );
    assert_eq!(
        parse("OPTS LIST -E\r\n").unwrap(),
        Command::Opts {
            option: Opt::ListFormat { format: ListFormat::Ep }
        }
    );
}

#[test]
fn parse_mdtm_forms() {
    assert_eq!(parse("MDTM a.txt\r\n").unwrap(), Command::Mdtm { file: "a.txt".into() });
    // the set-mtime form is recognized so the handler can acknowledge it
    assert_eq!(
        parse("MDTM 20240102030405.123 a.txt\r\n").unwrap(),
        Command::MdtmSet { file: "a.txt".into() }
    );
}

#[test]
fn parse_site_chmod() {
    assert_eq!(
        parse("SITE CHMOD 644 a.txt\r\n").unwrap(),
        Command::Site {
            param: SiteParam::Chmod {
                mode: 0o644,
                path: "a.txt".into()
            }
        }
    );
    assert_eq!(
        parse("SITE IDLE 60\r\n").unwrap(),
        Command::Site {
            param: SiteParam::Other { command: "IDLE".into() }
        }
    );
}

#[test]
fn parse_noop_rejects_params() {
    assert_eq!(*parse("NOOP bla\r\n").unwrap_err().kind(), ParseErrorKind::InvalidCommand);
}

#[test]
fn every_registered_directive_is_dispatchable() {
    use crate::server::controlchan::commands::registry;

    // A representative, syntactically valid line per directive. If a
    // registry entry is missing here, or parses to Other, FEAT/HELP would
    // advertise something the dispatcher cannot handle.
    let samples: std::collections::HashMap<&str, &str> = [
        ("USER", "USER u"),
        ("PASS", "PASS p"),
        ("ACCT", "ACCT a"),
        ("QUIT", "QUIT"),
        ("HELP", "HELP"),
        ("FEAT", "FEAT"),
        ("AUTH", "AUTH TLS"),
        ("NOOP", "NOOP"),
        ("PBSZ", "PBSZ 0"),
        ("PROT", "PROT P"),
        ("OPTS", "OPTS UTF8 ON"),
        ("SYST", "SYST"),
        ("TYPE", "TYPE I"),
        ("MODE", "MODE S"),
        ("STRU", "STRU F"),
        ("STAT", "STAT"),
        ("PWD", "PWD"),
        ("CWD", "CWD /"),
        ("CDUP", "CDUP"),
        ("MKD", "MKD d"),
        ("RMD", "RMD d"),
        ("DELE", "DELE f"),
        ("RNFR", "RNFR f"),
        ("RNTO", "RNTO f"),
        ("LIST", "LIST"),
        ("NLST", "NLST"),
        ("MLSD", "MLSD"),
        ("MLST", "MLST"),
        ("SIZE", "SIZE f"),
        ("MDTM", "MDTM f"),
        ("PASV", "PASV"),
        ("EPSV", "EPSV"),
        ("PORT", "PORT 127,0,0,1,4,1"),
        ("EPRT", "EPRT |1|127.0.0.1|1025|"),
        ("REST", "REST 0"),
        ("RETR", "RETR f"),
        ("STOR", "STOR f"),
        ("STOU", "STOU"),
        ("APPE", "APPE f"),
        ("ABOR", "ABOR"),
        ("ALLO", "ALLO"),
        ("SITE", "SITE CHMOD 644 f"),
    ]
    .into_iter()
    .collect();

    for spec in registry::all() {
        let line = samples
            .get(spec.directive)
            .unwrap_or_else(|| panic!("no sample line for registered directive {}", spec.directive));
        let cmd = parse(format!("{}\r\n", line)).unwrap_or_else(|e| panic!("{} did not parse: {:?}", spec.directive, e));
        assert!(
            !matches!(cmd, Command::Other { .. }),
            "{} parsed to Other and would not dispatch",
            spec.directive
        );
        assert_eq!(cmd.directive(), spec.directive);
    }
}
