//! The static command registry: one entry per canonical directive, carrying
//! the syntax template, a one line description, the FEAT advertisement
//! string, the pre-authentication flag and the obsolete marker. HELP and
//! FEAT render from this table and the dispatch gate consults it.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Metadata for one directive in the registry.
#[derive(Debug)]
pub struct CommandSpec {
    /// The canonical, uppercase directive.
    pub directive: &'static str,
    /// Obsolete spellings that dispatch to the same handler (e.g. XCWD).
    pub aliases: &'static [&'static str],
    /// Syntax template; `{{cmd}}` is replaced with the directive on display.
    pub syntax: &'static str,
    /// One line description, used by HELP.
    pub description: &'static str,
    /// The string to advertise in the FEAT block, if any.
    pub feat: Option<&'static str>,
    /// True when the directive may be used before authentication.
    pub no_auth: bool,
    /// True for directives kept only for backward compatibility.
    pub obsolete: bool,
}

impl CommandSpec {
    /// The syntax line with the `{{cmd}}` placeholder filled in.
    pub fn syntax_line(&self) -> String {
        self.syntax.replace("{{cmd}}", self.directive)
    }
}

macro_rules! spec {
    ($directive:expr, aliases: $aliases:expr, $syntax:expr, $description:expr, feat: $feat:expr, no_auth: $no_auth:expr, obsolete: $obsolete:expr) => {
        CommandSpec {
            directive: $directive,
            aliases: $aliases,
            syntax: $syntax,
            description: $description,
            feat: $feat,
            no_auth: $no_auth,
            obsolete: $obsolete,
        }
    };
    ($directive:expr, aliases: $aliases:expr, $syntax:expr, $description:expr) => {
        spec!($directive, aliases: $aliases, $syntax, $description, feat: None, no_auth: false, obsolete: false)
    };
    ($directive:expr, $syntax:expr, $description:expr, feat: $feat:expr, no_auth) => {
        spec!($directive, aliases: &[], $syntax, $description, feat: $feat, no_auth: true, obsolete: false)
    };
    ($directive:expr, $syntax:expr, $description:expr, feat: $feat:expr) => {
        spec!($directive, aliases: &[], $syntax, $description, feat: $feat, no_auth: false, obsolete: false)
    };
    ($directive:expr, $syntax:expr, $description:expr, no_auth) => {
        spec!($directive, aliases: &[], $syntax, $description, feat: None, no_auth: true, obsolete: false)
    };
    ($directive:expr, $syntax:expr, $description:expr) => {
        spec!($directive, aliases: &[], $syntax, $description, feat: None, no_auth: false, obsolete: false)
    };
}

lazy_static! {
    static ref REGISTRY: Vec<CommandSpec> = vec![
        spec!("USER", "{{cmd}} <username>", "Authentication username", no_auth),
        spec!("PASS", "{{cmd}} <password>", "Authentication password", no_auth),
        spec!("ACCT", "{{cmd}} <account>", "Account information (not implemented)", no_auth),
        spec!("QUIT", "{{cmd}}", "Close the control connection", no_auth),
        spec!("HELP", "{{cmd}} [<command>]", "Returns usage documentation", no_auth),
        spec!("FEAT", "{{cmd}}", "Get the feature list implemented by the server", no_auth),
        spec!("AUTH", "{{cmd}} <mechanism>", "Upgrade to a secure control channel", feat: Some("AUTH TLS"), no_auth),
        spec!("NOOP", "{{cmd}}", "No operation", no_auth),
        spec!("PBSZ", "{{cmd}} <size>", "Negotiate the protection buffer size", feat: Some("PBSZ"), no_auth),
        spec!("PROT", "{{cmd}} <level>", "Set the data channel protection level", feat: Some("PROT"), no_auth),
        spec!("OPTS", "{{cmd}} <option> [<value>]", "Select options for a feature", no_auth),
        spec!("SYST", "{{cmd}}", "Return the system type"),
        spec!("TYPE", "{{cmd}} <type>", "Set the transfer representation type"),
        spec!("MODE", "{{cmd}} <mode>", "Set the transfer mode"),
        spec!("STRU", "{{cmd}} <structure>", "Set the file structure"),
        spec!("STAT", "{{cmd}} [<path>]", "Return server, file or directory status"),
        spec!("PWD", aliases: &["XPWD"], "{{cmd}}", "Print the working directory"),
        spec!("CWD", aliases: &["XCWD"], "{{cmd}} <path>", "Change the working directory"),
        spec!("CDUP", aliases: &["XCUP"], "{{cmd}}", "Change to the parent directory"),
        spec!("MKD", aliases: &["XMKD"], "{{cmd}} <path>", "Make a directory"),
        spec!("RMD", aliases: &["XRMD"], "{{cmd}} <path>", "Remove a directory"),
        spec!("DELE", "{{cmd}} <path>", "Delete a file"),
        spec!("RNFR", "{{cmd}} <path>", "Rename from"),
        spec!("RNTO", "{{cmd}} <path>", "Rename to"),
        spec!("LIST", "{{cmd}} [<path>]", "Return a directory listing"),
        spec!("NLST", "{{cmd}} [<path>]", "Return a name list of a directory"),
        spec!("MLSD", "{{cmd}} [<path>]", "Machine readable directory listing"),
        spec!(
            "MLST",
            "{{cmd}} [<path>]",
            "Machine readable facts for a single object",
            feat: Some("MLST Type*;Size*;Modify*;Perm*;UNIX.mode*;")
        ),
        spec!("SIZE", "{{cmd}} <path>", "Return the size of a file in bytes", feat: Some("SIZE")),
        spec!("MDTM", "{{cmd}} <path>", "Return the modification time of a file", feat: Some("MDTM")),
        spec!("PASV", "{{cmd}}", "Enter passive mode", feat: Some("PASV")),
        spec!("EPSV", "{{cmd}}", "Enter extended passive mode", feat: Some("EPSV")),
        spec!("PORT", "{{cmd}} <h1,h2,h3,h4,p1,p2>", "Open an active data connection"),
        spec!("EPRT", "{{cmd}} |<proto>|<addr>|<port>|", "Open an extended active data connection", feat: Some("EPRT")),
        spec!("REST", "{{cmd}} <offset>", "Restart the next transfer at a byte offset", feat: Some("REST STREAM")),
        spec!("RETR", "{{cmd}} <path>", "Retrieve a file"),
        spec!("STOR", "{{cmd}} <path>", "Store a file"),
        spec!("STOU", "{{cmd}} [<name>]", "Store a file under a unique name"),
        spec!("APPE", "{{cmd}} <path>", "Append to a file"),
        spec!("ABOR", "{{cmd}}", "Abort the transfer in progress"),
        spec!("ALLO", aliases: &[], "{{cmd}} [<size>]", "Allocate storage", feat: None, no_auth: false, obsolete: true),
        spec!("SITE", "{{cmd}} <subcommand>", "Site specific commands"),
    ];
    static ref INDEX: HashMap<&'static str, &'static CommandSpec> = {
        let mut index = HashMap::new();
        for spec in REGISTRY.iter() {
            index.insert(spec.directive, spec);
            for alias in spec.aliases {
                index.insert(*alias, spec);
            }
        }
        index
    };
}

/// Looks a directive up by canonical name or alias. The lookup is done on the
/// uppercased directive; the parser guarantees that.
pub fn lookup(directive: &str) -> Option<&'static CommandSpec> {
    INDEX.get(directive).copied()
}

/// All registered directives in registration order.
pub fn all() -> &'static [CommandSpec] {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical() {
        assert_eq!(lookup("XCWD").unwrap().directive, "CWD");
        assert_eq!(lookup("XPWD").unwrap().directive, "PWD");
        assert_eq!(lookup("XMKD").unwrap().directive, "MKD");
        assert_eq!(lookup("XRMD").unwrap().directive, "RMD");
        assert_eq!(lookup("XCUP").unwrap().directive, "CDUP");
    }

    #[test]
    fn unknown_directive_is_absent() {
        assert!(lookup("FROB").is_none());
    }

    #[test]
    fn pre_auth_set_is_exactly_the_documented_one() {
        let mut no_auth: Vec<&str> = all().iter().filter(|s| s.no_auth).map(|s| s.directive).collect();
        no_auth.sort_unstable();
        assert_eq!(
            no_auth,
            vec!["ACCT", "AUTH", "FEAT", "HELP", "NOOP", "OPTS", "PASS", "PBSZ", "PROT", "QUIT", "USER"]
        );
    }

    #[test]
    fn syntax_placeholder_renders() {
        assert_eq!(lookup("CWD").unwrap().syntax_line(), "CWD <path>");
    }
}
