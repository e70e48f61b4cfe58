//! This module contains the implementations for the FTP commands defined in
//!
//! - [RFC 959 - FTP](https://tools.ietf.org/html/rfc959)
//! - [RFC 2228 - FTP Security Extensions](https://tools.ietf.org/html/rfc2228)
//! - [RFC 2389 - Feature negotiation](https://tools.ietf.org/html/rfc2389)
//! - [RFC 2428 - FTP Extensions for IPv6 and NATs](https://tools.ietf.org/html/rfc2428)
//! - [RFC 3659 - Extensions to FTP](https://tools.ietf.org/html/rfc3659)

pub mod registry;

mod abor;
mod acct;
mod allo;
mod appe;
mod auth;
mod cdup;
mod cwd;
mod dele;
mod eprt;
mod epsv;
mod feat;
mod help;
mod list;
mod mdtm;
mod mkd;
mod mlsd;
mod mlst;
mod mode;
mod nlst;
mod noop;
mod opts;
mod pass;
mod passive_common;
mod pasv;
mod pbsz;
mod port;
mod prot;
mod pwd;
mod quit;
mod rest;
mod retr;
mod rmd;
mod rnfr;
mod rnto;
mod site;
mod size;
mod stat;
mod stor;
mod stou;
mod stru;
mod syst;
mod type_;
mod user;

pub use abor::Abor;
pub use acct::Acct;
pub use allo::Allo;
pub use appe::Appe;
pub use auth::{Auth, AuthParam};
pub use cdup::Cdup;
pub use cwd::Cwd;
pub use dele::Dele;
pub use eprt::Eprt;
pub use epsv::Epsv;
pub use feat::Feat;
pub use help::Help;
pub use list::List;
pub use mdtm::{Mdtm, MdtmSet};
pub use mkd::Mkd;
pub use mlsd::Mlsd;
pub use mlst::Mlst;
pub use mode::{Mode, ModeParam};
pub use nlst::Nlst;
pub use noop::Noop;
pub use opts::{Opt, Opts};
pub use pass::Pass;
pub use pasv::Pasv;
pub use pbsz::Pbsz;
pub use port::Port;
pub use prot::{Prot, ProtParam};
pub use pwd::Pwd;
pub use quit::Quit;
pub use rest::Rest;
pub use retr::Retr;
pub use rmd::Rmd;
pub use rnfr::Rnfr;
pub use rnto::Rnto;
pub use site::{Site, SiteParam};
pub use size::Size;
pub use stat::Stat;
pub use stor::Stor;
pub use stou::Stou;
pub use stru::{Stru, StruParam};
pub use syst::Syst;
pub use type_::{Type, TypeParam};
pub use user::User;

use crate::server::session::SharedSession;
use crate::storage::{Metadata, StorageBackend};
use std::sync::Arc;

// The storage handle of a logged in session. The dispatch gate guarantees
// authenticated state for every handler that calls this; None only happens
// when that guarantee is broken.
pub(crate) async fn storage_of<S>(session: &SharedSession<S>) -> Option<Arc<S>>
where
    S: StorageBackend,
    S::Metadata: Metadata,
{
    session.lock().await.storage.as_ref().map(Arc::clone)
}

// Quotes a path for 257 replies: wrapped in double quotes with embedded
// quotes doubled, per RFC 959.
pub(crate) fn quote_path(path: &std::path::Path) -> String {
    format!("\"{}\"", path.display().to_string().replace('"', "\"\""))
}
