//! Contains the service provider interface for authentication and the
//! anonymous authenticator that ships with the crate.
//!
//! Authentication is a typed request/response: the server hands the
//! [`Authenticator`] a username and [`Credentials`], and gets back a
//! [`LoginGrant`] naming the storage root, the initial working directory and
//! any per-user directive restrictions, or an [`AuthenticationError`].

use async_trait::async_trait;
use std::fmt::Debug;
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

/// What a client presented while logging in.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// The password from PASS, if any was given.
    pub password: Option<String>,
    /// The IP the control connection came from.
    pub source_ip: IpAddr,
}

/// The verdict of a successful login: where the user lives and what they may
/// do.
#[derive(Clone, Debug)]
pub struct LoginGrant {
    /// The storage root, e.g. `"bucket"` or `"bucket/prefix"` for the
    /// object-store backend.
    pub root: String,
    /// The initial working directory of the session.
    pub cwd: PathBuf,
    /// Extra directives denied to this user, on top of the server wide list.
    pub blacklist: Vec<String>,
    /// When non-empty, the only directives allowed to this user.
    pub whitelist: Vec<String>,
}

impl LoginGrant {
    /// A grant for the given root with cwd `/` and no restrictions.
    pub fn new<S: Into<String>>(root: S) -> Self {
        LoginGrant {
            root: root.into(),
            cwd: PathBuf::from("/"),
            blacklist: Vec::new(),
            whitelist: Vec::new(),
        }
    }

    /// Sets the initial working directory.
    pub fn with_cwd<P: Into<PathBuf>>(mut self, cwd: P) -> Self {
        self.cwd = cwd.into();
        self
    }
}

/// The error cases an [`Authenticator`] can produce. The client always sees
/// a generic 530; the distinction is for the logs.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The username is not known.
    #[error("unknown user")]
    BadUser,
    /// The password did not match.
    #[error("bad password")]
    BadPassword,
    /// A password is required but none was supplied.
    #[error("password required")]
    PasswordRequired,
    /// The backing authentication system failed.
    #[error("authentication backend failure")]
    Backend(#[source] crate::BoxError),
}

/// Defines the requirements for implementations that teach the server how to
/// authenticate users.
#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    /// Authenticates the given username with the given credentials.
    async fn authenticate(&self, username: &str, creds: &Credentials) -> Result<LoginGrant, AuthenticationError>;

    /// Implement to set the name of the authenticator. By default it returns
    /// the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// An [`Authenticator`] that accepts any username/password combination and
/// grants everyone the same storage root. Fine for public download servers
/// and tests, nothing else.
#[derive(Debug)]
pub struct AnonymousAuthenticator {
    root: String,
}

impl AnonymousAuthenticator {
    /// Everyone who logs in ends up in `root`.
    pub fn new<S: Into<String>>(root: S) -> Self {
        AnonymousAuthenticator { root: root.into() }
    }
}

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(&self, _username: &str, _creds: &Credentials) -> Result<LoginGrant, AuthenticationError> {
        Ok(LoginGrant::new(self.root.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_accepts_anyone() {
        let auth = AnonymousAuthenticator::new("bucket");
        let creds = Credentials {
            password: Some("whatever".to_string()),
            source_ip: "127.0.0.1".parse().unwrap(),
        };
        let grant = auth.authenticate("anonymous", &creds).await.unwrap();
        assert_eq!(grant.root, "bucket");
        assert_eq!(grant.cwd, PathBuf::from("/"));
        assert!(grant.blacklist.is_empty());
    }
}
