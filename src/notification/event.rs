use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// An event pertaining to a client's presence: connection, login, and
/// disconnection. Instances of these are passed to a [`PresenceListener`].
/// To identify the corresponding session see the [`EventMeta`] struct.
#[derive(Debug, Clone)]
pub enum PresenceEvent {
    /// A control connection was accepted.
    Connected,
    /// The user logged in successfully.
    LoggedIn,
    /// The control connection ended, by QUIT or otherwise.
    Disconnected,
}

/// An event signalling the outcome of a data transfer. To identify the
/// corresponding user or session see the [`EventMeta`] struct.
#[derive(Debug, Clone)]
pub enum DataEvent {
    /// A RETR command finished successfully.
    Got {
        /// The path to the file that was sent
        path: String,
        /// The number of bytes transferred to the client
        bytes: u64,
    },
    /// A STOR or APPE command finished successfully.
    Put {
        /// The path to the file that was stored
        path: String,
        /// The number of bytes stored
        bytes: u64,
    },
    /// A RETR failed against the storage backend.
    GotFailed {
        /// The path the client asked for
        path: String,
    },
    /// A STOR or APPE failed against the storage backend.
    PutFailed {
        /// The path the client tried to store
        path: String,
    },
}

/// Metadata identifying the session an event happened on. A sequence number
/// is included to allow ordering in systems where event ordering is not
/// guaranteed.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// The user this event pertains to; "unknown" before login.
    pub username: String,
    /// Identifies the session of a connected client.
    pub trace_id: String,
    /// The event sequence number, incremented per session.
    pub sequence_number: u64,
}

/// A listener for [`DataEvent`]s. Implementations can be passed to
/// [`Server::data_listener`](crate::Server::data_listener) in order to
/// receive notifications.
#[async_trait]
pub trait DataListener: Sync + Send + Debug {
    /// Called after the event happened.
    async fn receive_data_event(&self, e: DataEvent, m: EventMeta);
}

/// A listener for [`PresenceEvent`]s. Implementations can be passed to
/// [`Server::presence_listener`](crate::Server::presence_listener) in order
/// to receive notifications.
#[async_trait]
pub trait PresenceListener: Sync + Send + Debug {
    /// Called after the event happened.
    async fn receive_presence_event(&self, e: PresenceEvent, m: EventMeta);
}

#[async_trait]
impl DataListener for Arc<dyn DataListener> {
    async fn receive_data_event(&self, e: DataEvent, m: EventMeta) {
        self.as_ref().receive_data_event(e, m).await
    }
}

#[async_trait]
impl PresenceListener for Arc<dyn PresenceListener> {
    async fn receive_presence_event(&self, e: PresenceEvent, m: EventMeta) {
        self.as_ref().receive_presence_event(e, m).await
    }
}
