use super::{DataEvent, DataListener, EventMeta, PresenceEvent, PresenceListener};
use async_trait::async_trait;

/// A listener that does nothing; the default when no listener is registered.
#[derive(Debug)]
pub struct NopListener;

#[async_trait]
impl DataListener for NopListener {
    async fn receive_data_event(&self, _e: DataEvent, _m: EventMeta) {}
}

#[async_trait]
impl PresenceListener for NopListener {
    async fn receive_presence_event(&self, _e: PresenceEvent, _m: EventMeta) {}
}
