//! Named channel map.
//!
//! All connections for a given logical channel name converge on the same
//! `Relay`, which is what lets a pull on one connection observe a push
//! delivered through a completely separate ingestion path. Channels are
//! created lazily on first use and live for the lifetime of the process.

use crate::coordinator::Relay;
use dashmap::DashMap;
use std::sync::Arc;

/// Channel name → relay coordinator.
#[derive(Default)]
pub struct ChannelMap {
    channels: DashMap<String, Arc<Relay>>,
}

impl ChannelMap {
    /// Create an empty channel map.
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// The relay for a channel name, created on first use.
    pub fn get_or_create(&self, name: &str) -> Arc<Relay> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Relay::new(name)))
            .clone()
    }

    /// The relay for a channel name, if it exists.
    pub fn get(&self, name: &str) -> Option<Arc<Relay>> {
        self.channels.get(name).map(|entry| entry.clone())
    }

    /// Number of channels created so far.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Visit every channel's relay.
    pub fn for_each(&self, mut visitor: impl FnMut(&Arc<Relay>)) {
        for entry in self.channels.iter() {
            visitor(entry.value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn same_name_resolves_to_same_relay() {
        let channels = ChannelMap::new();
        let a = channels.get_or_create("weather");
        let b = channels.get_or_create("weather");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(channels.channel_count(), 1);
    }

    #[test]
    fn channels_are_isolated() {
        let channels = ChannelMap::new();
        let first = channels.get_or_create("first");
        let second = channels.get_or_create("second");

        first.ingest_push(Bytes::from_static(b"payload"));
        assert!(first.latest().is_some());
        assert!(second.latest().is_none());
    }

    #[test]
    fn get_does_not_create() {
        let channels = ChannelMap::new();
        assert!(channels.get("missing").is_none());
        channels.get_or_create("present");
        assert!(channels.get("present").is_some());
    }
}
