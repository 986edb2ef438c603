// ABOUTME: Channel registry
// ABOUTME: Thread-safe owner of all channel records, caps, broadcast groups, and stats

use crate::error::RelayError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opaque channel identifier, unique among currently-live channels
pub type ChannelId = String;

/// Identifier of one subscriber connection within a broadcast group
pub type SubscriberId = String;

/// Message types that can be relayed to a subscriber connection
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// JSON text message (config delivery, end-of-transmission)
    Text(String),
    /// Forwarded audio batch, verbatim and uncompressed
    Binary(Vec<u8>),
}

/// Per-channel counters, all monotonically non-decreasing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Total audio payload bytes received from the publisher
    pub bytes_in: u64,
    /// Total audio payload bytes billed to subscribers. Uses the subscriber
    /// count observed at forwarding time, so a late joiner is retroactively
    /// billed for bytes it never received.
    pub bytes_out: u64,
    /// Lifetime count of subscriber joins; never decremented
    pub connections: u64,
}

/// A live channel record
///
/// Owned exclusively by the [`ChannelRegistry`]; sessions hold only the
/// [`ChannelId`] and re-resolve through the registry on every operation.
#[derive(Debug)]
pub struct Channel {
    /// Opaque configuration, set exactly once at activation. A channel is
    /// active precisely when this is `Some`.
    config: Option<serde_json::Value>,
    /// Broadcast group: senders for every joined subscriber connection
    subscribers: HashMap<SubscriberId, mpsc::UnboundedSender<ServerMessage>>,
    stats: ChannelStats,
}

impl Channel {
    fn new() -> Self {
        Self {
            config: None,
            subscribers: HashMap::new(),
            stats: ChannelStats::default(),
        }
    }

    /// Whether configuration has been accepted
    pub fn is_active(&self) -> bool {
        self.config.is_some()
    }

    /// Number of currently joined subscribers
    pub fn client_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Current counter values
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Senders for every member of the broadcast group
    pub fn subscriber_senders(
        &self,
    ) -> impl Iterator<Item = &mpsc::UnboundedSender<ServerMessage>> {
        self.subscribers.values()
    }
}

/// Point-in-time view of one channel, for monitoring
#[derive(Debug, Clone)]
pub struct ChannelSummary {
    /// Whether the channel has been configured
    pub active: bool,
    /// Current subscriber count
    pub clients: usize,
    /// Counter values
    pub stats: ChannelStats,
}

/// Owns the id-to-channel mapping and enforces the global channel cap and
/// the per-channel subscriber cap.
///
/// Every mutation of a channel record happens under this registry's lock,
/// one at a time; sessions never hold a direct reference to a record.
/// Cloning shares the underlying map.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: Arc<RwLock<HashMap<ChannelId, Channel>>>,
    max_channels: usize,
    max_clients: usize,
}

impl ChannelRegistry {
    /// Create a registry with the given caps
    pub fn new(max_channels: usize, max_clients: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            max_channels,
            max_clients,
        }
    }

    /// Allocate an inactive channel with zeroed stats and return its id.
    ///
    /// Fails with [`RelayError::CapacityExceeded`] when the server already
    /// hosts `max_channels` live channels. Ids come from a cryptographically
    /// strong random source (UUIDv4); collision probability is negligible
    /// and no retry loop is attempted.
    pub fn allocate(&self) -> crate::Result<ChannelId> {
        let mut channels = self.channels.write();

        if channels.len() >= self.max_channels {
            return Err(RelayError::CapacityExceeded);
        }

        let id = uuid::Uuid::new_v4().to_string();
        channels.insert(id.clone(), Channel::new());
        log::info!("Channel {} allocated, live channels: {}", id, channels.len());

        Ok(id)
    }

    /// Activate a channel by attaching its configuration.
    ///
    /// The config is set at most once per channel lifetime; a second attempt
    /// fails with [`RelayError::AlreadyActive`] and the first value is kept.
    pub fn activate(&self, id: &str, config: serde_json::Value) -> crate::Result<()> {
        let mut channels = self.channels.write();
        let channel = channels.get_mut(id).ok_or(RelayError::InvalidChannel)?;

        if channel.is_active() {
            return Err(RelayError::AlreadyActive);
        }

        channel.config = Some(config);
        log::info!("Channel {} activated", id);
        Ok(())
    }

    /// Remove a channel record, returning it so the caller can notify the
    /// broadcast group. Idempotent: returns `None` when the id is not live.
    pub fn release(&self, id: &str) -> Option<Channel> {
        let mut channels = self.channels.write();
        let channel = channels.remove(id);
        if channel.is_some() {
            log::info!("Channel {} released, live channels: {}", id, channels.len());
        }
        channel
    }

    /// Join a subscriber to a channel's broadcast group.
    ///
    /// An unresolved or not-yet-active channel is indistinguishable to a
    /// subscriber ([`RelayError::InvalidChannel`] for both); a full group
    /// fails with [`RelayError::ListenerLimitExceeded`]. On success the
    /// cumulative connection counter is bumped and the channel's config is
    /// returned for delivery to the new member.
    pub fn join(
        &self,
        id: &str,
        subscriber_id: &str,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> crate::Result<serde_json::Value> {
        let mut channels = self.channels.write();
        let channel = channels.get_mut(id).ok_or(RelayError::InvalidChannel)?;
        let config = channel.config.clone().ok_or(RelayError::InvalidChannel)?;

        if channel.subscribers.len() >= self.max_clients {
            return Err(RelayError::ListenerLimitExceeded);
        }

        channel
            .subscribers
            .insert(subscriber_id.to_string(), sender);
        channel.stats.connections += 1;
        log::info!(
            "Subscriber {} joined channel {}, clients: {}",
            subscriber_id,
            id,
            channel.subscribers.len()
        );

        Ok(config)
    }

    /// Remove a subscriber from a channel's broadcast group.
    ///
    /// The cumulative connection counter is untouched. No-op when the
    /// channel has already been released.
    pub fn leave(&self, id: &str, subscriber_id: &str) {
        let mut channels = self.channels.write();
        if let Some(channel) = channels.get_mut(id) {
            if channel.subscribers.remove(subscriber_id).is_some() {
                log::debug!(
                    "Subscriber {} left channel {}, clients: {}",
                    subscriber_id,
                    id,
                    channel.subscribers.len()
                );
            }
        }
    }

    /// Forward one audio batch to every member of the channel's broadcast
    /// group, verbatim and without compression.
    ///
    /// `payload_bytes` (the sum of the batch's frame lengths) is added to
    /// `bytes_in`, and `payload_bytes` times the current subscriber count to
    /// `bytes_out`. Returns the number of group members the batch was handed
    /// to. Fails with [`RelayError::NotActive`] before configuration.
    pub fn forward(&self, id: &str, payload_bytes: u64, payload: &[u8]) -> crate::Result<usize> {
        let mut channels = self.channels.write();
        let channel = channels.get_mut(id).ok_or(RelayError::InvalidChannel)?;

        if !channel.is_active() {
            return Err(RelayError::NotActive);
        }

        channel.stats.bytes_in += payload_bytes;
        channel.stats.bytes_out += payload_bytes * channel.subscribers.len() as u64;

        for sender in channel.subscribers.values() {
            // A closed receiver means the subscriber is mid-teardown; its
            // leave() will clean the entry up.
            let _ = sender.send(ServerMessage::Binary(payload.to_vec()));
        }

        Ok(channel.subscribers.len())
    }

    /// Whether the id resolves to a live channel
    pub fn contains(&self, id: &str) -> bool {
        self.channels.read().contains_key(id)
    }

    /// A channel's current counters, if it is live
    pub fn stats(&self, id: &str) -> Option<ChannelStats> {
        self.channels.read().get(id).map(|c| c.stats)
    }

    /// A channel's current subscriber count, if it is live
    pub fn client_count(&self, id: &str) -> Option<usize> {
        self.channels.read().get(id).map(|c| c.client_count())
    }

    /// A channel's configuration, if it is live and active
    pub fn config(&self, id: &str) -> Option<serde_json::Value> {
        self.channels.read().get(id).and_then(|c| c.config.clone())
    }

    /// Number of live channels
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Point-in-time view of every live channel, for monitoring
    pub fn snapshot(&self) -> Vec<(ChannelId, ChannelSummary)> {
        self.channels
            .read()
            .iter()
            .map(|(id, channel)| {
                (
                    id.clone(),
                    ChannelSummary {
                        active: channel.is_active(),
                        clients: channel.client_count(),
                        stats: channel.stats,
                    },
                )
            })
            .collect()
    }
}

impl Clone for ChannelRegistry {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
            max_channels: self.max_channels,
            max_clients: self.max_clients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn subscriber() -> (
        mpsc::UnboundedSender<ServerMessage>,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_allocate_distinct_ids_up_to_capacity() {
        let registry = ChannelRegistry::new(3, 4);

        let ids: HashSet<ChannelId> = (0..3).map(|_| registry.allocate().unwrap()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(registry.channel_count(), 3);

        // The next attempt fails and the live count is unchanged.
        assert_eq!(registry.allocate(), Err(RelayError::CapacityExceeded));
        assert_eq!(registry.channel_count(), 3);
    }

    #[test]
    fn test_activate_exactly_once() {
        let registry = ChannelRegistry::new(8, 4);
        let id = registry.allocate().unwrap();

        registry.activate(&id, json!({"codec": "x"})).unwrap();
        assert_eq!(
            registry.activate(&id, json!({"codec": "y"})),
            Err(RelayError::AlreadyActive)
        );

        // The first config is retained.
        assert_eq!(registry.config(&id), Some(json!({"codec": "x"})));
    }

    #[test]
    fn test_activate_unknown_channel() {
        let registry = ChannelRegistry::new(8, 4);
        assert_eq!(
            registry.activate("nope", json!({})),
            Err(RelayError::InvalidChannel)
        );
    }

    #[test]
    fn test_join_requires_active_channel() {
        let registry = ChannelRegistry::new(8, 4);
        let id = registry.allocate().unwrap();
        let (tx, _rx) = subscriber();

        // Allocated but unconfigured looks like an unknown channel to rx.
        assert_eq!(
            registry.join(&id, "sub-1", tx.clone()),
            Err(RelayError::InvalidChannel)
        );
        assert_eq!(registry.client_count(&id), Some(0));

        assert_eq!(
            registry.join("nope", "sub-1", tx),
            Err(RelayError::InvalidChannel)
        );
    }

    #[test]
    fn test_listener_limit() {
        let registry = ChannelRegistry::new(8, 1);
        let id = registry.allocate().unwrap();
        registry.activate(&id, json!({"codec": "x"})).unwrap();

        let (tx1, _rx1) = subscriber();
        let config = registry.join(&id, "sub-1", tx1).unwrap();
        assert_eq!(config, json!({"codec": "x"}));
        assert_eq!(registry.client_count(&id), Some(1));

        let (tx2, _rx2) = subscriber();
        assert_eq!(
            registry.join(&id, "sub-2", tx2),
            Err(RelayError::ListenerLimitExceeded)
        );
        assert_eq!(registry.client_count(&id), Some(1));
        assert_eq!(registry.stats(&id).unwrap().connections, 1);
    }

    #[test]
    fn test_forward_accounting_and_fanout() {
        let registry = ChannelRegistry::new(8, 4);
        let id = registry.allocate().unwrap();
        registry.activate(&id, json!({})).unwrap();

        let (tx1, mut rx1) = subscriber();
        let (tx2, mut rx2) = subscriber();
        registry.join(&id, "sub-1", tx1).unwrap();
        registry.join(&id, "sub-2", tx2).unwrap();

        let payload = vec![7u8; 64];
        let delivered = registry.forward(&id, 1000, &payload).unwrap();
        assert_eq!(delivered, 2);

        let stats = registry.stats(&id).unwrap();
        assert_eq!(stats.bytes_in, 1000);
        assert_eq!(stats.bytes_out, 2000);

        for rx in [&mut rx1, &mut rx2] {
            match rx.try_recv().unwrap() {
                ServerMessage::Binary(data) => assert_eq!(data, payload),
                other => panic!("expected binary, got {:?}", other),
            }
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_forward_before_activation() {
        let registry = ChannelRegistry::new(8, 4);
        let id = registry.allocate().unwrap();

        assert_eq!(registry.forward(&id, 10, &[0; 14]), Err(RelayError::NotActive));
        assert_eq!(registry.stats(&id).unwrap(), ChannelStats::default());

        assert_eq!(
            registry.forward("nope", 10, &[0; 14]),
            Err(RelayError::InvalidChannel)
        );
    }

    #[test]
    fn test_forward_with_empty_group() {
        let registry = ChannelRegistry::new(8, 4);
        let id = registry.allocate().unwrap();
        registry.activate(&id, json!({})).unwrap();

        assert_eq!(registry.forward(&id, 500, &[0; 504]).unwrap(), 0);

        let stats = registry.stats(&id).unwrap();
        assert_eq!(stats.bytes_in, 500);
        assert_eq!(stats.bytes_out, 0);
    }

    #[test]
    fn test_release_is_idempotent_and_returns_group() {
        let registry = ChannelRegistry::new(8, 4);
        let id = registry.allocate().unwrap();
        registry.activate(&id, json!({})).unwrap();

        let (tx, _rx) = subscriber();
        registry.join(&id, "sub-1", tx).unwrap();

        let channel = registry.release(&id).unwrap();
        assert_eq!(channel.subscriber_senders().count(), 1);
        assert!(!registry.contains(&id));

        assert!(registry.release(&id).is_none());
    }

    #[test]
    fn test_leave_decrements_but_connections_accumulate() {
        let registry = ChannelRegistry::new(8, 4);
        let id = registry.allocate().unwrap();
        registry.activate(&id, json!({})).unwrap();

        let (tx1, _rx1) = subscriber();
        let (tx2, _rx2) = subscriber();
        registry.join(&id, "sub-1", tx1).unwrap();
        registry.join(&id, "sub-2", tx2).unwrap();
        assert_eq!(registry.client_count(&id), Some(2));

        registry.leave(&id, "sub-1");
        assert_eq!(registry.client_count(&id), Some(1));
        assert_eq!(registry.stats(&id).unwrap().connections, 2);

        // Leaving twice, or after release, is a no-op.
        registry.leave(&id, "sub-1");
        assert_eq!(registry.client_count(&id), Some(1));
        registry.release(&id);
        registry.leave(&id, "sub-2");
    }

    #[test]
    fn test_rejoin_after_leave_uses_freed_slot() {
        let registry = ChannelRegistry::new(8, 1);
        let id = registry.allocate().unwrap();
        registry.activate(&id, json!({})).unwrap();

        let (tx1, _rx1) = subscriber();
        registry.join(&id, "sub-1", tx1).unwrap();
        registry.leave(&id, "sub-1");

        let (tx2, _rx2) = subscriber();
        registry.join(&id, "sub-2", tx2).unwrap();
        assert_eq!(registry.client_count(&id), Some(1));
        assert_eq!(registry.stats(&id).unwrap().connections, 2);
    }
}
