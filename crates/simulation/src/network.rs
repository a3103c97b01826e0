//! Simulated transport with deterministic latency and replication lag.

use concord_core::{ChannelRouter, Delivery, EventSink, MessageChannel, PeerStateStore};
use concord_types::{EventCode, EventKind, PeerId};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// Configuration for the simulated transport.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Time between two ticks of every peer.
    pub tick_interval: Duration,
    /// Delay before a broadcast reaches the other peers' queues.
    pub message_latency: Duration,
    /// Delay before a property write becomes visible to other peers.
    pub replication_lag: Duration,
    /// When false, property writes never reach other peers.
    pub replication_enabled: bool,
    /// When true, every `Command` broadcast is delivered twice.
    pub duplicate_commands: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            message_latency: Duration::from_millis(50),
            replication_lag: Duration::from_millis(50),
            replication_enabled: true,
            duplicate_commands: false,
        }
    }
}

/// Counters kept by the simulated transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    pub events_sent: u64,
    pub events_delivered: u64,
    pub events_unclaimed: u64,
    pub property_writes: u64,
}

#[derive(Debug)]
struct InFlight {
    to: PeerId,
    code: EventCode,
    payload: String,
}

#[derive(Debug, Default)]
struct Inner {
    now: Duration,
    seq: u64,
    /// Broadcasts ordered by delivery time, then send order.
    in_flight: BTreeMap<(Duration, u64), InFlight>,
    /// Per-peer write log: key -> [(visible_at, value)], in write order.
    properties: HashMap<PeerId, HashMap<String, Vec<(Duration, i32)>>>,
    routers: BTreeMap<PeerId, ChannelRouter>,
    stats: NetworkStats,
}

/// In-memory broadcast bus plus replicated property store.
///
/// Shared by all peers of one simulation. Each peer talks to it through its
/// own [`SimTransport`], which can only write that peer's entry.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: Mutex<NetworkConfig>,
    inner: Mutex<Inner>,
}

impl SimulatedNetwork {
    /// Create a new simulated network.
    pub fn new(config: NetworkConfig) -> Arc<Self> {
        Arc::new(Self {
            config: Mutex::new(config),
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Attach a peer and return its transport handle.
    ///
    /// Returns `None` if the peer is already attached: a second handle would
    /// be a second writer for the same entry.
    pub fn attach(self: &Arc<Self>, peer: PeerId) -> Option<Arc<SimTransport>> {
        let mut inner = self.inner.lock();
        if inner.routers.contains_key(&peer) {
            return None;
        }
        inner.routers.insert(peer, ChannelRouter::new());
        Some(Arc::new(SimTransport {
            network: Arc::clone(self),
            local: peer,
        }))
    }

    /// Route events on this peer's channel into `sink`.
    pub fn register_sink(&self, peer: PeerId, sink: EventSink) -> bool {
        match self.inner.lock().routers.get_mut(&peer) {
            Some(router) => {
                router.register(sink);
                true
            }
            None => false,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.inner.lock().now
    }

    /// Get a copy of the current configuration.
    pub fn config(&self) -> NetworkConfig {
        self.config.lock().clone()
    }

    /// Toggle property replication.
    pub fn set_replication_enabled(&self, enabled: bool) {
        self.config.lock().replication_enabled = enabled;
    }

    /// Toggle duplicate delivery of `Command` events.
    pub fn set_duplicate_commands(&self, enabled: bool) {
        self.config.lock().duplicate_commands = enabled;
    }

    /// Get transport counters.
    pub fn stats(&self) -> NetworkStats {
        self.inner.lock().stats.clone()
    }

    /// Number of broadcasts not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    /// Advance the clock and push every due broadcast into its peer's queue.
    pub fn advance_to(&self, now: Duration) {
        let mut inner = self.inner.lock();
        inner.now = now;

        let later = inner.in_flight.split_off(&(now.saturating_add(Duration::from_nanos(1)), 0));
        let due = std::mem::replace(&mut inner.in_flight, later);

        for (_, message) in due {
            let Inner { routers, stats, .. } = &mut *inner;
            let Some(router) = routers.get_mut(&message.to) else {
                continue;
            };
            match router.route_raw(message.code.get(), message.payload) {
                Ok(Delivery::Delivered) => stats.events_delivered += 1,
                Ok(Delivery::Unclaimed) => stats.events_unclaimed += 1,
                Err(e) => warn!(to = %message.to, error = %e, "Failed to deliver event"),
            }
        }
    }

    fn broadcast(&self, from: PeerId, code: EventCode, payload: &str) {
        let config = self.config();
        let copies = match code.decode() {
            Some((EventKind::Command, _)) if config.duplicate_commands => 2,
            _ => 1,
        };

        let mut inner = self.inner.lock();
        let deliver_at = inner.now + config.message_latency;
        let peers: Vec<PeerId> = inner.routers.keys().copied().filter(|p| *p != from).collect();
        for to in peers {
            for _ in 0..copies {
                let seq = inner.seq;
                inner.seq += 1;
                inner.in_flight.insert(
                    (deliver_at, seq),
                    InFlight {
                        to,
                        code,
                        payload: payload.to_string(),
                    },
                );
            }
        }
        inner.stats.events_sent += 1;
        trace!(%from, %code, payload, "Broadcast");
    }

    fn write(&self, peer: PeerId, key: &str, value: i32) {
        let config = self.config();
        let mut inner = self.inner.lock();
        inner.stats.property_writes += 1;
        if !config.replication_enabled {
            return;
        }
        let now = inner.now;
        let log = inner
            .properties
            .entry(peer)
            .or_default()
            .entry(key.to_string())
            .or_default();
        // Everything before the newest visible entry can never be read again.
        if let Some(newest) = log.iter().rposition(|(visible_at, _)| *visible_at <= now) {
            log.drain(..newest);
        }
        log.push((now + config.replication_lag, value));
    }

    #[cfg(test)]
    fn write_log_len(&self, peer: PeerId, key: &str) -> usize {
        self.inner
            .lock()
            .properties
            .get(&peer)
            .and_then(|keys| keys.get(key))
            .map_or(0, Vec::len)
    }

    fn read(&self, peer: PeerId, key: &str) -> Option<i32> {
        let inner = self.inner.lock();
        let now = inner.now;
        inner
            .properties
            .get(&peer)?
            .get(key)?
            .iter()
            .rev()
            .find(|(visible_at, _)| *visible_at <= now)
            .map(|(_, value)| *value)
    }

    fn peers_except(&self, local: PeerId) -> Vec<PeerId> {
        self.inner
            .lock()
            .routers
            .keys()
            .copied()
            .filter(|p| *p != local)
            .collect()
    }

    /// All attached peers.
    pub fn peers(&self) -> BTreeSet<PeerId> {
        self.inner.lock().routers.keys().copied().collect()
    }
}

/// One peer's handle onto the [`SimulatedNetwork`].
#[derive(Debug)]
pub struct SimTransport {
    network: Arc<SimulatedNetwork>,
    local: PeerId,
}

impl SimTransport {
    /// The peer this handle belongs to.
    pub fn local(&self) -> PeerId {
        self.local
    }
}

impl MessageChannel for SimTransport {
    fn send_event(&self, code: EventCode, payload: &str) {
        self.network.broadcast(self.local, code, payload);
    }
}

impl PeerStateStore for SimTransport {
    fn set_local_property(&self, key: &str, value: i32) {
        self.network.write(self.local, key, value);
    }

    fn peer_property(&self, peer: PeerId, key: &str) -> Option<i32> {
        self.network.read(peer, key)
    }

    fn other_peers(&self) -> Vec<PeerId> {
        self.network.peers_except(self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::EventQueue;
    use concord_types::ChannelId;

    #[test]
    fn test_attach_rejects_second_writer() {
        let network = SimulatedNetwork::new(NetworkConfig::default());
        assert!(network.attach(PeerId(0)).is_some());
        assert!(network.attach(PeerId(0)).is_none());
    }

    #[test]
    fn test_broadcast_skips_sender_and_respects_latency() {
        let network = SimulatedNetwork::new(NetworkConfig::default());
        let a = network.attach(PeerId(0)).unwrap();
        network.attach(PeerId(1)).unwrap();
        let qa = EventQueue::new(ChannelId::default());
        let qb = EventQueue::new(ChannelId::default());
        network.register_sink(PeerId(0), qa.sink());
        network.register_sink(PeerId(1), qb.sink());

        a.send_event(EventCode(10), "hi");
        network.advance_to(Duration::from_millis(49));
        assert!(qb.is_empty());
        network.advance_to(Duration::from_millis(50));
        assert_eq!(qb.dequeue(EventKind::Proposed).unwrap().payload, "hi");
        assert!(qa.is_empty());
        assert_eq!(network.in_flight(), 0);
    }

    #[test]
    fn test_writes_visible_after_lag() {
        let network = SimulatedNetwork::new(NetworkConfig::default());
        let a = network.attach(PeerId(0)).unwrap();
        let b = network.attach(PeerId(1)).unwrap();

        a.set_local_property("k", 30);
        assert_eq!(b.peer_property(PeerId(0), "k"), None);
        network.advance_to(Duration::from_millis(50));
        assert_eq!(b.peer_property(PeerId(0), "k"), Some(30));

        a.set_local_property("k", 40);
        assert_eq!(b.peer_property(PeerId(0), "k"), Some(30));
        network.advance_to(Duration::from_millis(100));
        assert_eq!(b.peer_property(PeerId(0), "k"), Some(40));
    }

    #[test]
    fn test_write_log_is_pruned() {
        let network = SimulatedNetwork::new(NetworkConfig::default());
        let a = network.attach(PeerId(0)).unwrap();
        let b = network.attach(PeerId(1)).unwrap();

        for i in 0..100u64 {
            network.advance_to(Duration::from_millis(100 * i));
            a.set_local_property("k", (i % 8) as i32 * 10);
            assert!(network.write_log_len(PeerId(0), "k") <= 2);
        }
        // The last write is still pending, the one before it is visible.
        assert_eq!(b.peer_property(PeerId(0), "k"), Some(20));
        network.advance_to(Duration::from_millis(9950));
        assert_eq!(b.peer_property(PeerId(0), "k"), Some(30));
    }

    #[test]
    fn test_replication_disabled_drops_writes() {
        let network = SimulatedNetwork::new(NetworkConfig::default());
        let a = network.attach(PeerId(0)).unwrap();
        let b = network.attach(PeerId(1)).unwrap();
        network.set_replication_enabled(false);
        a.set_local_property("k", 30);
        network.advance_to(Duration::from_secs(1));
        assert_eq!(b.peer_property(PeerId(0), "k"), None);
        assert_eq!(b.other_peers(), vec![PeerId(0)]);
        assert_eq!(network.stats().property_writes, 1);
    }

    #[test]
    fn test_duplicate_commands() {
        let network = SimulatedNetwork::new(NetworkConfig {
            duplicate_commands: true,
            ..Default::default()
        });
        let a = network.attach(PeerId(0)).unwrap();
        network.attach(PeerId(1)).unwrap();
        let qb = EventQueue::new(ChannelId::default());
        network.register_sink(PeerId(1), qb.sink());

        a.send_event(EventCode(70), "c");
        a.send_event(EventCode(40), "r");
        network.advance_to(Duration::from_millis(50));
        assert_eq!(qb.len(), 3);
        assert_eq!(network.stats().events_delivered, 3);
    }
}
