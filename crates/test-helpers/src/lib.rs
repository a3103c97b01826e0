//! Test doubles for the transport interfaces.
//!
//! - [`RecordingChannel`] records every broadcast instead of sending it.
//! - [`SharedPeerStates`] is an in-memory replicated store. Each peer gets a
//!   [`SingleWriterStore`] handle; a peer's entry may only ever be written by
//!   the one handle that first wrote it, and a second writer panics.

use concord_core::{MessageChannel, PeerStateStore};
use concord_types::{EventCode, PeerId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Records broadcasts as `(code, payload)` pairs.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(EventCode, String)>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<(EventCode, String)> {
        self.sent.lock().clone()
    }

    /// Everything sent so far, clearing the record.
    pub fn take(&self) -> Vec<(EventCode, String)> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl MessageChannel for RecordingChannel {
    fn send_event(&self, code: EventCode, payload: &str) {
        self.sent.lock().push((code, payload.to_string()));
    }
}

/// One write made through a [`SingleWriterStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub peer: PeerId,
    pub key: String,
    pub value: i32,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<PeerId, HashMap<String, i32>>,
    visible: BTreeSet<PeerId>,
    /// Handle token that owns each peer's entry.
    owners: HashMap<PeerId, u64>,
    next_token: u64,
    writes: Vec<WriteRecord>,
}

/// Shared replicated state for a group of peers in one test.
#[derive(Debug, Default)]
pub struct SharedPeerStates {
    inner: Mutex<Inner>,
}

impl SharedPeerStates {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store handle for `local`. The peer becomes visible to the others.
    pub fn handle(self: &Arc<Self>, local: PeerId) -> Arc<SingleWriterStore> {
        let mut inner = self.inner.lock();
        inner.visible.insert(local);
        let token = inner.next_token;
        inner.next_token += 1;
        Arc::new(SingleWriterStore {
            shared: Arc::clone(self),
            local,
            token,
        })
    }

    /// Make `peer` visible without any replicated entry.
    pub fn add_peer(&self, peer: PeerId) {
        self.inner.lock().visible.insert(peer);
    }

    /// Remove `peer` and its entry, as if it left.
    pub fn remove_peer(&self, peer: PeerId) {
        let mut inner = self.inner.lock();
        inner.visible.remove(&peer);
        inner.entries.remove(&peer);
    }

    /// Simulate a replicated value arriving for a peer that has no handle.
    pub fn inject(&self, peer: PeerId, key: &str, value: i32) {
        let mut inner = self.inner.lock();
        inner.visible.insert(peer);
        inner
            .entries
            .entry(peer)
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Every write made through a handle, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().writes.clone()
    }

    fn write(&self, token: u64, peer: PeerId, key: &str, value: i32) {
        let mut inner = self.inner.lock();
        let owner = *inner.owners.entry(peer).or_insert(token);
        assert_eq!(
            owner, token,
            "single-writer violation: entry of {peer} written by a second writer"
        );
        inner
            .entries
            .entry(peer)
            .or_default()
            .insert(key.to_string(), value);
        inner.writes.push(WriteRecord {
            peer,
            key: key.to_string(),
            value,
        });
    }

    fn read(&self, peer: PeerId, key: &str) -> Option<i32> {
        self.inner
            .lock()
            .entries
            .get(&peer)
            .and_then(|entry| entry.get(key).copied())
    }

    fn others(&self, local: PeerId) -> Vec<PeerId> {
        self.inner
            .lock()
            .visible
            .iter()
            .copied()
            .filter(|p| *p != local)
            .collect()
    }
}

/// Store handle bound to one local peer.
#[derive(Debug)]
pub struct SingleWriterStore {
    shared: Arc<SharedPeerStates>,
    local: PeerId,
    token: u64,
}

impl SingleWriterStore {
    /// The local peer.
    pub fn local(&self) -> PeerId {
        self.local
    }

    /// Current value of `key` in the local entry.
    pub fn local_property(&self, key: &str) -> Option<i32> {
        self.shared.read(self.local, key)
    }
}

impl PeerStateStore for SingleWriterStore {
    fn set_local_property(&self, key: &str, value: i32) {
        self.shared.write(self.token, self.local, key, value);
    }

    fn peer_property(&self, peer: PeerId, key: &str) -> Option<i32> {
        self.shared.read(peer, key)
    }

    fn other_peers(&self) -> Vec<PeerId> {
        self.shared.others(self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_see_each_other() {
        let shared = SharedPeerStates::new();
        let a = shared.handle(PeerId(1));
        let b = shared.handle(PeerId(2));
        a.set_local_property("k", 10);
        assert_eq!(b.peer_property(PeerId(1), "k"), Some(10));
        assert_eq!(b.other_peers(), vec![PeerId(1)]);
        assert_eq!(a.other_peers(), vec![PeerId(2)]);
    }

    #[test]
    #[should_panic(expected = "single-writer violation")]
    fn test_second_writer_panics() {
        let shared = SharedPeerStates::new();
        let first = shared.handle(PeerId(1));
        let impostor = shared.handle(PeerId(1));
        first.set_local_property("k", 10);
        impostor.set_local_property("k", 20);
    }

    #[test]
    fn test_recording_channel_take_clears() {
        let channel = RecordingChannel::new();
        channel.send_event(EventCode(10), "x");
        assert_eq!(channel.sent().len(), 1);
        assert_eq!(channel.take(), vec![(EventCode(10), "x".to_string())]);
        assert!(channel.sent().is_empty());
    }
}
