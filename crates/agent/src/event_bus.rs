// SPDX-License-Identifier: MIT

//! Agent-local event bus backing `subscribe_events` (spec §4.5).
//!
//! A bounded ring retains recent history so a fresh subscriber can replay
//! from `since_seq`. Each subscriber gets its own bounded queue; a
//! subscriber that falls behind is dropped rather than allowed to make the
//! publisher block (spec §8 scenario 5, §9 design note).

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use oa_core::clock::{Clock, SystemClock};
use oa_core::conversation::CorrelationId;
use oa_core::event::{EventKind, EventRecord, SequenceNumber};

struct Subscriber {
    tx: mpsc::Sender<EventRecord>,
}

/// Append-only event log plus live fan-out to subscribers.
pub struct EventBus<C: Clock = SystemClock> {
    clock: C,
    next_seq: Mutex<SequenceNumber>,
    ring: Mutex<VecDeque<EventRecord>>,
    ring_capacity: usize,
    subscriber_capacity: usize,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl<C: Clock> EventBus<C> {
    pub fn new(clock: C, ring_capacity: usize, subscriber_capacity: usize) -> Self {
        Self {
            clock,
            next_seq: Mutex::new(1),
            ring: Mutex::new(VecDeque::with_capacity(ring_capacity.min(4096))),
            ring_capacity,
            subscriber_capacity,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Append an event and fan it out to every live subscriber. Returns the
    /// assigned record so callers can log/test against it.
    pub fn publish(
        &self,
        kind: EventKind,
        correlation_id: Option<CorrelationId>,
        peer_name: Option<String>,
    ) -> EventRecord {
        let seq = {
            let mut next = self.next_seq.lock();
            let seq = *next;
            *next += 1;
            seq
        };
        let mut record = EventRecord::new(seq, self.clock.epoch_ms(), kind);
        record.correlation_id = correlation_id;
        record.peer_name = peer_name;

        {
            let mut ring = self.ring.lock();
            ring.push_back(record.clone());
            while ring.len() > self.ring_capacity {
                ring.pop_front();
            }
        }

        let mut subs = self.subscribers.lock();
        subs.retain(|sub| sub.tx.try_send(record.clone()).is_ok());

        record
    }

    /// Create a new subscription, returning any ring history at or after
    /// `since_seq` (spec §4.2 `subscribe_events.since_seq`) followed by a
    /// receiver for events published from this point on.
    ///
    /// If `since_seq` names a sequence number older than the oldest entry
    /// still in the ring, replay starts from the oldest retained entry
    /// instead of erroring — the ring's bound is a resource limit, not a
    /// correctness boundary the caller is expected to reason about.
    pub fn subscribe(&self, since_seq: Option<SequenceNumber>) -> (Vec<EventRecord>, mpsc::Receiver<EventRecord>) {
        let replay = match since_seq {
            Some(since) => self.ring.lock().iter().filter(|e| e.seq >= since).cloned().collect(),
            None => Vec::new(),
        };
        let (tx, rx) = mpsc::channel(self.subscriber_capacity);
        self.subscribers.lock().push(Subscriber { tx });
        (replay, rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oa_core::clock::FakeClock;

    fn bus() -> EventBus<FakeClock> {
        EventBus::new(FakeClock::new(), 4, 2)
    }

    #[test]
    fn publish_assigns_increasing_sequence_numbers() {
        let bus = bus();
        let a = bus.publish(EventKind::TurnStarted, None, None);
        let b = bus.publish(EventKind::TurnStarted, None, None);
        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
    }

    #[test]
    fn ring_drops_oldest_beyond_capacity() {
        let bus = bus();
        for _ in 0..6 {
            bus.publish(EventKind::TurnStarted, None, None);
        }
        let (replay, _rx) = bus.subscribe(Some(1));
        assert_eq!(replay.len(), 4, "ring should retain only the last 4 entries");
        assert_eq!(replay.first().unwrap().seq, 3);
    }

    #[tokio::test]
    async fn subscriber_receives_events_published_after_subscribing() {
        let bus = bus();
        let (replay, mut rx) = bus.subscribe(None);
        assert!(replay.is_empty());
        bus.publish(EventKind::TurnStarted, None, None);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.seq, 1);
    }

    #[test]
    fn slow_subscriber_is_dropped_without_blocking_publisher() {
        let bus = bus();
        let (_replay, _rx) = bus.subscribe(None); // queue capacity 2, receiver never drained
        for _ in 0..5 {
            bus.publish(EventKind::TurnStarted, None, None);
        }
        assert_eq!(bus.subscriber_count(), 0, "overflowing subscriber must be dropped, not block");
    }
}
