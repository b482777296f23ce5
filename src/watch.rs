//! Distribution of published vschema snapshots to watchers.

use crate::error::VgateError;
use crate::vschema::PublishedVSchema;
use parking_lot::Mutex;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::{debug, warn};

/// Store that receives every published snapshot and fans it out to
/// subscribers.
pub trait ConfigStore: fmt::Debug + Send + Sync {
    /// Must not block on slow subscribers.
    fn publish(&self, vschema: &PublishedVSchema) -> Result<(), VgateError>;

    /// A new subscription first yields the latest published snapshot, if any.
    fn subscribe(&self) -> VSchemaWatch;
}

/// Receiving end of a snapshot subscription.
#[derive(Debug)]
pub struct VSchemaWatch {
    rx: mpsc::Receiver<PublishedVSchema>,
}

impl VSchemaWatch {
    /// Waits for the next snapshot. `None` once the store dropped this
    /// subscriber and the buffer is drained.
    pub async fn recv(&mut self) -> Option<PublishedVSchema> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<PublishedVSchema> {
        match self.rx.try_recv() {
            Ok(v) => Some(v),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drains the buffer and returns the newest snapshot seen.
    pub fn latest(&mut self) -> Option<PublishedVSchema> {
        let mut latest = None;
        while let Some(v) = self.try_recv() {
            latest = Some(v);
        }
        latest
    }
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<PublishedVSchema>,
}

#[derive(Default)]
struct StoreState {
    latest: Option<PublishedVSchema>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

/// In-process store backed by one bounded channel per subscriber. A
/// subscriber whose buffer is full when a snapshot is published is dropped.
pub struct MemoryConfigStore {
    buffer: usize,
    state: Mutex<StoreState>,
}

impl fmt::Debug for MemoryConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryConfigStore")
            .field("buffer", &self.buffer)
            .field("latest_seq", &state.latest.as_ref().map(|v| v.seq))
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl MemoryConfigStore {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn latest(&self) -> Option<PublishedVSchema> {
        self.state.lock().latest.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn publish(&self, vschema: &PublishedVSchema) -> Result<(), VgateError> {
        let mut state = self.state.lock();
        state.latest = Some(vschema.clone());
        state
            .subscribers
            .retain(|sub| match sub.tx.try_send(vschema.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        subscriber = sub.id,
                        seq = vschema.seq,
                        "vschema subscriber fell behind, disconnecting"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = sub.id, "vschema subscriber closed");
                    false
                }
            });
        Ok(())
    }

    fn subscribe(&self) -> VSchemaWatch {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut state = self.state.lock();
        if let Some(latest) = &state.latest {
            // Fresh channel with capacity >= 1 cannot be full.
            let _ = tx.try_send(latest.clone());
        }
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push(Subscriber { id, tx });
        VSchemaWatch { rx }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigStore, MemoryConfigStore};
    use crate::vschema::{PublishedVSchema, VSchemaSnapshot};
    use std::sync::Arc;

    fn published(seq: u64) -> PublishedVSchema {
        PublishedVSchema {
            seq,
            vschema: Arc::new(VSchemaSnapshot::default()),
        }
    }

    #[test]
    fn new_subscriber_sees_latest_first() {
        let store = MemoryConfigStore::new(4);
        store.publish(&published(1)).expect("publish");
        store.publish(&published(2)).expect("publish");
        let mut watch = store.subscribe();
        assert_eq!(watch.try_recv().map(|v| v.seq), Some(2));
        assert!(watch.try_recv().is_none());
        store.publish(&published(3)).expect("publish");
        assert_eq!(watch.try_recv().map(|v| v.seq), Some(3));
    }

    #[test]
    fn slow_subscriber_is_disconnected() {
        let store = MemoryConfigStore::new(2);
        let mut slow = store.subscribe();
        let mut fast = store.subscribe();
        for seq in 1..=2 {
            store.publish(&published(seq)).expect("publish");
            assert_eq!(fast.try_recv().map(|v| v.seq), Some(seq));
        }
        store.publish(&published(3)).expect("publish never blocks");
        assert_eq!(store.subscriber_count(), 1);
        assert_eq!(fast.try_recv().map(|v| v.seq), Some(3));

        // The slow subscriber keeps what was buffered, then sees the end.
        assert_eq!(slow.latest().map(|v| v.seq), Some(2));
        assert!(slow.try_recv().is_none());
    }

    #[test]
    fn dropped_watch_is_pruned_on_publish() {
        let store = MemoryConfigStore::new(2);
        drop(store.subscribe());
        assert_eq!(store.subscriber_count(), 1);
        store.publish(&published(1)).expect("publish");
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(store.latest().map(|v| v.seq), Some(1));
    }

    #[tokio::test]
    async fn recv_wakes_on_publish() {
        let store = Arc::new(MemoryConfigStore::new(2));
        let mut watch = store.subscribe();
        let publisher = Arc::clone(&store);
        tokio::spawn(async move {
            publisher.publish(&published(7)).expect("publish");
        });
        let got = tokio::time::timeout(std::time::Duration::from_secs(5), watch.recv())
            .await
            .expect("timely")
            .expect("open");
        assert_eq!(got.seq, 7);
    }
}
