use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::Arc};

use anyhow::Context;
use tokio::sync::mpsc;

use crate::api::{DocumentStore, Error, ListenTarget, ListenerId, Snapshot, SnapshotSink};

/// Name of a live listener inside its owner
pub trait Slot: 'static + Clone + Debug + Eq + Hash + Send + Sync {}

impl<T> Slot for T where T: 'static + Clone + Debug + Eq + Hash + Send + Sync {}

#[derive(Debug)]
struct Delivery<S> {
    slot: S,
    generation: u64,
    snapshot: Result<Snapshot, Error>,
}

/// Table of named listeners, all feeding a single inbox
///
/// Each slot holds at most one listener. Deliveries are tagged with the
/// generation of the listener that produced them, so that snapshots still in
/// flight for a replaced or released listener never reach the owner.
pub struct Subscriptions<S: Slot> {
    store: Arc<dyn DocumentStore>,
    sender: mpsc::UnboundedSender<Delivery<S>>,
    inbox: mpsc::UnboundedReceiver<Delivery<S>>,
    slots: HashMap<S, (ListenerId, u64)>,
    next_generation: u64,
}

impl<S: Slot> Subscriptions<S> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Subscriptions<S> {
        let (sender, inbox) = mpsc::unbounded_channel();
        Subscriptions {
            store,
            sender,
            inbox,
            slots: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Releases whatever `slot` was listening to, then listens to `target`
    pub async fn subscribe(&mut self, slot: S, target: impl Into<ListenTarget>) -> anyhow::Result<()> {
        self.unsubscribe(&slot);
        let target = target.into();
        self.next_generation += 1;
        let generation = self.next_generation;
        let sender = self.sender.clone();
        let tag = slot.clone();
        let sink = SnapshotSink::new(move |snapshot| {
            sender
                .send(Delivery {
                    slot: tag.clone(),
                    generation,
                    snapshot,
                })
                .is_ok()
        });
        let listener = self
            .store
            .listen(target, sink)
            .await
            .with_context(|| format!("listening for {slot:?}"))?;
        tracing::debug!(?slot, ?listener, generation, "opened subscription");
        self.slots.insert(slot, (listener, generation));
        Ok(())
    }

    /// Returns whether there was something to release
    pub fn unsubscribe(&mut self, slot: &S) -> bool {
        match self.slots.remove(slot) {
            Some((listener, generation)) => {
                self.store.unlisten(listener);
                tracing::debug!(?slot, ?listener, generation, "released subscription");
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe_where(&mut self, mut pred: impl FnMut(&S) -> bool) {
        let slots = self
            .slots
            .keys()
            .filter(|s| pred(s))
            .cloned()
            .collect::<Vec<_>>();
        for s in slots {
            self.unsubscribe(&s);
        }
    }

    pub fn release_all(&mut self) {
        for (slot, (listener, _)) in self.slots.drain() {
            self.store.unlisten(listener);
            tracing::debug!(?slot, ?listener, "released subscription");
        }
    }

    pub fn is_subscribed(&self, slot: &S) -> bool {
        self.slots.contains_key(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn accept(&self, d: Delivery<S>) -> Option<(S, Snapshot)> {
        match self.slots.get(&d.slot) {
            Some((_, generation)) if *generation == d.generation => (),
            _ => {
                tracing::trace!(slot=?d.slot, generation=d.generation, "discarding stale delivery");
                return None;
            }
        }
        match d.snapshot {
            Ok(snapshot) => Some((d.slot, snapshot)),
            Err(error) => {
                tracing::warn!(slot=?d.slot, %error, "listener reported an error, keeping previous state");
                None
            }
        }
    }

    /// Next pending snapshot, if any arrived already
    pub fn try_next(&mut self) -> Option<(S, Snapshot)> {
        while let Ok(d) = self.inbox.try_recv() {
            if let Some(res) = self.accept(d) {
                return Some(res);
            }
        }
        None
    }

    /// Waits for the next snapshot
    pub async fn next(&mut self) -> Option<(S, Snapshot)> {
        while let Some(d) = self.inbox.recv().await {
            if let Some(res) = self.accept(d) {
                return Some(res);
            }
        }
        None
    }
}

impl<S: Slot> Drop for Subscriptions<S> {
    fn drop(&mut self) {
        self.release_all();
    }
}
