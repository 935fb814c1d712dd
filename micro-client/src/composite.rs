use crate::{
    api::{Entity, ListenTarget, Snapshot},
    reconcile,
    subscription::{Slot, Subscriptions},
};

/// One list assembled from one document listener per key
///
/// Re-assembling releases the listeners of the previous key set before
/// opening the new ones, and starts again from an empty list.
#[derive(Debug)]
pub struct Composite<K> {
    keys: Vec<K>,
}

impl<K: Clone + Eq> Composite<K> {
    pub fn new() -> Composite<K> {
        Composite { keys: Vec::new() }
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub async fn assemble<S, T>(
        &mut self,
        subs: &mut Subscriptions<S>,
        list: &mut Vec<T>,
        keys: Vec<K>,
        slot_of: impl Fn(&K) -> S,
        target_of: impl Fn(&K) -> ListenTarget,
    ) -> anyhow::Result<()>
    where
        S: Slot,
    {
        self.release(subs, &slot_of);
        list.clear();
        tracing::debug!(num_keys = keys.len(), "assembling composite list");
        for k in keys {
            if self.keys.contains(&k) {
                continue;
            }
            subs.subscribe(slot_of(&k), target_of(&k)).await?;
            self.keys.push(k);
        }
        Ok(())
    }

    pub fn release<S: Slot>(&mut self, subs: &mut Subscriptions<S>, slot_of: impl Fn(&K) -> S) {
        for k in self.keys.drain(..) {
            subs.unsubscribe(&slot_of(&k));
        }
    }
}

impl<K: Clone + Eq> Default for Composite<K> {
    fn default() -> Composite<K> {
        Composite::new()
    }
}

/// Folds one per-key document snapshot into the list
///
/// A document that disappeared is left in the list as it was last seen.
pub fn fold<T: Entity>(list: &mut Vec<T>, snapshot: &Snapshot) -> anyhow::Result<()> {
    match snapshot.decode_one::<T>()? {
        Some(item) => reconcile::merge_by_key(list, item),
        None => tracing::trace!("composite member is gone, keeping its last state"),
    }
    Ok(())
}
