use anyhow::Context;

use crate::api::{Entity, Keyed, Snapshot};

/// How a snapshot is folded into a local list
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Policy {
    /// The list becomes exactly the snapshot, in server order
    ReplaceAll,

    /// Each result replaces the entry with the same key, or is appended.
    /// Entries missing from the snapshot are kept.
    MergeByKey,
}

pub fn replace_all<T>(list: &mut Vec<T>, results: Vec<T>) {
    list.clear();
    list.extend(results);
}

pub fn merge_by_key<T: Keyed>(list: &mut Vec<T>, item: T) {
    list.retain(|e| e.key() != item.key());
    list.push(item);
}

pub fn apply<T: Keyed>(policy: Policy, list: &mut Vec<T>, results: Vec<T>) {
    match policy {
        Policy::ReplaceAll => replace_all(list, results),
        Policy::MergeByKey => {
            for r in results {
                merge_by_key(list, r);
            }
        }
    }
}

/// Decodes the whole snapshot before touching `list`, so that a bad document
/// leaves the previous state in place
pub fn apply_snapshot<T: Entity>(
    policy: Policy,
    list: &mut Vec<T>,
    snapshot: &Snapshot,
) -> anyhow::Result<()> {
    let results = snapshot
        .decode_all::<T>()
        .context("decoding snapshot")?;
    apply(policy, list, results);
    Ok(())
}
