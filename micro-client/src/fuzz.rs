#![cfg(test)]

use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

use micro_mock_server::MockServer;
use serde_json::json;

use crate::{
    api::{collections, DocId, DocumentStore, Keyed, Snapshot},
    reconcile::{self, Policy},
    subscription::Subscriptions,
};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

#[derive(Clone, Debug, PartialEq)]
struct Item {
    key: u8,
    value: i8,
}

impl Keyed for Item {
    type Key = u8;

    fn key(&self) -> &u8 {
        &self.key
    }
}

#[test]
fn merge_keeps_keys_unique_and_latest() {
    bolero::check!()
        .with_type::<(Vec<(u8, i8)>, Vec<(u8, i8)>)>()
        .cloned()
        .for_each(|(before, results)| {
            let mut list = Vec::new();
            for (key, value) in before.iter().chain(results.iter()) {
                reconcile::merge_by_key(&mut list, Item { key: *key, value: *value });
            }
            let mut expected = HashMap::new();
            for (key, value) in before.iter().chain(results.iter()) {
                expected.insert(*key, *value);
            }
            assert_eq!(list.len(), expected.len());
            for item in list.iter() {
                assert_eq!(expected.get(&item.key), Some(&item.value));
            }
        })
}

#[test]
fn replace_all_mirrors_results() {
    bolero::check!()
        .with_type::<(Vec<(u8, i8)>, Vec<(u8, i8)>)>()
        .cloned()
        .for_each(|(before, results)| {
            let to_items = |v: &[(u8, i8)]| {
                v.iter()
                    .map(|(key, value)| Item { key: *key, value: *value })
                    .collect::<Vec<_>>()
            };
            let mut list = to_items(&before);
            reconcile::apply(Policy::ReplaceAll, &mut list, to_items(&results));
            assert_eq!(list, to_items(&results));
        })
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    Subscribe { slot: u8, doc: u8 },
    Unsubscribe { slot: u8 },
    Write { doc: u8, value: i8 },
    Delete { doc: u8 },
    Drain,
}

fn doc_id(doc: u8) -> DocId {
    DocId::from(format!("doc{}", doc % 4))
}

fn value_of(snapshot: &Snapshot) -> Option<i64> {
    match snapshot {
        Snapshot::Document(Some(d)) => d.data["v"].as_i64(),
        _ => None,
    }
}

// Whatever the sequence of operations, the last snapshot accepted for each
// live slot reflects the current server state of the document it listens to,
// and the server holds exactly one listener per live slot.
do_tokio_test!(
    subscriptions_track_server_state,
    Vec<FuzzOp>,
    |ops: Vec<FuzzOp>| async move {
        let srv = Arc::new(MockServer::new());
        let coll = collections::courses();
        let mut subs = Subscriptions::new(srv.clone());
        let mut targets = HashMap::<u8, DocId>::new();
        let mut model = HashMap::<DocId, i64>::new();
        let mut seen = HashMap::<u8, Option<i64>>::new();
        for op in ops {
            match op {
                FuzzOp::Subscribe { slot, doc } => {
                    let slot = slot % 4;
                    let id = doc_id(doc);
                    subs.subscribe(slot, coll.doc(&id)).await.unwrap();
                    targets.insert(slot, id);
                    seen.remove(&slot);
                }
                FuzzOp::Unsubscribe { slot } => {
                    let slot = slot % 4;
                    assert_eq!(subs.unsubscribe(&slot), targets.remove(&slot).is_some());
                    seen.remove(&slot);
                }
                FuzzOp::Write { doc, value } => {
                    let id = doc_id(doc);
                    srv.set(&coll.doc(&id), json!({ "v": value })).await.unwrap();
                    model.insert(id, i64::from(value));
                }
                FuzzOp::Delete { doc } => {
                    let id = doc_id(doc);
                    DocumentStore::delete(&*srv, &coll.doc(&id)).await.unwrap();
                    model.remove(&id);
                }
                FuzzOp::Drain => {
                    while let Some((slot, snapshot)) = subs.try_next() {
                        assert!(targets.contains_key(&slot));
                        seen.insert(slot, value_of(&snapshot));
                    }
                    for (slot, id) in targets.iter() {
                        assert_eq!(seen.get(slot), Some(&model.get(id).copied()));
                    }
                }
            }
            assert_eq!(srv.test_num_listeners(), subs.len());
        }
        drop(subs);
        assert_eq!(srv.test_num_listeners(), 0);
    }
);
