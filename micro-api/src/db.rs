use std::{fmt, sync::Arc};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{CollectionPath, DocId, DocPath, Document, Error, FieldUpdate, ListenTarget, Query, Snapshot};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ListenerId(pub Uuid);

impl ListenerId {
    pub fn generate() -> ListenerId {
        ListenerId(Uuid::new_v4())
    }
}

/// Receiving end of a listener. Returns `false` once nobody is interested in
/// further snapshots, after which the store may drop the listener on its own.
#[derive(Clone)]
pub struct SnapshotSink(Arc<dyn Fn(Result<Snapshot, Error>) -> bool + Send + Sync>);

impl SnapshotSink {
    pub fn new<F>(f: F) -> SnapshotSink
    where
        F: 'static + Fn(Result<Snapshot, Error>) -> bool + Send + Sync,
    {
        SnapshotSink(Arc::new(f))
    }

    pub fn deliver(&self, snapshot: Result<Snapshot, Error>) -> bool {
        (self.0)(snapshot)
    }
}

impl fmt::Debug for SnapshotSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SnapshotSink")
    }
}

/// Realtime document database
///
/// `listen` delivers the current state of the target before returning, then
/// a fresh full snapshot after every write affecting it, until `unlisten`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores a new document under a generated id and returns that id
    async fn add(&self, collection: &CollectionPath, data: serde_json::Value) -> Result<DocId, Error>;

    /// Creates or fully overwrites the document
    async fn set(&self, path: &DocPath, data: serde_json::Value) -> Result<(), Error>;

    /// Fails with `NotFound` if the document does not exist
    async fn update(&self, path: &DocPath, updates: Vec<FieldUpdate>) -> Result<(), Error>;

    /// Deleting a missing document succeeds
    async fn delete(&self, path: &DocPath) -> Result<(), Error>;

    async fn get(&self, path: &DocPath) -> Result<Option<Document>, Error>;
    async fn query(&self, query: &Query) -> Result<Vec<Document>, Error>;

    async fn listen(&self, target: ListenTarget, sink: SnapshotSink) -> Result<ListenerId, Error>;

    /// Idempotent
    fn unlisten(&self, listener: ListenerId);
}
