use std::sync::Arc;

use anyhow::Context;

use crate::{
    api::{
        AuthProvider, AuthUser, BlobStorage, CollectionPath, DocId, DocPath, DocumentStore,
        Entity, Error, FieldUpdate, Query, UserId,
    },
    Config,
};

/// Handles to the managed backend, shared by every repository
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn BlobStorage>,
    pub config: Config,
}

impl Backend {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn BlobStorage>,
        config: Config,
    ) -> Backend {
        Backend {
            store,
            auth,
            storage,
            config,
        }
    }

    /// Uses one service for all three roles
    pub fn single<S>(srv: Arc<S>, config: Config) -> Backend
    where
        S: 'static + DocumentStore + AuthProvider + BlobStorage,
    {
        Backend {
            store: srv.clone(),
            auth: srv.clone(),
            storage: srv,
            config,
        }
    }

    pub fn signed_in(&self) -> anyhow::Result<AuthUser> {
        self.auth
            .current_user()
            .ok_or(Error::NotAuthenticated)
            .context("this operation requires a signed-in user")
    }

    pub fn current_uid(&self) -> anyhow::Result<UserId> {
        Ok(self.signed_in()?.uid)
    }

    pub(crate) async fn add<T: Entity>(
        &self,
        collection: &CollectionPath,
        entity: &T,
    ) -> anyhow::Result<DocId> {
        let data = entity
            .to_data()
            .with_context(|| format!("encoding new document for {collection}"))?;
        self.store
            .add(collection, data)
            .await
            .with_context(|| format!("adding document to {collection}"))
    }

    pub(crate) async fn set<T: Entity>(&self, path: &DocPath, entity: &T) -> anyhow::Result<()> {
        let data = entity
            .to_data()
            .with_context(|| format!("encoding document {path}"))?;
        self.store
            .set(path, data)
            .await
            .with_context(|| format!("writing document {path}"))
    }

    pub(crate) async fn update(
        &self,
        path: &DocPath,
        updates: Vec<FieldUpdate>,
    ) -> anyhow::Result<()> {
        self.store
            .update(path, updates)
            .await
            .with_context(|| format!("updating document {path}"))
    }

    pub(crate) async fn delete(&self, path: &DocPath) -> anyhow::Result<()> {
        self.store
            .delete(path)
            .await
            .with_context(|| format!("deleting document {path}"))
    }

    pub(crate) async fn get<T: Entity>(&self, path: &DocPath) -> anyhow::Result<Option<T>> {
        let doc = self
            .store
            .get(path)
            .await
            .with_context(|| format!("fetching document {path}"))?;
        match doc {
            None => Ok(None),
            Some(doc) => Ok(Some(
                T::from_document(&doc).with_context(|| format!("decoding document {path}"))?,
            )),
        }
    }

    pub(crate) async fn query<T: Entity>(&self, query: &Query) -> anyhow::Result<Vec<T>> {
        let docs = self
            .store
            .query(query)
            .await
            .with_context(|| format!("querying {}", query.collection))?;
        docs.iter()
            .map(|d| T::from_document(d).with_context(|| format!("decoding document {}", d.path)))
            .collect()
    }
}
