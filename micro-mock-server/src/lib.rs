use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use micro_api::{
    AuthProvider, AuthUser, BlobPath, BlobStorage, CollectionPath, DocId, DocPath, Document,
    DocumentStore, Error, FieldUpdate, ListenTarget, ListenerId, NewAccount, Query, Snapshot,
    SnapshotSink, UserId,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

mod eval;

/// In-memory backend: document store with realtime listeners, accounts and blobs
pub struct MockServer(Mutex<State>);

#[derive(Default)]
struct State {
    next_seq: u64,
    num_queries: usize,
    collections: HashMap<CollectionPath, BTreeMap<DocId, Stored>>,
    listeners: HashMap<ListenerId, Listener>,
    accounts: BTreeMap<String, Account>,
    signed_in: Option<String>,
    auth_feeds: Vec<mpsc::UnboundedSender<Option<AuthUser>>>,
    verification_emails: Vec<String>,
    password_resets: Vec<String>,
    blobs: HashMap<String, Blob>,
    storage_unavailable: bool,
}

#[derive(Debug)]
struct Stored {
    seq: u64,
    data: serde_json::Value,
}

#[derive(Debug)]
struct Listener {
    target: ListenTarget,
    sink: SnapshotSink,
    last: Option<Snapshot>,
}

#[derive(Debug)]
struct Account {
    uid: UserId,
    password: String,
    display_name: String,
    photo_uri: String,
    email_verified: bool,
}

#[derive(Debug)]
struct Blob {
    bytes: Vec<u8>,
    token: Uuid,
}

impl State {
    fn snapshot(&self, target: &ListenTarget) -> Snapshot {
        match target {
            ListenTarget::Query(q) => Snapshot::Query(self.run(q)),
            ListenTarget::Document(path) => Snapshot::Document(self.get(path)),
        }
    }

    fn run(&self, q: &Query) -> Vec<Document> {
        let Some(coll) = self.collections.get(&q.collection) else {
            return Vec::new();
        };
        let mut docs = coll.iter().collect::<Vec<_>>();
        docs.sort_by_key(|(_, s)| s.seq);
        eval::run(q, docs.into_iter().map(|(id, s)| (id, &s.data)))
            .into_iter()
            .map(|(id, data)| Document {
                path: q.collection.doc(id),
                data: data.clone(),
            })
            .collect()
    }

    fn get(&self, path: &DocPath) -> Option<Document> {
        self.collections
            .get(&path.collection)
            .and_then(|c| c.get(&path.id))
            .map(|s| Document {
                path: path.clone(),
                data: s.data.clone(),
            })
    }

    fn write(&mut self, path: &DocPath, data: serde_json::Value) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let docs = self.collections.entry(path.collection.clone()).or_default();
        match docs.get_mut(&path.id) {
            Some(stored) => stored.data = data,
            None => {
                docs.insert(path.id.clone(), Stored { seq, data });
            }
        }
    }

    /// Sends a fresh snapshot to every listener whose view of `collection` changed
    fn notify(&mut self, collection: &CollectionPath) {
        let affected = self
            .listeners
            .iter()
            .filter(|(_, l)| l.target.collection() == collection)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        for id in affected {
            let Some(l) = self.listeners.get(&id) else {
                continue;
            };
            let snap = self.snapshot(&l.target);
            let Some(l) = self.listeners.get_mut(&id) else {
                continue;
            };
            if l.last.as_ref() == Some(&snap) {
                continue;
            }
            l.last = Some(snap.clone());
            if !l.sink.deliver(Ok(snap)) {
                tracing::debug!(listener=?id, "dropping listener whose receiver went away");
                self.listeners.remove(&id);
            }
        }
    }

    fn auth_user(&self, email: &str) -> Option<AuthUser> {
        self.accounts.get(email).map(|a| AuthUser {
            uid: a.uid.clone(),
            email: String::from(email),
            display_name: a.display_name.clone(),
            photo_uri: a.photo_uri.clone(),
            email_verified: a.email_verified,
        })
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.signed_in.as_deref().and_then(|e| self.auth_user(e))
    }

    fn relay_auth_state(&mut self) {
        let state = self.current_user();
        self.auth_feeds
            .retain_mut(|f| matches!(f.send(state.clone()), Ok(())));
    }

    fn check_storage(&self) -> Result<(), Error> {
        match self.storage_unavailable {
            true => Err(Error::Unavailable(String::from("storage is unreachable"))),
            false => Ok(()),
        }
    }
}

fn check_object(path: &dyn std::fmt::Display, data: &serde_json::Value) -> Result<(), Error> {
    match data.is_object() {
        true => Ok(()),
        false => Err(Error::InvalidDocument(format!(
            "{path}: document body must be an object"
        ))),
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(Mutex::new(State::default()))
    }

    /// Number of listeners currently registered, for leak checks
    pub fn test_num_listeners(&self) -> usize {
        self.0.lock().listeners.len()
    }

    /// Number of one-shot queries served so far
    pub fn test_num_queries(&self) -> usize {
        self.0.lock().num_queries
    }

    pub fn test_num_docs(&self, collection: &CollectionPath) -> usize {
        self.0
            .lock()
            .collections
            .get(collection)
            .map_or(0, |c| c.len())
    }

    /// Delivers `err` to every listener on `collection`, as a backend failure would
    pub fn test_fail_listeners(&self, collection: &CollectionPath, err: Error) {
        let mut state = self.0.lock();
        let mut gone = Vec::new();
        for (id, l) in state.listeners.iter() {
            if l.target.collection() == collection && !l.sink.deliver(Err(err.clone())) {
                gone.push(*id);
            }
        }
        for id in gone {
            state.listeners.remove(&id);
        }
    }

    /// Marks the account as having clicked its verification link
    pub fn test_verify_email(&self, email: &str) {
        if let Some(a) = self.0.lock().accounts.get_mut(email) {
            a.email_verified = true;
        }
    }

    pub fn test_verification_emails(&self) -> Vec<String> {
        self.0.lock().verification_emails.clone()
    }

    pub fn test_password_resets(&self) -> Vec<String> {
        self.0.lock().password_resets.clone()
    }

    pub fn test_set_storage_unavailable(&self, unavailable: bool) {
        self.0.lock().storage_unavailable = unavailable;
    }

    pub fn test_blob(&self, path: &BlobPath) -> Option<Vec<u8>> {
        self.0.lock().blobs.get(&path.to_string()).map(|b| b.bytes.clone())
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait]
impl DocumentStore for MockServer {
    async fn add(&self, collection: &CollectionPath, data: serde_json::Value) -> Result<DocId, Error> {
        check_object(collection, &data)?;
        let id = DocId::generate();
        let mut state = self.0.lock();
        state.write(&collection.doc(&id), data);
        state.notify(collection);
        Ok(id)
    }

    async fn set(&self, path: &DocPath, data: serde_json::Value) -> Result<(), Error> {
        check_object(path, &data)?;
        let mut state = self.0.lock();
        state.write(path, data);
        state.notify(&path.collection);
        Ok(())
    }

    async fn update(&self, path: &DocPath, updates: Vec<FieldUpdate>) -> Result<(), Error> {
        let mut state = self.0.lock();
        let stored = state
            .collections
            .get_mut(&path.collection)
            .and_then(|c| c.get_mut(&path.id))
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        for u in updates.iter() {
            eval::apply(&mut stored.data, u);
        }
        state.notify(&path.collection);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), Error> {
        let mut state = self.0.lock();
        if let Some(c) = state.collections.get_mut(&path.collection) {
            c.remove(&path.id);
        }
        state.notify(&path.collection);
        Ok(())
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Document>, Error> {
        Ok(self.0.lock().get(path))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, Error> {
        let mut state = self.0.lock();
        state.num_queries += 1;
        Ok(state.run(query))
    }

    async fn listen(&self, target: ListenTarget, sink: SnapshotSink) -> Result<ListenerId, Error> {
        let id = ListenerId::generate();
        let mut state = self.0.lock();
        let snap = state.snapshot(&target);
        if sink.deliver(Ok(snap.clone())) {
            state.listeners.insert(
                id,
                Listener {
                    target,
                    sink,
                    last: Some(snap),
                },
            );
        }
        Ok(id)
    }

    fn unlisten(&self, listener: ListenerId) {
        self.0.lock().listeners.remove(&listener);
    }
}

#[async_trait]
impl AuthProvider for MockServer {
    fn current_user(&self) -> Option<AuthUser> {
        self.0.lock().current_user()
    }

    async fn create_account(&self, account: NewAccount) -> Result<AuthUser, Error> {
        account.validate()?;
        let mut state = self.0.lock();
        if state.accounts.contains_key(&account.email) {
            return Err(Error::EmailAlreadyUsed(account.email));
        }
        state.accounts.insert(
            account.email.clone(),
            Account {
                uid: UserId(DocId::generate()),
                password: account.password,
                display_name: account.display_name,
                photo_uri: account.photo_uri,
                email_verified: false,
            },
        );
        state.signed_in = Some(account.email.clone());
        state.relay_auth_state();
        state
            .auth_user(&account.email)
            .ok_or_else(|| Error::Unknown(String::from("account vanished after creation")))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, Error> {
        let mut state = self.0.lock();
        match state.accounts.get(email) {
            Some(a) if a.password == password => (),
            _ => return Err(Error::InvalidCredentials),
        }
        state.signed_in = Some(String::from(email));
        state.relay_auth_state();
        state.auth_user(email).ok_or(Error::InvalidCredentials)
    }

    async fn sign_out(&self) -> Result<(), Error> {
        let mut state = self.0.lock();
        state.signed_in = None;
        state.relay_auth_state();
        Ok(())
    }

    async fn send_email_verification(&self) -> Result<(), Error> {
        let mut state = self.0.lock();
        let email = state.signed_in.clone().ok_or(Error::NotAuthenticated)?;
        state.verification_emails.push(email);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), Error> {
        let mut state = self.0.lock();
        if !state.accounts.contains_key(email) {
            return Err(Error::NotFound(format!("account {email}")));
        }
        state.password_resets.push(String::from(email));
        Ok(())
    }

    fn subscribe_state(&self) -> mpsc::UnboundedReceiver<Option<AuthUser>> {
        let mut state = self.0.lock();
        let (sender, receiver) = mpsc::unbounded_channel();
        if sender.send(state.current_user()).is_ok() {
            state.auth_feeds.push(sender);
        }
        receiver
    }
}

#[async_trait]
impl BlobStorage for MockServer {
    async fn upload(&self, path: &BlobPath, bytes: Vec<u8>) -> Result<String, Error> {
        let mut state = self.0.lock();
        state.check_storage()?;
        let token = Uuid::new_v4();
        state.blobs.insert(path.to_string(), Blob { bytes, token });
        Ok(format!("mock://storage/{path}?token={token}"))
    }

    async fn download_uri(&self, path: &BlobPath) -> Result<String, Error> {
        let state = self.0.lock();
        state.check_storage()?;
        let blob = state
            .blobs
            .get(&path.to_string())
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        Ok(format!("mock://storage/{path}?token={}", blob.token))
    }

    async fn download(&self, path: &BlobPath) -> Result<Vec<u8>, Error> {
        let state = self.0.lock();
        state.check_storage()?;
        state
            .blobs
            .get(&path.to_string())
            .map(|b| b.bytes.clone())
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &BlobPath) -> Result<(), Error> {
        let mut state = self.0.lock();
        state.check_storage()?;
        state
            .blobs
            .remove(&path.to_string())
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }
}
