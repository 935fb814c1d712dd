use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

use crate::Error;

/// Raw document id, as assigned by the backend
#[derive(
    Clone,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(transparent)]
pub struct DocId(pub String);

impl DocId {
    pub fn empty() -> DocId {
        DocId(String::new())
    }

    pub fn generate() -> DocId {
        DocId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> DocId {
        DocId(String::from(s))
    }
}

impl From<String> for DocId {
    fn from(s: String) -> DocId {
        DocId(s)
    }
}

impl AsRef<DocId> for DocId {
    fn as_ref(&self) -> &DocId {
        self
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

doc_id!(
    /// Key of the join records (likes, studies, memberships)
    RecordId
);

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn root(name: &str) -> CollectionPath {
        CollectionPath(String::from(name))
    }

    /// Sub-collection `name` of the document `id` in this collection
    pub fn child(&self, id: &DocId, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}/{}", self.0, id, name))
    }

    pub fn doc(&self, id: impl AsRef<DocId>) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.as_ref().clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DocPath {
    pub collection: CollectionPath,
    pub id: DocId,
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub data: serde_json::Value,
}

impl Document {
    pub fn decode<T: Entity>(&self) -> Result<T, Error> {
        T::from_document(self)
    }
}

pub trait Keyed {
    type Key: Clone + Eq + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// A typed document. The key lives in the document path, never in the body.
pub trait Entity:
    Keyed + Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    fn set_key(&mut self, id: DocId);

    fn from_document(doc: &Document) -> Result<Self, Error> {
        let mut res: Self = serde_json::from_value(doc.data.clone())
            .map_err(|e| Error::InvalidDocument(format!("{}: {}", doc.path, e)))?;
        res.set_key(doc.path.id.clone());
        Ok(res)
    }

    fn to_data(&self) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_non_empty() {
        let a = DocId::generate();
        let b = DocId::generate();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn paths_display() {
        let comments = CollectionPath::root("course-comments").child(&DocId::from("c1"), "comments");
        assert_eq!(comments.as_str(), "course-comments/c1/comments");
        assert_eq!(
            comments.doc(DocId::from("x")).to_string(),
            "course-comments/c1/comments/x"
        );
    }
}
