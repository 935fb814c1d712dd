use crate::{CollectionPath, DocId, DocPath, Document, Entity, Error};

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq {
        field: String,
        value: serde_json::Value,
    },
    Gte {
        field: String,
        value: serde_json::Value,
    },
    ArrayContains {
        field: String,
        value: serde_json::Value,
    },

    /// Documents whose id is one of these
    IdIn(Vec<DocId>),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Collection query: conjunction of filters, optional single ordering, optional limit
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn all(collection: CollectionPath) -> Query {
        Query {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl serde::Serialize) -> Query {
        self.filters.push(Filter::Eq {
            field: String::from(field),
            value: to_value(value),
        });
        self
    }

    pub fn where_gte(mut self, field: &str, value: impl serde::Serialize) -> Query {
        self.filters.push(Filter::Gte {
            field: String::from(field),
            value: to_value(value),
        });
        self
    }

    pub fn where_array_contains(mut self, field: &str, value: impl serde::Serialize) -> Query {
        self.filters.push(Filter::ArrayContains {
            field: String::from(field),
            value: to_value(value),
        });
        self
    }

    pub fn where_id_in<I>(mut self, ids: I) -> Query
    where
        I: IntoIterator,
        I::Item: AsRef<DocId>,
    {
        self.filters.push(Filter::IdIn(
            ids.into_iter().map(|id| id.as_ref().clone()).collect(),
        ));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Query {
        self.order_by = Some(OrderBy {
            field: String::from(field),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Query {
        self.limit = Some(limit);
        self
    }
}

// Serializing plain values (strings, numbers, ids, times) into JSON cannot fail
fn to_value(v: impl serde::Serialize) -> serde_json::Value {
    serde_json::to_value(v).unwrap_or(serde_json::Value::Null)
}

/// What a listener is attached to
#[derive(Clone, Debug, PartialEq)]
pub enum ListenTarget {
    Query(Query),
    Document(DocPath),
}

impl ListenTarget {
    pub fn collection(&self) -> &CollectionPath {
        match self {
            ListenTarget::Query(q) => &q.collection,
            ListenTarget::Document(p) => &p.collection,
        }
    }
}

impl From<Query> for ListenTarget {
    fn from(q: Query) -> ListenTarget {
        ListenTarget::Query(q)
    }
}

impl From<DocPath> for ListenTarget {
    fn from(p: DocPath) -> ListenTarget {
        ListenTarget::Document(p)
    }
}

/// Full state of a listen target at one point in time
#[derive(Clone, Debug, PartialEq)]
pub enum Snapshot {
    Query(Vec<Document>),

    /// `None` when the document does not exist
    Document(Option<Document>),
}

impl Snapshot {
    pub fn documents(&self) -> &[Document] {
        match self {
            Snapshot::Query(docs) => docs,
            Snapshot::Document(Some(doc)) => std::slice::from_ref(doc),
            Snapshot::Document(None) => &[],
        }
    }

    /// Decodes every document, in snapshot order
    pub fn decode_all<T: Entity>(&self) -> Result<Vec<T>, Error> {
        self.documents().iter().map(T::from_document).collect()
    }

    pub fn decode_one<T: Entity>(&self) -> Result<Option<T>, Error> {
        match self.documents().first() {
            Some(doc) => Ok(Some(T::from_document(doc)?)),
            None => Ok(None),
        }
    }
}

/// Partial update of a document field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate {
    Set {
        field: String,
        value: serde_json::Value,
    },
    Increment {
        field: String,
        by: i64,
    },

    /// Appends the values not already present in the array
    ArrayUnion {
        field: String,
        values: Vec<serde_json::Value>,
    },
    ArrayRemove {
        field: String,
        values: Vec<serde_json::Value>,
    },
}

impl FieldUpdate {
    pub fn set(field: &str, value: impl serde::Serialize) -> FieldUpdate {
        FieldUpdate::Set {
            field: String::from(field),
            value: to_value(value),
        }
    }

    pub fn increment(field: &str, by: i64) -> FieldUpdate {
        FieldUpdate::Increment {
            field: String::from(field),
            by,
        }
    }

    pub fn array_union(field: &str, value: impl serde::Serialize) -> FieldUpdate {
        FieldUpdate::ArrayUnion {
            field: String::from(field),
            values: vec![to_value(value)],
        }
    }

    pub fn array_remove(field: &str, value: impl serde::Serialize) -> FieldUpdate {
        FieldUpdate::ArrayRemove {
            field: String::from(field),
            values: vec![to_value(value)],
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldUpdate::Set { field, .. }
            | FieldUpdate::Increment { field, .. }
            | FieldUpdate::ArrayUnion { field, .. }
            | FieldUpdate::ArrayRemove { field, .. } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_accumulates_filters() {
        let q = Query::all(CollectionPath::root("courses"))
            .where_eq("author_id", "u1")
            .where_array_contains("tags", "rust")
            .order_by("created_at", Direction::Desc)
            .limit(3);
        assert_eq!(
            q.filters,
            vec![
                Filter::Eq {
                    field: String::from("author_id"),
                    value: json!("u1"),
                },
                Filter::ArrayContains {
                    field: String::from("tags"),
                    value: json!("rust"),
                },
            ]
        );
        assert_eq!(q.order_by.map(|o| o.direction), Some(Direction::Desc));
        assert_eq!(q.limit, Some(3));
    }

    #[test]
    fn missing_document_snapshot_is_empty() {
        assert!(Snapshot::Document(None).documents().is_empty());
    }
}
