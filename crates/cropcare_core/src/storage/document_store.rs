use crate::error::AppError;
use crate::storage::{KeyValueStore, read_list, write_list};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::sync::mpsc::{self, Receiver, Sender};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

pub type Snapshot = Result<Vec<Document>, AppError>;

/// Push-based sequence of query results. Iterating drains the snapshots
/// delivered so far without blocking.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<Snapshot>,
}

impl Subscription {
    pub fn new(receiver: Receiver<Snapshot>) -> Self {
        Self { receiver }
    }

    pub fn channel() -> (Sender<Snapshot>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self::new(receiver))
    }
}

impl Iterator for Subscription {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.try_recv().ok()
    }
}

/// Collection-oriented remote store: add, equality query, live query,
/// partial update and delete.
pub trait DocumentStore {
    fn add(&self, collection: &str, data: Value) -> Result<String, AppError>;
    fn query(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>, AppError>;
    fn subscribe(&self, collection: &str, field: &str, value: &str)
    -> Result<Subscription, AppError>;
    fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), AppError>;
    fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;
}

struct Subscriber {
    collection: String,
    field: String,
    value: String,
    sender: Sender<Snapshot>,
}

/// Document store kept in a key-value backend, one JSON list per collection.
/// Live queries are served in-process: every write pushes a fresh snapshot
/// to the subscribers of the written collection.
pub struct KvDocumentStore<S: KeyValueStore> {
    backend: S,
    subscribers: RefCell<Vec<Subscriber>>,
    sequence: Cell<u64>,
}

impl<S: KeyValueStore> KvDocumentStore<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            subscribers: RefCell::new(Vec::new()),
            sequence: Cell::new(0),
        }
    }

    fn collection_key(collection: &str) -> String {
        format!("collection:{collection}")
    }

    fn load(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        read_list(&self.backend, &Self::collection_key(collection))
            .map_err(|err| AppError::remote(err.message().to_string()))
    }

    fn save(&self, collection: &str, documents: &[Document]) -> Result<(), AppError> {
        write_list(&self.backend, &Self::collection_key(collection), documents)
            .map_err(|err| AppError::remote(err.message().to_string()))
    }

    fn next_id(&self) -> String {
        let sequence = self.sequence.get() + 1;
        self.sequence.set(sequence);
        format!(
            "doc-{}-{sequence}",
            OffsetDateTime::now_utc().unix_timestamp_nanos()
        )
    }

    fn publish(&self, collection: &str) {
        let snapshot = self.load(collection);
        self.subscribers.borrow_mut().retain(|subscriber| {
            if subscriber.collection != collection {
                return true;
            }
            let payload = match &snapshot {
                Ok(documents) => Ok(matching(documents, &subscriber.field, &subscriber.value)),
                Err(err) => Err(AppError::subscription(err.message().to_string())),
            };
            subscriber.sender.send(payload).is_ok()
        });
    }
}

fn matching(documents: &[Document], field: &str, value: &str) -> Vec<Document> {
    documents
        .iter()
        .filter(|document| document.data.get(field).and_then(Value::as_str) == Some(value))
        .cloned()
        .collect()
}

impl<S: KeyValueStore> DocumentStore for KvDocumentStore<S> {
    fn add(&self, collection: &str, data: Value) -> Result<String, AppError> {
        if !data.is_object() {
            return Err(AppError::invalid_input("document must be a JSON object"));
        }

        let mut documents = self.load(collection)?;
        let id = self.next_id();
        documents.push(Document {
            id: id.clone(),
            data,
        });
        self.save(collection, &documents)?;
        self.publish(collection);

        Ok(id)
    }

    fn query(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>, AppError> {
        let documents = self.load(collection)?;
        Ok(matching(&documents, field, value))
    }

    fn subscribe(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Subscription, AppError> {
        let initial = self.query(collection, field, value)?;
        let (sender, subscription) = Subscription::channel();
        sender
            .send(Ok(initial))
            .map_err(|err| AppError::subscription(err.to_string()))?;

        self.subscribers.borrow_mut().push(Subscriber {
            collection: collection.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            sender,
        });

        Ok(subscription)
    }

    fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), AppError> {
        let Value::Object(fields) = partial else {
            return Err(AppError::invalid_input("update must be a JSON object"));
        };

        let mut documents = self.load(collection)?;
        let document = documents
            .iter_mut()
            .find(|document| document.id == id)
            .ok_or_else(|| AppError::remote(format!("document {id} not found")))?;

        if let Value::Object(data) = &mut document.data {
            for (key, value) in fields {
                data.insert(key, value);
            }
        }

        self.save(collection, &documents)?;
        self.publish(collection);
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let mut documents = self.load(collection)?;
        let before = documents.len();
        documents.retain(|document| document.id != id);
        if documents.len() == before {
            return Err(AppError::remote(format!("document {id} not found")));
        }

        self.save(collection, &documents)?;
        self.publish(collection);
        Ok(())
    }
}
