//! In-memory storage engine.
//!
//! Collections are created lazily on first write, so pre-existing data can
//! be seeded before any entity type is registered against it.

use crate::{
    catalog::{EntityDefinition, IndexSpec},
    document::{self, Document},
    engine::{EngineError, EntityHandle, IndexReconcileOutcome, StorageEngine},
};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

///
/// Collection
///

#[derive(Debug, Default)]
struct Collection {
    next_id: u64,
    documents: BTreeMap<u64, Document>,
    indexes: Vec<IndexSpec>,
}

impl Collection {
    fn insert(&mut self, document: Document) -> u64 {
        self.next_id += 1;
        self.documents.insert(self.next_id, document);
        self.next_id
    }
}

///
/// EngineState
///

#[derive(Debug, Default)]
struct EngineState {
    registrations: BTreeMap<String, EntityHandle>,
    collections: BTreeMap<String, Collection>,
}

impl EngineState {
    fn collection(&self, name: &str) -> Result<&Collection, EngineError> {
        self.collections
            .get(name)
            .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut Collection, EngineError> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))
    }
}

///
/// MemoryEngine
///

#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<EngineState>,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state
            .lock()
            .expect("memory engine mutex poisoned while acquiring lock")
    }

    /// All documents of a collection, in id order. Empty for an unknown
    /// collection.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .map(|collection| collection.documents.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Live indexes of a collection. Empty for an unknown collection.
    #[must_use]
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.lock()
            .collections
            .get(collection)
            .map(|collection| collection.indexes.clone())
            .unwrap_or_default()
    }
}

impl StorageEngine for MemoryEngine {
    fn is_registered(&self, entity: &str) -> bool {
        self.lock().registrations.contains_key(entity)
    }

    fn existing(&self, entity: &str) -> Option<EntityHandle> {
        self.lock().registrations.get(entity).cloned()
    }

    fn register(
        &self,
        entity: &str,
        collection: &str,
        _definition: &EntityDefinition,
    ) -> Result<EntityHandle, EngineError> {
        let mut state = self.lock();

        if state.registrations.contains_key(entity) {
            return Err(EngineError::AlreadyRegistered(entity.to_string()));
        }

        let handle = EntityHandle::new(entity, collection);
        state
            .registrations
            .insert(entity.to_string(), handle.clone());
        state.collections.entry(collection.to_string()).or_default();

        Ok(handle)
    }

    fn ensure_indexes(
        &self,
        collection: &str,
        indexes: &[IndexSpec],
    ) -> Result<IndexReconcileOutcome, EngineError> {
        let mut state = self.lock();
        let collection = state.collections.entry(collection.to_string()).or_default();

        let mut created = 0;
        for index in indexes {
            if !collection.indexes.contains(index) {
                collection.indexes.push(index.clone());
                created += 1;
            }
        }

        Ok(IndexReconcileOutcome {
            created,
            total: collection.indexes.len(),
        })
    }

    fn probe_document(&self, collection: &str) -> Result<Option<Document>, EngineError> {
        let state = self.lock();
        let collection = state.collection(collection)?;

        Ok(collection.documents.values().next().cloned())
    }

    fn set_where_missing(
        &self,
        collection: &str,
        path: &str,
        value: &Value,
    ) -> Result<u64, EngineError> {
        let mut state = self.lock();
        let collection = state.collection_mut(collection)?;

        let mut modified = 0;
        for document in collection.documents.values_mut() {
            if document::field_present(document, path) {
                continue;
            }
            if document::set_field(document, path, value.clone()) {
                modified += 1;
            }
        }

        Ok(modified)
    }

    fn insert_document(&self, collection: &str, document: Document) -> Result<u64, EngineError> {
        let mut state = self.lock();
        let collection = state.collections.entry(collection.to_string()).or_default();

        Ok(collection.insert(document))
    }

    fn count_documents(&self, collection: &str) -> Result<u64, EngineError> {
        let state = self.lock();
        let collection = state.collection(collection)?;

        Ok(collection.documents.len() as u64)
    }
}
