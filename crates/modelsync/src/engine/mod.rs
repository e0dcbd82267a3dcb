//! Storage engine boundary.
//!
//! The synchronization core only ever talks to a [`StorageEngine`]; the wire
//! format and driver behind it are the hosting process's concern. The crate
//! ships [`MemoryEngine`] for tests and embedding.

mod memory;

pub use memory::MemoryEngine;

use crate::catalog::{EntityDefinition, IndexSpec};
use serde::Serialize;
use thiserror::Error as ThisError;

pub use crate::document::Document;

///
/// EngineError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum EngineError {
    /// Duplicate registration of an entity type. Recoverable: callers reuse
    /// the existing registration instead of failing.
    #[error("entity type '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("collection '{0}' not found")]
    CollectionNotFound(String),
}

///
/// EntityHandle
///
/// A live binding of one entity type to its backing collection.
///

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityHandle {
    pub entity: String,
    pub collection: String,
}

impl EntityHandle {
    pub fn new(entity: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            collection: collection.into(),
        }
    }
}

///
/// IndexReconcileOutcome
///

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexReconcileOutcome {
    /// Indexes created by this reconciliation pass.
    pub created: usize,
    /// Indexes live on the collection after the pass.
    pub total: usize,
}

///
/// StorageEngine
///
/// Index reconciliation is additive: an engine implementation must never
/// drop a live index on behalf of this trait.
///

pub trait StorageEngine {
    /// Whether the entity type already has a live registration.
    fn is_registered(&self, entity: &str) -> bool;

    /// The existing registration for an entity type, if any.
    fn existing(&self, entity: &str) -> Option<EntityHandle>;

    /// Register an entity type against its backing collection. Returns
    /// [`EngineError::AlreadyRegistered`] on a duplicate.
    fn register(
        &self,
        entity: &str,
        collection: &str,
        definition: &EntityDefinition,
    ) -> Result<EntityHandle, EngineError>;

    /// Bring the collection's secondary indexes up to the declared set,
    /// additively.
    fn ensure_indexes(
        &self,
        collection: &str,
        indexes: &[IndexSpec],
    ) -> Result<IndexReconcileOutcome, EngineError>;

    /// One arbitrary stored document, or `None` when the collection is empty.
    fn probe_document(&self, collection: &str) -> Result<Option<Document>, EngineError>;

    /// Set `path` to `value` on every document currently missing it. Returns
    /// the number of documents modified.
    fn set_where_missing(
        &self,
        collection: &str,
        path: &str,
        value: &serde_json::Value,
    ) -> Result<u64, EngineError>;

    /// Insert one document, returning its assigned id.
    fn insert_document(&self, collection: &str, document: Document) -> Result<u64, EngineError>;

    /// Number of stored documents in a collection.
    fn count_documents(&self, collection: &str) -> Result<u64, EngineError>;
}
