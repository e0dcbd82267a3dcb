//! Startup schema/model synchronization for document-oriented stores.
//!
//! ## Crate layout
//! - `catalog`: schema catalog collaborator (entity definitions, field and
//!   index specs).
//! - `config`: default + per-entity configuration overlay.
//! - `document`: dotted-path helpers over schemaless documents.
//! - `engine`: storage engine boundary and the in-memory engine.
//! - `registry`: entity discovery, canonical naming, and the load cache.
//! - `sort`: dependency-first ordering of discovered entities.
//! - `sync`: per-entity index reconciliation and default backfill.
//! - `bootstrap`: the single startup entrypoint and its report.
//!
//! The `prelude` module mirrors the surface a hosting process touches.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod document;
pub mod engine;
pub mod registry;
pub mod sort;
pub mod sync;

use crate::{engine::EngineError, registry::RegistryError};
use thiserror::Error as ThisError;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    EngineError(#[from] EngineError),

    #[error(transparent)]
    RegistryError(#[from] RegistryError),
}

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// Module-level errors and helpers stay one level down.
///

pub mod prelude {
    pub use crate::{
        bootstrap::{BootstrapReport, SyncEngine},
        catalog::{EntityDefinition, IndexSpec, SchemaCatalog, SchemaFieldSpec, StaticCatalog},
        config::{ConfigStore, DependencySpec, EntityConfig, EntityConfigOverride},
        engine::{Document, EntityHandle, MemoryEngine, StorageEngine},
        registry::{EntityDescriptor, EntityRegistry, LoadOutcome},
        sync::{EntitySyncReport, SyncOperation, SyncOperationResult, Synchronizer},
    };
}
