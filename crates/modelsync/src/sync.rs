//! Per-entity synchronization: index reconciliation and default backfill.
//!
//! Both steps run against a loaded handle and capture their own failures;
//! nothing here aborts the run for other entities. The backfill is
//! idempotent: a defaulted field present on the probe document (with any
//! value, including null) is assumed rolled out and is never touched.

use crate::{
    catalog::EntityDefinition,
    document,
    engine::{EngineError, EntityHandle, StorageEngine},
    registry::EntityDescriptor,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

///
/// SyncOperation
///

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncOperation {
    SyncIndexes,
    BackfillDefaults,
}

impl Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncIndexes => write!(f, "syncIndexes"),
            Self::BackfillDefaults => write!(f, "backfillDefaults"),
        }
    }
}

///
/// SyncOperationResult
///

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperationResult {
    pub entity_name: String,
    pub operation: SyncOperation,
    pub success: bool,
    pub detail: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncOperationResult {
    fn ok(entity_name: impl Into<String>, operation: SyncOperation, detail: Value) -> Self {
        Self {
            entity_name: entity_name.into(),
            operation,
            success: true,
            detail,
            error: None,
        }
    }

    fn failed(entity_name: impl Into<String>, operation: SyncOperation, error: String) -> Self {
        Self {
            entity_name: entity_name.into(),
            operation,
            success: false,
            detail: Value::Null,
            error: Some(error),
        }
    }
}

///
/// EntitySyncReport
///

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySyncReport {
    pub entity_name: String,
    pub operations: Vec<SyncOperationResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,

    pub success: bool,
}

impl EntitySyncReport {
    fn skipped(entity_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            operations: Vec::new(),
            skipped: Some(reason.into()),
            success: true,
        }
    }

    fn from_operations(entity_name: impl Into<String>, operations: Vec<SyncOperationResult>) -> Self {
        let success = operations.iter().all(|operation| operation.success);

        Self {
            entity_name: entity_name.into(),
            operations,
            skipped: None,
            success,
        }
    }
}

///
/// Synchronizer
///

pub struct Synchronizer {
    engine: Arc<dyn StorageEngine>,
}

impl Synchronizer {
    #[must_use]
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self { engine }
    }

    /// Reconcile indexes, then backfill defaults, for one loaded entity.
    /// Entities configured with `sync_indexes = false` get a skipped report
    /// and no operations.
    pub fn sync(&self, handle: &EntityHandle, descriptor: &EntityDescriptor) -> EntitySyncReport {
        if !descriptor.config.sync_indexes {
            return EntitySyncReport::skipped(
                descriptor.name.clone(),
                "index synchronization disabled by config",
            );
        }

        let operations = vec![
            self.reconcile_indexes(handle, descriptor),
            self.backfill_defaults(handle, descriptor),
        ];

        EntitySyncReport::from_operations(descriptor.name.clone(), operations)
    }

    /// Additive index reconciliation; the engine never drops an index on our
    /// behalf.
    fn reconcile_indexes(
        &self,
        handle: &EntityHandle,
        descriptor: &EntityDescriptor,
    ) -> SyncOperationResult {
        match self
            .engine
            .ensure_indexes(&handle.collection, &descriptor.definition.indexes)
        {
            Ok(outcome) => SyncOperationResult::ok(
                &descriptor.name,
                SyncOperation::SyncIndexes,
                json!({ "created": outcome.created, "total": outcome.total }),
            ),
            Err(err) => SyncOperationResult::failed(
                &descriptor.name,
                SyncOperation::SyncIndexes,
                err.to_string(),
            ),
        }
    }

    fn backfill_defaults(
        &self,
        handle: &EntityHandle,
        descriptor: &EntityDescriptor,
    ) -> SyncOperationResult {
        if !descriptor.config.apply_defaults_to_existing {
            return SyncOperationResult::ok(
                &descriptor.name,
                SyncOperation::BackfillDefaults,
                json!({ "note": "default backfill disabled by config" }),
            );
        }

        match self.try_backfill(handle, &descriptor.definition) {
            Ok(detail) => {
                SyncOperationResult::ok(&descriptor.name, SyncOperation::BackfillDefaults, detail)
            }
            Err(err) => SyncOperationResult::failed(
                &descriptor.name,
                SyncOperation::BackfillDefaults,
                err.to_string(),
            ),
        }
    }

    /// Check-before-write backfill: one probe document decides which
    /// defaulted fields still need rolling out; each missing field gets one
    /// bulk update over the documents lacking it.
    fn try_backfill(
        &self,
        handle: &EntityHandle,
        definition: &EntityDefinition,
    ) -> Result<Value, EngineError> {
        let Some(probe) = self.engine.probe_document(&handle.collection)? else {
            return Ok(json!({ "note": "no documents to update" }));
        };

        let mut backfilled = Map::new();
        for field in definition.defaulted_fields() {
            if document::field_present(&probe, &field.path) {
                continue;
            }

            let Some(default) = &field.default else {
                continue;
            };
            let modified =
                self.engine
                    .set_where_missing(&handle.collection, &field.path, default)?;
            backfilled.insert(field.path.clone(), json!(modified));
        }

        Ok(json!({ "backfilled": backfilled }))
    }
}
