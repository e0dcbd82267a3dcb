//! Startup orchestration: discovery, ordering, and per-entity sync.
//!
//! One fully sequential pass per call, no concurrency across entities; the
//! hosting process calls [`SyncEngine::bootstrap`] once after the storage
//! connection is up and before it accepts traffic. Bulk backfills are costly
//! under load, so entities run strictly one at a time in sorted order.

use crate::{
    Error,
    catalog::SchemaCatalog,
    config::ConfigStore,
    engine::{EntityHandle, StorageEngine},
    registry::{EntityRegistry, LoadOutcome},
    sort::sort_by_dependency,
    sync::{EntitySyncReport, Synchronizer},
};
use derive_more::{Deref, IntoIterator};
use serde::Serialize;
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::{error, info};

///
/// BootstrapErrorEntry
///

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapErrorEntry {
    pub entity_name: String,
    pub error: String,
}

///
/// SyncedReports
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, Serialize)]
#[serde(transparent)]
pub struct SyncedReports(#[into_iterator(owned, ref)] Vec<EntitySyncReport>);

///
/// BootstrapReport
///
/// Built fresh on every bootstrap run and returned to the caller; never
/// persisted. A populated top-level `error` means the run failed outside
/// every per-entity boundary.
///

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapReport {
    pub total_entities: usize,
    pub synced: SyncedReports,
    pub errors: Vec<BootstrapErrorEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BootstrapReport {
    fn aborted(error: String) -> Self {
        Self {
            total_entities: 0,
            synced: SyncedReports::default(),
            errors: Vec::new(),
            error: Some(error),
        }
    }

    /// True when every entity loaded and every operation succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.error.is_none()
            && self.errors.is_empty()
            && self.synced.iter().all(|report| report.success)
    }
}

///
/// SyncEngine
///
/// The in-process surface the hosting process consumes: one registry, one
/// synchronizer, one `bootstrap` entrypoint.
///

pub struct SyncEngine {
    registry: EntityRegistry,
    synchronizer: Synchronizer,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn SchemaCatalog>,
        configs: ConfigStore,
        engine: Arc<dyn StorageEngine>,
    ) -> Self {
        Self {
            registry: EntityRegistry::new(catalog, configs, engine.clone()),
            synchronizer: Synchronizer::new(engine),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub const fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Operational tooling hook: resolve one entity's live handle, as a
    /// maintenance command would before expecting the next bootstrap to roll
    /// a schema change out.
    pub fn load_handle(&mut self, name: &str) -> Result<EntityHandle, Error> {
        match self.registry.try_load(name) {
            LoadOutcome::Loaded(handle) | LoadOutcome::AlreadyRegistered(handle) => Ok(handle),
            LoadOutcome::Failed(err) => Err(err.into()),
        }
    }

    /// Run one full synchronization pass. Never fails: anything escaping the
    /// per-entity boundaries is converted into the report's top-level error,
    /// so a failing synchronization cannot prevent the hosting process from
    /// starting.
    pub fn bootstrap(&mut self) -> BootstrapReport {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run())) {
            Ok(report) => report,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(error = %message, "bootstrap aborted outside entity boundaries");
                BootstrapReport::aborted(message)
            }
        }
    }

    fn run(&mut self) -> BootstrapReport {
        self.registry.clear_cache();

        let outcome = sort_by_dependency(self.registry.discover());
        let total_entities = outcome.entities.len();

        let mut synced = Vec::with_capacity(total_entities);
        let mut errors = Vec::new();

        for descriptor in &outcome.entities {
            match self.registry.try_load(&descriptor.name) {
                LoadOutcome::Loaded(handle) | LoadOutcome::AlreadyRegistered(handle) => {
                    synced.push(self.synchronizer.sync(&handle, descriptor));
                }
                LoadOutcome::Failed(err) => {
                    error!(entity = %descriptor.name, error = %err, "skipping entity: load failed");
                    errors.push(BootstrapErrorEntry {
                        entity_name: descriptor.name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let succeeded = synced.iter().filter(|report| report.success).count();
        info!(
            total_entities,
            succeeded,
            failed = total_entities - succeeded,
            "model synchronization complete"
        );

        BootstrapReport {
            total_entities,
            synced: SyncedReports(synced),
            errors,
            error: None,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "bootstrap panicked with a non-string payload".to_string()
    }
}
