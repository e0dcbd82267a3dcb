//! End-to-end bootstrap behavior over the in-memory engine.

use modelsync::{
    catalog::EntityDefinition,
    config::EntityConfigOverride,
    engine::{EngineError, IndexReconcileOutcome},
    prelude::*,
};
use modelsync_testing_fixtures::{shop_catalog, shop_catalog_with_popularity, shop_configs};
use serde_json::{Map, Value, json};
use std::sync::Arc;

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("test document must be an object, got {other}"),
    }
}

fn backfill_detail<'a>(report: &'a EntitySyncReport) -> &'a Value {
    let operation = report
        .operations
        .iter()
        .find(|operation| operation.operation == SyncOperation::BackfillDefaults)
        .expect("synced entity should carry a backfill result");
    &operation.detail
}

fn entity_report<'a>(report: &'a BootstrapReport, name: &str) -> &'a EntitySyncReport {
    report
        .synced
        .iter()
        .find(|entity| entity.entity_name == name)
        .unwrap_or_else(|| panic!("report for '{name}' should exist"))
}

#[test]
fn fresh_store_bootstrap_orders_and_syncs_everything() {
    let engine = Arc::new(MemoryEngine::new());
    let mut sync = SyncEngine::new(Arc::new(shop_catalog()), shop_configs(), engine.clone());

    let report = sync.bootstrap();

    assert!(report.success(), "fresh bootstrap should fully succeed");
    assert_eq!(report.total_entities, 3);
    assert!(report.errors.is_empty());

    let order: Vec<&str> = report
        .synced
        .iter()
        .map(|entity| entity.entity_name.as_str())
        .collect();
    assert_eq!(
        order,
        vec!["Product", "User", "Order"],
        "dependencies must be synced before dependents"
    );

    assert_eq!(engine.indexes("products").len(), 1);
    assert_eq!(engine.indexes("orders").len(), 2);
    assert_eq!(
        backfill_detail(entity_report(&report, "Product")),
        &json!({ "note": "no documents to update" })
    );
}

#[test]
fn new_default_field_is_backfilled_once() {
    let engine = Arc::new(MemoryEngine::new());
    engine
        .insert_document("products", doc(json!({ "name": "anvil", "price": 10 })))
        .expect("seed insert should succeed");

    // First deploy: schema without the popularity field.
    let mut sync = SyncEngine::new(Arc::new(shop_catalog()), shop_configs(), engine.clone());
    let report = sync.bootstrap();
    assert_eq!(
        backfill_detail(entity_report(&report, "Product")),
        &json!({ "backfilled": { "isActive": 1 } })
    );

    // Second deploy adds `isPopular` with default false.
    let mut sync = SyncEngine::new(
        Arc::new(shop_catalog_with_popularity()),
        shop_configs(),
        engine.clone(),
    );
    let report = sync.bootstrap();
    assert!(report.success());
    assert_eq!(
        backfill_detail(entity_report(&report, "Product")),
        &json!({ "backfilled": { "isPopular": 1 } })
    );

    let product = &engine.documents("products")[0];
    assert_eq!(product["isPopular"], json!(false));
    assert_eq!(product["isActive"], json!(true));
    assert_eq!(product["price"], json!(10), "existing values stay untouched");

    // Third run: everything is rolled out, nothing left to modify.
    let report = sync.bootstrap();
    assert!(report.success());
    assert_eq!(
        backfill_detail(entity_report(&report, "Product")),
        &json!({ "backfilled": {} }),
        "a repeated bootstrap must modify zero documents"
    );
}

#[test]
fn probe_hit_suppresses_the_bulk_update_entirely() {
    let engine = Arc::new(MemoryEngine::new());
    // The probe document carries the field (as null); the second one lacks it.
    engine
        .insert_document(
            "products",
            doc(json!({ "name": "anvil", "isActive": true, "isPopular": null })),
        )
        .expect("seed insert should succeed");
    engine
        .insert_document(
            "products",
            doc(json!({ "name": "rope", "isActive": false })),
        )
        .expect("seed insert should succeed");

    let mut sync = SyncEngine::new(
        Arc::new(shop_catalog_with_popularity()),
        shop_configs(),
        engine.clone(),
    );
    let report = sync.bootstrap();
    assert!(report.success());

    let detail = backfill_detail(entity_report(&report, "Product"));
    assert_eq!(
        detail["backfilled"].get("isPopular"),
        None,
        "a field present on the probe is assumed rolled out"
    );

    let documents = engine.documents("products");
    assert_eq!(documents[0]["isPopular"], json!(null));
    assert!(
        !documents[1].contains_key("isPopular"),
        "no bulk update may be issued for a probe-present field"
    );
}

#[test]
fn disabled_entity_is_reported_as_skipped() {
    let mut configs = shop_configs();
    configs.set_override(
        "Order",
        EntityConfigOverride {
            sync_indexes: Some(false),
            ..EntityConfigOverride::default()
        },
    );

    let engine = Arc::new(MemoryEngine::new());
    let mut sync = SyncEngine::new(Arc::new(shop_catalog()), configs, engine.clone());
    let report = sync.bootstrap();

    assert!(report.success());
    let order = entity_report(&report, "Order");
    assert!(order.skipped.is_some());
    assert!(order.operations.is_empty());
    assert!(
        engine.indexes("orders").is_empty(),
        "a skipped entity must not have its indexes reconciled"
    );
}

///
/// RegisterFailingEngine
///
/// Delegates to a memory engine but refuses to register one entity type.
///

struct RegisterFailingEngine {
    inner: Arc<MemoryEngine>,
    fail_entity: &'static str,
}

impl StorageEngine for RegisterFailingEngine {
    fn is_registered(&self, entity: &str) -> bool {
        self.inner.is_registered(entity)
    }

    fn existing(&self, entity: &str) -> Option<EntityHandle> {
        self.inner.existing(entity)
    }

    fn register(
        &self,
        entity: &str,
        collection: &str,
        definition: &EntityDefinition,
    ) -> Result<EntityHandle, EngineError> {
        if entity == self.fail_entity {
            return Err(EngineError::Backend("connection reset".to_string()));
        }
        self.inner.register(entity, collection, definition)
    }

    fn ensure_indexes(
        &self,
        collection: &str,
        indexes: &[modelsync::catalog::IndexSpec],
    ) -> Result<IndexReconcileOutcome, EngineError> {
        self.inner.ensure_indexes(collection, indexes)
    }

    fn probe_document(&self, collection: &str) -> Result<Option<Document>, EngineError> {
        self.inner.probe_document(collection)
    }

    fn set_where_missing(
        &self,
        collection: &str,
        path: &str,
        value: &Value,
    ) -> Result<u64, EngineError> {
        self.inner.set_where_missing(collection, path, value)
    }

    fn insert_document(&self, collection: &str, document: Document) -> Result<u64, EngineError> {
        self.inner.insert_document(collection, document)
    }

    fn count_documents(&self, collection: &str) -> Result<u64, EngineError> {
        self.inner.count_documents(collection)
    }
}

#[test]
fn one_failing_entity_does_not_abort_the_others() {
    let engine = Arc::new(RegisterFailingEngine {
        inner: Arc::new(MemoryEngine::new()),
        fail_entity: "User",
    });
    let mut sync = SyncEngine::new(Arc::new(shop_catalog()), shop_configs(), engine);

    let report = sync.bootstrap();

    assert!(!report.success());
    assert_eq!(report.total_entities, 3);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].entity_name, "User");
    assert!(report.errors[0].error.contains("connection reset"));

    assert!(entity_report(&report, "Product").success);
    assert!(
        entity_report(&report, "Order").success,
        "entities after the failing one must still be processed"
    );
}

///
/// PanickyEngine
///

struct PanickyEngine;

impl StorageEngine for PanickyEngine {
    fn is_registered(&self, _entity: &str) -> bool {
        panic!("storage driver wedged");
    }

    fn existing(&self, _entity: &str) -> Option<EntityHandle> {
        None
    }

    fn register(
        &self,
        entity: &str,
        collection: &str,
        _definition: &EntityDefinition,
    ) -> Result<EntityHandle, EngineError> {
        Ok(EntityHandle::new(entity, collection))
    }

    fn ensure_indexes(
        &self,
        _collection: &str,
        _indexes: &[modelsync::catalog::IndexSpec],
    ) -> Result<IndexReconcileOutcome, EngineError> {
        Ok(IndexReconcileOutcome::default())
    }

    fn probe_document(&self, _collection: &str) -> Result<Option<Document>, EngineError> {
        Ok(None)
    }

    fn set_where_missing(
        &self,
        _collection: &str,
        _path: &str,
        _value: &Value,
    ) -> Result<u64, EngineError> {
        Ok(0)
    }

    fn insert_document(&self, _collection: &str, _document: Document) -> Result<u64, EngineError> {
        Ok(1)
    }

    fn count_documents(&self, _collection: &str) -> Result<u64, EngineError> {
        Ok(0)
    }
}

#[test]
fn panics_surface_as_a_top_level_report_error() {
    let mut sync = SyncEngine::new(
        Arc::new(shop_catalog()),
        shop_configs(),
        Arc::new(PanickyEngine),
    );

    let report = sync.bootstrap();

    assert!(!report.success());
    assert_eq!(
        report.error.as_deref(),
        Some("storage driver wedged"),
        "the panic payload becomes the top-level error"
    );
    assert!(report.synced.is_empty());
}

#[test]
fn tooling_can_load_handles_outside_bootstrap() {
    let engine = Arc::new(MemoryEngine::new());
    let mut sync = SyncEngine::new(Arc::new(shop_catalog()), shop_configs(), engine);

    let handle = sync
        .load_handle("product")
        .expect("case-insensitive tooling load should resolve");
    assert_eq!(handle.entity, "Product");
    assert_eq!(handle.collection, "products");

    let err = sync
        .load_handle("Basket")
        .expect_err("unknown entity should fail the tooling load");
    assert!(err.to_string().contains("unknown entity 'Basket'"));

    let report = sync.bootstrap();
    assert!(
        report.success(),
        "a bootstrap after tooling loads recovers the existing registrations"
    );
}

#[test]
fn second_bootstrap_is_a_no_op_on_storage() {
    let engine = Arc::new(MemoryEngine::new());
    engine
        .insert_document("users", doc(json!({ "email": "a@example.com" })))
        .expect("seed insert should succeed");

    let mut sync = SyncEngine::new(Arc::new(shop_catalog()), shop_configs(), engine.clone());
    assert!(sync.bootstrap().success());

    let snapshot = engine.documents("users");
    let report = sync.bootstrap();

    assert!(report.success());
    assert_eq!(
        engine.documents("users"),
        snapshot,
        "a repeated bootstrap must not change stored documents"
    );
    for entity in report.synced.iter() {
        let detail = backfill_detail(entity);
        if let Some(counts) = detail["backfilled"].as_object() {
            assert!(
                counts.values().all(|count| count == &json!(0)),
                "second run should report zero modified documents, got {detail}"
            );
        }
    }
}
