//! Shared schema and config fixtures for modelsync test surfaces.
//!
//! A small shop domain: `Product` and `User` stand alone, `Order` depends on
//! both. Identifiers are registered lower-cased to exercise canonicalization.

use modelsync::prelude::*;
use serde_json::json;

/// `Product` as first shipped: no popularity field yet.
#[must_use]
pub fn product_definition() -> EntityDefinition {
    EntityDefinition::new("product")
        .with_field(SchemaFieldSpec::new("name"))
        .with_field(SchemaFieldSpec::new("price"))
        .with_field(SchemaFieldSpec::with_default("isActive", json!(true)))
        .with_index(IndexSpec::unique(["name"]))
}

/// `Product` after a deploy that adds `isPopular` with a default.
#[must_use]
pub fn product_definition_with_popularity() -> EntityDefinition {
    product_definition().with_field(SchemaFieldSpec::with_default("isPopular", json!(false)))
}

#[must_use]
pub fn user_definition() -> EntityDefinition {
    EntityDefinition::new("user")
        .with_field(SchemaFieldSpec::new("email"))
        .with_field(SchemaFieldSpec::with_default("role", json!("customer")))
        .with_index(IndexSpec::unique(["email"]))
}

#[must_use]
pub fn order_definition() -> EntityDefinition {
    EntityDefinition::new("order")
        .with_field(SchemaFieldSpec::new("customer"))
        .with_field(SchemaFieldSpec::with_default("status", json!("pending")))
        .with_index(IndexSpec::new(["customer"]))
        .with_index(IndexSpec::new(["status"]))
}

/// The shop catalog in deliberately scrambled discovery order: `Order` is
/// registered before the entities it depends on.
#[must_use]
pub fn shop_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    catalog.register(order_definition());
    catalog.register(product_definition());
    catalog.register(user_definition());
    catalog
}

/// The shop catalog with the popularity field rolled into `Product`.
#[must_use]
pub fn shop_catalog_with_popularity() -> StaticCatalog {
    let mut catalog = shop_catalog();
    catalog.register(product_definition_with_popularity());
    catalog
}

/// Shop configs: `Order` declares its edges to `Product` and `User`.
#[must_use]
pub fn shop_configs() -> ConfigStore {
    let mut configs = ConfigStore::new();
    configs.set_override(
        "Order",
        EntityConfigOverride {
            dependencies: Some(vec![
                DependencySpec::new("Product", "items.product"),
                DependencySpec::new("User", "customer"),
            ]),
            ..EntityConfigOverride::default()
        },
    );
    configs
}
