//! Per-entity configuration overlaid on a default configuration.
//!
//! Pure data lookup, no I/O. Overrides are typed partials: only the fields an
//! override sets win over the default, field by field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// DependencySpec
///
/// A declared edge to another entity, with the document path the reference
/// lives at.
///

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
    pub entity_name: String,
    pub via_path: String,
}

impl DependencySpec {
    pub fn new(entity_name: impl Into<String>, via_path: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            via_path: via_path.into(),
        }
    }
}

///
/// EntityConfig
///
/// The merged configuration for one entity. `name` always carries the name
/// the config was requested under; neither the default nor an override can
/// change it.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    pub name: String,
    pub apply_defaults_to_existing: bool,
    pub sync_indexes: bool,
    pub strict_validation: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencySpec>,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            apply_defaults_to_existing: true,
            sync_indexes: true,
            strict_validation: true,
            collection_name: None,
            dependencies: Vec::new(),
        }
    }
}

///
/// EntityConfigOverride
///
/// A partial config: every field is optional, and only set fields override
/// the default during merge.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfigOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_defaults_to_existing: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_indexes: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_validation: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencySpec>>,
}

impl EntityConfigOverride {
    fn apply(&self, config: &mut EntityConfig) {
        if let Some(apply_defaults) = self.apply_defaults_to_existing {
            config.apply_defaults_to_existing = apply_defaults;
        }
        if let Some(sync_indexes) = self.sync_indexes {
            config.sync_indexes = sync_indexes;
        }
        if let Some(strict_validation) = self.strict_validation {
            config.strict_validation = strict_validation;
        }
        if let Some(collection_name) = &self.collection_name {
            config.collection_name = Some(collection_name.clone());
        }
        if let Some(dependencies) = &self.dependencies {
            config.dependencies = dependencies.clone();
        }
    }
}

///
/// ConfigStore
///

#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    default: EntityConfig,
    overrides: BTreeMap<String, EntityConfigOverride>,
}

impl ConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default configuration the overrides merge onto.
    #[must_use]
    pub fn with_default(default: EntityConfig) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Register an entity-specific override.
    pub fn set_override(&mut self, entity: impl Into<String>, config: EntityConfigOverride) {
        self.overrides.insert(entity.into(), config);
    }

    /// The default config overlaid by the entity-specific override, with
    /// `name` forcibly set to the requested name. Never fails: an entity
    /// without an override gets the default config verbatim (plus name).
    /// Override lookup ignores the casing of the requested name.
    pub fn get_config(&self, entity: &str) -> EntityConfig {
        let mut config = self.default.clone();

        if let Some(entry) = self
            .overrides
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(entity))
        {
            entry.1.apply(&mut config);
        }

        config.name = entity.to_string();
        config
    }

    /// Merged config for every entity name with a registered override.
    pub fn get_all_configs(&self) -> BTreeMap<String, EntityConfig> {
        self.overrides
            .keys()
            .map(|entity| (entity.clone(), self.get_config(entity)))
            .collect()
    }
}
