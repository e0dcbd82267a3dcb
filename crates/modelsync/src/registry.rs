//! Entity discovery, canonical naming, and the load cache.
//!
//! The registry exclusively owns the process-local cache of loaded handles;
//! the orchestrator clears it at the start of every bootstrap. Descriptors
//! are built fresh per discovery pass and never mutated afterwards.

use crate::{
    catalog::{EntityDefinition, SchemaCatalog},
    config::{ConfigStore, EntityConfig},
    engine::{EngineError, EntityHandle, StorageEngine},
};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error as ThisError;
use tracing::error;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum RegistryError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("entity type '{0}' is registered in the engine but has no handle")]
    MissingRegistration(String),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),
}

///
/// EntityDescriptor
///
/// The discovered, config-resolved representation of one entity. `name` is
/// the PascalCase canonical name and is unique across a discovery pass.
///

#[derive(Clone, Debug)]
pub struct EntityDescriptor {
    pub name: String,
    pub collection: String,
    pub config: EntityConfig,
    pub definition: EntityDefinition,
}

///
/// LoadOutcome
///
/// Tagged result of resolving an entity handle. Duplicate registration in
/// the engine is a recoverable condition, not an error.
///

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(EntityHandle),
    AlreadyRegistered(EntityHandle),
    Failed(RegistryError),
}

impl LoadOutcome {
    /// The resolved handle, if the load did not fail.
    #[must_use]
    pub fn handle(self) -> Option<EntityHandle> {
        match self {
            Self::Loaded(handle) | Self::AlreadyRegistered(handle) => Some(handle),
            Self::Failed(_) => None,
        }
    }
}

///
/// EntityRegistry
///

pub struct EntityRegistry {
    catalog: Arc<dyn SchemaCatalog>,
    configs: ConfigStore,
    engine: Arc<dyn StorageEngine>,
    cache: HashMap<String, EntityHandle>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn SchemaCatalog>,
        configs: ConfigStore,
        engine: Arc<dyn StorageEngine>,
    ) -> Self {
        Self {
            catalog,
            configs,
            engine,
            cache: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn configs(&self) -> &ConfigStore {
        &self.configs
    }

    /// Build a descriptor for every catalog entry: canonical name, merged
    /// config, and the backing collection (config override or
    /// `lowercase(name) + "s"`).
    pub fn discover(&self) -> Vec<EntityDescriptor> {
        self.catalog
            .idents()
            .iter()
            .filter_map(|ident| {
                let definition = self.catalog.definition(ident)?;
                let name = canonical_ident(ident);
                let config = self.configs.get_config(&name);
                let collection = config
                    .collection_name
                    .clone()
                    .unwrap_or_else(|| name.to_lowercase() + "s");

                Some(EntityDescriptor {
                    name,
                    collection,
                    config,
                    definition: definition.clone(),
                })
            })
            .collect()
    }

    /// Case-insensitive descriptor lookup; the input is canonicalized the
    /// same way discovery canonicalizes identifiers before matching.
    pub fn get_by_name(&self, name: &str) -> Option<EntityDescriptor> {
        let wanted = canonical_lookup(name);

        self.discover()
            .into_iter()
            .find(|descriptor| descriptor.name.eq_ignore_ascii_case(&wanted))
    }

    /// Resolve a live handle, in order: engine-side existing registration,
    /// process-local cache, fresh registration (which populates the cache).
    pub fn try_load(&mut self, name: &str) -> LoadOutcome {
        let Some(descriptor) = self.get_by_name(name) else {
            return LoadOutcome::Failed(RegistryError::UnknownEntity(name.to_string()));
        };

        if self.engine.is_registered(&descriptor.name) {
            return match self.engine.existing(&descriptor.name) {
                Some(handle) => {
                    self.cache.insert(descriptor.name, handle.clone());
                    LoadOutcome::AlreadyRegistered(handle)
                }
                None => LoadOutcome::Failed(RegistryError::MissingRegistration(descriptor.name)),
            };
        }

        if let Some(handle) = self.cache.get(&descriptor.name) {
            return LoadOutcome::Loaded(handle.clone());
        }

        match self
            .engine
            .register(&descriptor.name, &descriptor.collection, &descriptor.definition)
        {
            Ok(handle) => {
                self.cache.insert(descriptor.name, handle.clone());
                LoadOutcome::Loaded(handle)
            }
            Err(EngineError::AlreadyRegistered(_)) => match self.engine.existing(&descriptor.name)
            {
                Some(handle) => {
                    self.cache.insert(descriptor.name, handle.clone());
                    LoadOutcome::AlreadyRegistered(handle)
                }
                None => LoadOutcome::Failed(RegistryError::MissingRegistration(descriptor.name)),
            },
            Err(err) => LoadOutcome::Failed(err.into()),
        }
    }

    /// [`Self::try_load`] with failures logged and collapsed to `None`;
    /// callers treat `None` as "skip this entity".
    pub fn load(&mut self, name: &str) -> Option<EntityHandle> {
        match self.try_load(name) {
            LoadOutcome::Loaded(handle) | LoadOutcome::AlreadyRegistered(handle) => Some(handle),
            LoadOutcome::Failed(err) => {
                error!(entity = name, error = %err, "entity handle load failed");
                None
            }
        }
    }

    /// Empty the process-local cache. Engine-side registrations are not
    /// affected.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Entity names the given entity declares dependencies on.
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        self.get_by_name(name)
            .map(|descriptor| {
                descriptor
                    .config
                    .dependencies
                    .iter()
                    .map(|dependency| dependency.entity_name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Canonical entity name: first letter upper-cased, remainder as given.
fn canonical_ident(ident: &str) -> String {
    let mut chars = ident.chars();

    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

/// Lookup canonicalization: first character capitalized, remainder
/// lower-cased.
fn canonical_lookup(name: &str) -> String {
    let mut chars = name.chars();

    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
    })
}
