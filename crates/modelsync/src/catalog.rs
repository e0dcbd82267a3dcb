//! Schema catalog: the collaborator that enumerates entity definitions.
//!
//! Discovery is an explicit registration list rather than any kind of
//! filesystem scanning; a hosting process builds a [`StaticCatalog`] (or its
//! own [`SchemaCatalog`] implementation) and hands it to the registry.

use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Display};
use std::ops::Not;

///
/// SchemaFieldSpec
///
/// One declared field path and, when the schema declares one, its default
/// value. A literal `null` default is `Some(Value::Null)` and is distinct
/// from "no default".
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaFieldSpec {
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl SchemaFieldSpec {
    /// A field with no declared default.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default: None,
        }
    }

    /// A field with a declared default value.
    pub fn with_default(path: impl Into<String>, default: Value) -> Self {
        Self {
            path: path.into(),
            default: Some(default),
        }
    }

    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

///
/// IndexSpec
///

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub fields: Vec<String>,

    #[serde(skip_serializing_if = "Not::not")]
    pub unique: bool,
}

impl IndexSpec {
    /// A non-unique index over the given field paths.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// A unique index over the given field paths.
    pub fn unique<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            ..Self::new(fields)
        }
    }
}

impl Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.join(", ");

        if self.unique {
            write!(f, "UNIQUE ({fields})")
        } else {
            write!(f, "({fields})")
        }
    }
}

///
/// EntityDefinition
///
/// The schema source for one entity, as registered in the catalog. `ident`
/// carries whatever casing the defining convention uses; the registry derives
/// the canonical entity name from it.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityDefinition {
    pub ident: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaFieldSpec>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSpec>,
}

impl EntityDefinition {
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: SchemaFieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Field specs that declare a default value.
    pub fn defaulted_fields(&self) -> impl Iterator<Item = &SchemaFieldSpec> {
        self.fields.iter().filter(|field| field.has_default())
    }
}

///
/// SchemaCatalog
///

pub trait SchemaCatalog {
    /// Entity identifiers in registration order.
    fn idents(&self) -> Vec<String>;

    /// Look up one definition by its registered identifier.
    fn definition(&self, ident: &str) -> Option<&EntityDefinition>;
}

///
/// StaticCatalog
///
/// Registration-list catalog. Re-registering an identifier replaces the
/// previous definition in place, keeping discovery order stable across
/// schema updates between bootstraps.
///

#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    definitions: Vec<EntityDefinition>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: EntityDefinition) {
        match self
            .definitions
            .iter_mut()
            .find(|existing| existing.ident == definition.ident)
        {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }
}

impl SchemaCatalog for StaticCatalog {
    fn idents(&self) -> Vec<String> {
        self.definitions
            .iter()
            .map(|definition| definition.ident.clone())
            .collect()
    }

    fn definition(&self, ident: &str) -> Option<&EntityDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.ident == ident)
    }
}
