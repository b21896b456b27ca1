//! Entity registry: entity name to ordered field descriptors.
//!
//! A registry is built once at startup, either in code or from a TOML file, and is
//! read-only afterwards. Field kinds are validated while loading, so every
//! [`EntitySchema`] held by a [`Registry`] only carries kinds from the closed set.
//!
//! ```toml
//! [[entities]]
//! name = "foo"
//! deny_unknown_keys = false
//!
//! [[entities.fields]]
//! name = "date1"
//! display = "date"
//! kind = "date"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::FieldKind;
use crate::errors::QueryError;

/// Display label and kind of one entity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// UI hint only; never validated.
    pub display: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(display: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            display: display.into(),
            kind,
        }
    }
}

/// Ordered field descriptors of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
    deny_unknown_keys: bool,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            deny_unknown_keys: false,
        }
    }

    /// Append a field. Field names must be unique within the entity.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        display: impl Into<String>,
        kind: FieldKind,
    ) -> Result<Self, QueryError> {
        let name = name.into();
        if self.field(&name).is_some() {
            return Err(QueryError::DuplicateField {
                entity: self.name,
                field: name,
            });
        }
        self.fields.push((name, FieldDescriptor::new(display, kind)));
        Ok(self)
    }

    /// Append a field whose kind is given by name, rejecting kinds outside the closed set.
    pub fn try_with_field(
        self,
        name: impl Into<String>,
        display: impl Into<String>,
        kind: &str,
    ) -> Result<Self, QueryError> {
        let name = name.into();
        let parsed = kind.parse::<FieldKind>().map_err(|_| QueryError::InvalidFieldKind {
            entity: self.name.clone(),
            field: name.clone(),
            kind: kind.to_string(),
        })?;
        self.with_field(name, display, parsed)
    }

    /// Reject query keys that are not part of the derived schema.
    #[inline]
    pub fn deny_unknown_keys(mut self, deny: bool) -> Self {
        self.deny_unknown_keys = deny;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn denies_unknown_keys(&self) -> bool {
        self.deny_unknown_keys
    }

    /// Fields in registration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(name, descriptor)| (name.as_str(), descriptor))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Immutable mapping from entity name to [`EntitySchema`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: BTreeMap<String, EntitySchema>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity while the registry is being assembled.
    pub fn with_entity(mut self, entity: EntitySchema) -> Result<Self, QueryError> {
        if self.entities.contains_key(entity.name()) {
            return Err(QueryError::DuplicateEntity {
                name: entity.name().to_string(),
            });
        }
        self.entities.insert(entity.name().to_string(), entity);
        Ok(self)
    }

    /// Look up an entity by name.
    pub fn lookup(&self, name: &str) -> Result<&EntitySchema, QueryError> {
        self.entities.get(name).ok_or_else(|| QueryError::UnknownEntity {
            name: name.to_string(),
        })
    }

    /// Entity names in ascending order.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The `foo` and `bar` sample entities.
    pub fn builtin() -> Self {
        let foo = [
            ("date1", "date", FieldKind::Date),
            ("text1", "text", FieldKind::Text),
            ("number1", "number", FieldKind::Number),
            ("number11", "number", FieldKind::Number),
        ];
        let bar = [
            ("date2", "date", FieldKind::Date),
            ("text2", "text", FieldKind::Text),
            ("number2", "number", FieldKind::Number),
        ];

        let mut entities = BTreeMap::new();
        for (name, fields) in [("foo", &foo[..]), ("bar", &bar[..])] {
            let entity = EntitySchema {
                name: name.to_string(),
                fields: fields
                    .iter()
                    .map(|(field, display, kind)| (field.to_string(), FieldDescriptor::new(*display, *kind)))
                    .collect(),
                deny_unknown_keys: false,
            };
            entities.insert(name.to_string(), entity);
        }
        Self { entities }
    }

    /// Parse a registry from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, QueryError> {
        let config: RegistryConfig = toml::from_str(raw).map_err(|err| QueryError::Config {
            message: err.to_string(),
        })?;

        let mut registry = Registry::new();
        for entity_config in config.entities {
            let mut entity =
                EntitySchema::new(entity_config.name).deny_unknown_keys(entity_config.deny_unknown_keys);
            for field in entity_config.fields {
                let display = field.display.unwrap_or_else(|| field.name.clone());
                entity = entity.try_with_field(field.name, display, &field.kind)?;
            }
            registry = registry.with_entity(entity)?;
        }

        debug!("loaded registry with {} entities", registry.len());
        Ok(registry)
    }

    /// Read and parse a registry file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let path = path.as_ref();
        debug!("reading registry from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

/// On-disk registry layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryConfig {
    #[serde(default)]
    entities: Vec<EntityConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityConfig {
    name: String,
    #[serde(default)]
    deny_unknown_keys: bool,
    #[serde(default)]
    fields: Vec<FieldConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldConfig {
    name: String,
    #[serde(default)]
    display: Option<String>,
    kind: String,
}
