/*!
 * Registry mapping logical entity names to model classes.
 *
 * Built and validated once from configuration, so lookups at call time can
 * only fail for names that were never registered.
 */

use std::collections::BTreeMap;

use crate::database::EntityKind;
use crate::errors::{StorageError, StorageResult};

/// A registered model class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelClass {
    /// Entity kind the class stores
    pub kind: EntityKind,
    /// Concrete type name the logical name resolves to
    pub type_name: String,
}

/// Closed mapping from logical names (`trans_unit`, `translation`, `file`)
/// to model classes
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    classes: BTreeMap<String, ModelClass>,
}

impl ModelRegistry {
    /// Names that must always be registered
    pub const REQUIRED: [EntityKind; 2] = [EntityKind::TransUnit, EntityKind::File];

    /// Build a registry from a `logical name -> type name` map
    pub fn from_classes(classes: &BTreeMap<String, String>) -> StorageResult<Self> {
        let mut registry = BTreeMap::new();

        for (name, type_name) in classes {
            let kind: EntityKind = name.parse().map_err(|_| {
                StorageError::Configuration(format!("Unknown model name \"{}\"", name))
            })?;

            if type_name.trim().is_empty() {
                return Err(StorageError::Configuration(format!(
                    "Empty class for model name \"{}\"",
                    name
                )));
            }

            registry.insert(
                kind.as_str().to_string(),
                ModelClass {
                    kind,
                    type_name: type_name.trim().to_string(),
                },
            );
        }

        for required in Self::REQUIRED {
            if !registry.contains_key(required.as_str()) {
                return Err(StorageError::unknown_model(required.as_str()));
            }
        }

        Ok(Self { classes: registry })
    }

    /// Resolve a logical name
    pub fn model_class(&self, name: &str) -> StorageResult<&ModelClass> {
        self.classes
            .get(name)
            .ok_or_else(|| StorageError::unknown_model(name))
    }

    /// Resolve a logical name to its entity kind
    pub fn kind(&self, name: &str) -> StorageResult<EntityKind> {
        self.model_class(name).map(|class| class.kind)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

/// Default `logical name -> type name` map
pub fn default_classes() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("trans_unit".to_string(), "TransUnit".to_string()),
        ("translation".to_string(), "Translation".to_string()),
        ("file".to_string(), "File".to_string()),
    ])
}
