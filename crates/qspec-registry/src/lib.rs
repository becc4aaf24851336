//! Model registry: relation key to relation handle lookups
//!
//! The compiler only ever reads from a registry. Implementations must be
//! safe to share across threads without synchronization on the read path.

use qspec_ir::RelationHandle;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry lookup failed for {key}: {reason}")]
    Lookup { key: String, reason: String },

    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse registry YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse registry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only relation lookup.
///
/// Unknown keys return `Ok(None)`. `Err` is reserved for a registry that
/// cannot answer at all and is surfaced to callers as a configuration failure.
pub trait ModelRegistry: Send + Sync {
    fn lookup(&self, key: &str) -> Result<Option<RelationHandle>, RegistryError>;
}

impl<R: ModelRegistry + ?Sized> ModelRegistry for Arc<R> {
    fn lookup(&self, key: &str) -> Result<Option<RelationHandle>, RegistryError> {
        (**self).lookup(key)
    }
}

impl<R: ModelRegistry + ?Sized> ModelRegistry for &R {
    fn lookup(&self, key: &str) -> Result<Option<RelationHandle>, RegistryError> {
        (**self).lookup(key)
    }
}

/// Relation definition as written in a registry file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Extra keys that resolve to the same relation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl RelationDef {
    fn handle(&self) -> RelationHandle {
        RelationHandle {
            model: self.model.clone(),
            table: self.table.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    relations: BTreeMap<String, RelationDef>,
}

/// Registry backed by an in-memory map, populated once at startup
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    relations: HashMap<String, RelationHandle>,
    version: String, // Reported in logs so descriptors can be traced to a model set
}

impl StaticRegistry {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            relations: HashMap::new(),
            version: version.into(),
        }
    }

    pub fn register(&mut self, key: impl Into<String>, def: RelationDef) {
        let handle = def.handle();
        for alias in &def.aliases {
            self.relations.insert(alias.clone(), handle.clone());
        }
        self.relations.insert(key.into(), handle);
    }

    pub fn with_relation(mut self, key: impl Into<String>, def: RelationDef) -> Self {
        self.register(key, def);
        self
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_yaml::from_str(source)?;
        Ok(Self::from_file(file))
    }

    pub fn from_json_str(source: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(source)?;
        Ok(Self::from_file(file))
    }

    /// Load from a `.json` file, or YAML for any other extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let registry = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents)?,
            _ => Self::from_yaml_str(&contents)?,
        };

        tracing::debug!(
            path = %path.display(),
            relations = registry.len(),
            version = %registry.version,
            "Loaded model registry"
        );
        Ok(registry)
    }

    fn from_file(file: RegistryFile) -> Self {
        let mut registry = Self::new(file.version.unwrap_or_else(|| "0.1.0".to_string()));
        for (key, def) in file.relations {
            registry.register(key, def);
        }
        registry
    }

    pub fn contains(&self, key: &str) -> bool {
        self.relations.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::new("0.1.0")
    }
}

impl ModelRegistry for StaticRegistry {
    fn lookup(&self, key: &str) -> Result<Option<RelationHandle>, RegistryError> {
        Ok(self.relations.get(key).cloned())
    }
}
