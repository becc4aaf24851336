//! qspec Intermediate Representation (IR)
//!
//! Execution-ready query descriptors produced by the compiler and consumed by
//! a relational data-access layer. All types are deterministically
//! serializable for caching and log correlation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

mod predicate;
mod slot;

pub use predicate::*;
pub use slot::Slot;

/// Descriptor keys that only the compiler writes. Passthrough options must
/// never carry them, or they would shadow the compiled fields on the wire.
pub const RESERVED_KEYS: [&str; 6] = ["offset", "limit", "order", "include", "attributes", "where"];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Fully resolved query descriptor handed to the execution engine.
///
/// Rebuilt on every compile call; never cached or mutated in place by the
/// compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub offset: Slot<u64>,

    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub limit: Slot<u64>,

    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub order: Slot<Vec<OrderTerm>>,

    #[serde(default)]
    pub include: Vec<Include>,

    /// `None` selects every column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,

    #[serde(rename = "where")]
    pub where_clause: Predicate,

    /// Options carried over from the base descriptor, minus [`RESERVED_KEYS`].
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl QueryDescriptor {
    /// Calculate fingerprint (SHA-256) of the canonical JSON form
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("descriptor should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// True when pagination fields are set to concrete values
    pub fn is_paginated(&self) -> bool {
        self.offset.value().is_some() || self.limit.value().is_some()
    }
}

/// Caller-supplied descriptor that compiled output is merged onto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<OrderTerm>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<Include>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,

    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Predicate>,

    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

/// Single ordering term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub column: String,
    pub direction: Direction,
    /// Set when the column belongs to a joined relation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationQualifier>,
}

impl OrderTerm {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
            relation: None,
        }
    }

    pub fn qualified(
        column: impl Into<String>,
        direction: Direction,
        handle: RelationHandle,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            direction,
            relation: Some(RelationQualifier {
                handle,
                alias: alias.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationQualifier {
    pub handle: RelationHandle,
    pub alias: String,
}

/// Opaque reference to a registered model, handed back by the model registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationHandle {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl RelationHandle {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            table: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// Eager-load entry in `include`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Include {
    /// Bare association name, resolved by the executor
    Name(String),
    Expand(Box<ExpandDescriptor>),
}

/// Resolved eager-load of a registered relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandDescriptor {
    /// Registry key the relation resolved under
    pub target_key: String,
    pub target: RelationHandle,
    pub alias: String,

    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Predicate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separate: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderTerm>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<Include>,
}
