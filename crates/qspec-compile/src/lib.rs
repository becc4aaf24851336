//! qspec compiler - turns a normalized `QuerySpec` into a `QueryDescriptor`
//!
//! Pipeline:
//! 1. Resolve sort tokens against the model registry
//! 2. Resolve eager-load entries (dropping unresolvable ones)
//! 3. Translate and conjoin the caller filter with the access-control filter
//! 4. Merge everything onto an optional base descriptor

use qspec_registry::RegistryError;
use thiserror::Error;

mod compiler;
mod context;
mod diagnostics;
mod expand;
mod filter;
mod order;
mod translate;

pub use compiler::Compiler;
pub use context::{ContextCell, ContextError, QueryContext};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use expand::resolve_expands;
pub use filter::{compose_where, FilterTranslator, TranslationError};
pub use order::resolve_order;
pub use translate::JsonFilterTranslator;

#[derive(Debug, Error)]
pub enum CompileError {
    /// Malformed filter expression
    #[error("Translation failure: {0}")]
    Translation(#[from] TranslationError),

    /// The model registry could not answer a lookup
    #[error("Configuration failure: {0}")]
    Configuration(#[from] RegistryError),

    #[error("Failed to serialize descriptor: {0}")]
    Serialize(#[from] serde_json::Error),
}
