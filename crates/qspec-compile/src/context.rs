//! Shared compile context
//!
//! Holds the model registry and filter translator. Built once at startup and
//! handed to every compiler; nothing in it is mutated afterwards.

use qspec_registry::ModelRegistry;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::compiler::Compiler;
use crate::filter::FilterTranslator;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Query context already initialized")]
    AlreadyInitialized,

    #[error("Query context not initialized")]
    NotInitialized,
}

#[derive(Clone)]
pub struct QueryContext {
    registry: Arc<dyn ModelRegistry>,
    translator: Arc<dyn FilterTranslator>,
}

impl QueryContext {
    pub fn new<R, T>(registry: R, translator: T) -> Self
    where
        R: ModelRegistry + 'static,
        T: FilterTranslator + 'static,
    {
        Self {
            registry: Arc::new(registry),
            translator: Arc::new(translator),
        }
    }

    pub fn from_shared(
        registry: Arc<dyn ModelRegistry>,
        translator: Arc<dyn FilterTranslator>,
    ) -> Self {
        Self {
            registry,
            translator,
        }
    }

    pub fn registry(&self) -> &dyn ModelRegistry {
        self.registry.as_ref()
    }

    pub fn translator(&self) -> &dyn FilterTranslator {
        self.translator.as_ref()
    }

    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(self)
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext").finish_non_exhaustive()
    }
}

/// Process-wide slot for a `QueryContext`.
///
/// ```ignore
/// static CONTEXT: ContextCell = ContextCell::new();
/// CONTEXT.init(QueryContext::new(registry, JsonFilterTranslator))?;
/// ```
#[derive(Debug, Default)]
pub struct ContextCell {
    inner: OnceLock<QueryContext>,
}

impl ContextCell {
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Store `context`. A second call fails with `AlreadyInitialized` and
    /// leaves the first context in place.
    pub fn init(&self, context: QueryContext) -> Result<&QueryContext, ContextError> {
        self.inner
            .set(context)
            .map_err(|_| ContextError::AlreadyInitialized)?;
        tracing::debug!("Query context initialized");
        self.get()
    }

    pub fn get(&self) -> Result<&QueryContext, ContextError> {
        self.inner.get().ok_or(ContextError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }
}
