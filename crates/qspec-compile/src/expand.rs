//! Eager-load resolution

use qspec_ast::{ExpandEntry, ExpandSpec};
use qspec_ir::{ExpandDescriptor, Include, RelationHandle};
use qspec_registry::{ModelRegistry, RegistryError};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::filter::FilterTranslator;
use crate::order::resolve_order;
use crate::CompileError;

/// Resolve expand entries into `include` entries, preserving order.
///
/// Plain names pass through untouched. Structured entries are resolved by
/// `modelName`, then `name`; entries that resolve under neither are dropped,
/// as are entries of any other shape.
pub fn resolve_expands(
    entries: &[ExpandEntry],
    registry: &dyn ModelRegistry,
    translator: &dyn FilterTranslator,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Include>, CompileError> {
    let mut includes = Vec::with_capacity(entries.len());

    for entry in entries {
        match entry {
            ExpandEntry::Name(name) => includes.push(Include::Name(name.clone())),
            ExpandEntry::Spec(spec) => {
                if let Some(expand) = resolve_spec(spec, registry, translator, diagnostics)? {
                    includes.push(Include::Expand(Box::new(expand)));
                }
            }
            ExpandEntry::Invalid(raw) => diagnostics.push(Diagnostic::InvalidExpandShape {
                entry: raw.to_string(),
            }),
        }
    }

    Ok(includes)
}

fn resolve_spec(
    spec: &ExpandSpec,
    registry: &dyn ModelRegistry,
    translator: &dyn FilterTranslator,
    diagnostics: &mut Diagnostics,
) -> Result<Option<ExpandDescriptor>, CompileError> {
    let Some(name) = spec.name.as_deref() else {
        diagnostics.push(Diagnostic::MissingExpandName {
            entry: serde_json::to_string(spec)?,
        });
        return Ok(None);
    };

    let Some((target_key, target)) = resolve_target(registry, spec.model_name.as_deref(), name)?
    else {
        diagnostics.push(Diagnostic::UnresolvedExpand {
            name: name.to_string(),
            model_name: spec.model_name.clone(),
        });
        return Ok(None);
    };

    let where_clause = spec
        .where_clause
        .as_ref()
        .map(|expr| translator.translate(expr))
        .transpose()?;

    Ok(Some(ExpandDescriptor {
        target_key,
        target,
        alias: name.to_string(),
        where_clause,
        required: spec.required,
        limit: spec.limit,
        separate: spec.separate,
        order: resolve_order(&spec.order, registry, diagnostics)?,
        attributes: spec.attributes.clone(),
        include: resolve_expands(&spec.expands, registry, translator, diagnostics)?,
    }))
}

fn resolve_target(
    registry: &dyn ModelRegistry,
    model_name: Option<&str>,
    name: &str,
) -> Result<Option<(String, RelationHandle)>, RegistryError> {
    for key in model_name.into_iter().chain(std::iter::once(name)) {
        if let Some(handle) = registry.lookup(key)? {
            return Ok(Some((key.to_string(), handle)));
        }
    }
    Ok(None)
}
