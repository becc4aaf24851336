//! Descriptor assembly

use qspec_ast::QuerySpec;
use qspec_ir::{is_reserved_key, BaseDescriptor, QueryDescriptor, Slot};
use serde_json::{Map, Value};

use crate::context::QueryContext;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::expand::resolve_expands;
use crate::filter::compose_where;
use crate::order::resolve_order;
use crate::CompileError;

/// Assembles query descriptors against a shared context.
///
/// Every call builds a fresh descriptor; the `QuerySpec` is only read.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    context: &'a QueryContext,
}

impl<'a> Compiler<'a> {
    pub fn new(context: &'a QueryContext) -> Self {
        Self { context }
    }

    /// Merge `spec` onto `base`.
    ///
    /// With `single` set the descriptor is for a single-row fetch: `order`,
    /// `offset` and `limit` are cleared. When `spec` asks for all pages the
    /// pagination fields are left as `base` has them, whatever `single` says.
    pub fn assemble(
        &self,
        spec: &QuerySpec,
        base: Option<&BaseDescriptor>,
        single: bool,
    ) -> Result<QueryDescriptor, CompileError> {
        self.assemble_with_diagnostics(spec, base, single)
            .map(|(descriptor, _)| descriptor)
    }

    /// Same as [`Compiler::assemble`], also returning what input was dropped
    /// or degraded along the way.
    pub fn assemble_with_diagnostics(
        &self,
        spec: &QuerySpec,
        base: Option<&BaseDescriptor>,
        single: bool,
    ) -> Result<(QueryDescriptor, Diagnostics), CompileError> {
        let default_base = BaseDescriptor::default();
        let base = base.unwrap_or(&default_base);
        let registry = self.context.registry();
        let translator = self.context.translator();
        let mut diagnostics = Diagnostics::new();

        let (offset, limit) = if spec.all_page() {
            (Slot::from(base.offset), Slot::from(base.limit))
        } else if single {
            (Slot::Cleared, Slot::Cleared)
        } else {
            (
                Slot::Value(base.offset.unwrap_or_else(|| spec.offset())),
                Slot::Value(base.limit.unwrap_or_else(|| spec.per_page())),
            )
        };

        let order = if single {
            Slot::Cleared
        } else {
            match &base.order {
                Some(order) => Slot::Value(order.clone()),
                None => Slot::Value(resolve_order(spec.order_by(), registry, &mut diagnostics)?),
            }
        };

        let mut include = base.include.clone();
        include.extend(resolve_expands(
            spec.expands(),
            registry,
            translator,
            &mut diagnostics,
        )?);

        let attributes: Vec<String> = base
            .attributes
            .iter()
            .chain(spec.attributes())
            .cloned()
            .collect();

        let where_clause = compose_where(
            base.where_clause.as_ref(),
            spec.filter(),
            spec.additional_filter(),
            translator,
        )?;

        let mut options = Map::new();
        for (key, value) in &base.options {
            if is_reserved_key(key) {
                diagnostics.push(Diagnostic::ReservedOption { key: key.clone() });
            } else {
                options.insert(key.clone(), value.clone());
            }
        }

        let descriptor = QueryDescriptor {
            offset,
            limit,
            order,
            include,
            attributes: (!attributes.is_empty()).then_some(attributes),
            where_clause,
            options,
        };

        tracing::debug!(
            page = spec.page(),
            per_page = spec.per_page(),
            all_page = spec.all_page(),
            single,
            includes = descriptor.include.len(),
            degraded = diagnostics.len(),
            "Assembled query descriptor"
        );

        Ok((descriptor, diagnostics))
    }

    /// Default list-query view: no base descriptor, not a single-row fetch
    pub fn serialize(&self, spec: &QuerySpec) -> Result<QueryDescriptor, CompileError> {
        self.assemble(spec, None, false)
    }

    /// [`Compiler::serialize`] rendered as JSON
    pub fn serialize_json(&self, spec: &QuerySpec) -> Result<Value, CompileError> {
        Ok(serde_json::to_value(self.serialize(spec)?)?)
    }
}
