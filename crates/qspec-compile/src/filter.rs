//! Filter composition
//!
//! The caller filter and the access-control filter are translated
//! independently and placed side by side in one `And` node. Neither operand
//! can replace the other.

use qspec_ir::Predicate;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Malformed filter expression: {0}")]
    Malformed(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid operand for {op}: {reason}")]
    InvalidOperand { op: String, reason: String },
}

/// Converts a filter expression into a predicate tree.
///
/// An empty object must translate to `Predicate::True`.
pub trait FilterTranslator: Send + Sync {
    fn translate(&self, expr: &Value) -> Result<Predicate, TranslationError>;
}

impl<F> FilterTranslator for F
where
    F: Fn(&Value) -> Result<Predicate, TranslationError> + Send + Sync,
{
    fn translate(&self, expr: &Value) -> Result<Predicate, TranslationError> {
        self(expr)
    }
}

/// Conjoin `base`, `filter` and `additional` in that order.
///
/// `filter` and `additional` are always present as operands, even when they
/// translate to `Predicate::True`.
pub fn compose_where(
    base: Option<&Predicate>,
    filter: &Value,
    additional: &Value,
    translator: &dyn FilterTranslator,
) -> Result<Predicate, TranslationError> {
    let mut operands = Vec::with_capacity(3);
    if let Some(base) = base {
        operands.push(base.clone());
    }
    operands.push(translator.translate(filter)?);
    operands.push(translator.translate(additional)?);

    Ok(Predicate::all(operands))
}
