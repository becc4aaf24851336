//! Reference filter translator for the operator-object dialect
//!
//! ```json
//! { "age": { "$gte": 18 }, "status": ["active", "pending"], "$or": [{ "owner": 1 }] }
//! ```
//!
//! Field keys map to comparisons, `$and` / `$or` / `$not` combine nested
//! expressions. Keys of the form `$relation.column$` are field references.

use qspec_ir::{CompareOp, Predicate};
use serde_json::{Map, Value};

use crate::filter::{FilterTranslator, TranslationError};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFilterTranslator;

impl FilterTranslator for JsonFilterTranslator {
    fn translate(&self, expr: &Value) -> Result<Predicate, TranslationError> {
        match expr {
            Value::Null => Ok(Predicate::True),
            Value::Object(map) => translate_object(map),
            other => Err(TranslationError::Malformed(format!(
                "expected an object, got {other}"
            ))),
        }
    }
}

fn translate_object(map: &Map<String, Value>) -> Result<Predicate, TranslationError> {
    let operands = map
        .iter()
        .map(|(key, value)| translate_entry(key, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(collapse(operands))
}

fn collapse(mut operands: Vec<Predicate>) -> Predicate {
    match operands.len() {
        0 => Predicate::True,
        1 => operands.remove(0),
        _ => Predicate::all(operands),
    }
}

fn translate_entry(key: &str, value: &Value) -> Result<Predicate, TranslationError> {
    match key {
        "$and" => Ok(Predicate::all(translate_list(key, value)?)),
        "$or" => Ok(Predicate::any(translate_list(key, value)?)),
        "$not" => Ok(Predicate::Not {
            operand: Box::new(translate_nested(key, value)?),
        }),
        op if op.starts_with('$') && !is_field_reference(op) => {
            Err(TranslationError::UnknownOperator(op.to_string()))
        }
        field => translate_field(field, value),
    }
}

fn is_field_reference(key: &str) -> bool {
    key.len() > 2 && key.starts_with('$') && key.ends_with('$')
}

fn translate_list(op: &str, value: &Value) -> Result<Vec<Predicate>, TranslationError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| translate_nested(op, item))
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| translate_entry(key, value))
            .collect(),
        other => Err(invalid(op, format!("expected a list, got {other}"))),
    }
}

fn translate_nested(op: &str, value: &Value) -> Result<Predicate, TranslationError> {
    match value {
        Value::Object(map) => translate_object(map),
        other => Err(invalid(op, format!("expected an object, got {other}"))),
    }
}

fn translate_field(field: &str, value: &Value) -> Result<Predicate, TranslationError> {
    match value {
        Value::Null => Ok(Predicate::compare(field, CompareOp::Is, Value::Null)),
        Value::Array(_) => Ok(Predicate::compare(field, CompareOp::In, value.clone())),
        Value::Object(ops) => {
            let operands = ops
                .iter()
                .map(|(op, operand)| translate_operator(field, op, operand))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(collapse(operands))
        }
        scalar => Ok(Predicate::compare(field, CompareOp::Eq, scalar.clone())),
    }
}

fn translate_operator(field: &str, op: &str, operand: &Value) -> Result<Predicate, TranslationError> {
    let compare = match op {
        "$eq" if operand.is_null() => CompareOp::Is,
        "$ne" if operand.is_null() => CompareOp::IsNot,
        "$eq" => CompareOp::Eq,
        "$ne" => CompareOp::Ne,
        "$gt" => CompareOp::Gt,
        "$gte" => CompareOp::Gte,
        "$lt" => CompareOp::Lt,
        "$lte" => CompareOp::Lte,
        "$in" => CompareOp::In,
        "$notIn" => CompareOp::NotIn,
        "$like" => CompareOp::Like,
        "$notLike" => CompareOp::NotLike,
        "$iLike" => CompareOp::ILike,
        "$is" => CompareOp::Is,
        "$not" => CompareOp::IsNot,
        "$between" => CompareOp::Between,
        "$notBetween" => CompareOp::NotBetween,
        other => return Err(TranslationError::UnknownOperator(other.to_string())),
    };

    check_operand(op, compare, operand)?;
    Ok(Predicate::compare(field, compare, operand.clone()))
}

fn check_operand(op: &str, compare: CompareOp, operand: &Value) -> Result<(), TranslationError> {
    let ok = match compare {
        CompareOp::In | CompareOp::NotIn => operand.is_array(),
        CompareOp::Between | CompareOp::NotBetween => {
            operand.as_array().is_some_and(|bounds| bounds.len() == 2)
        }
        CompareOp::Like | CompareOp::NotLike | CompareOp::ILike => operand.is_string(),
        CompareOp::Is | CompareOp::IsNot => operand.is_null() || operand.is_boolean(),
        CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
            operand.is_number() || operand.is_string() || operand.is_boolean()
        }
        CompareOp::Eq | CompareOp::Ne => !operand.is_array() && !operand.is_object(),
    };

    if ok {
        Ok(())
    } else {
        Err(invalid(op, format!("unexpected operand {operand}")))
    }
}

fn invalid(op: &str, reason: String) -> TranslationError {
    TranslationError::InvalidOperand {
        op: op.to_string(),
        reason,
    }
}
