//! Predicate trees for `where` clauses

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Backend-neutral predicate tree.
///
/// Conjunctions hold an ordered operand list, so composing two predicates
/// never overwrites either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    True,
    And { operands: Vec<Predicate> },
    Or { operands: Vec<Predicate> },
    Not { operand: Box<Predicate> },
    Compare { field: String, op: CompareOp, value: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    NotLike,
    ILike,
    Is,
    IsNot,
    Between,
    NotBetween,
}

impl Predicate {
    /// Conjunction of `operands` in order
    pub fn all(operands: Vec<Predicate>) -> Self {
        Predicate::And { operands }
    }

    pub fn any(operands: Vec<Predicate>) -> Self {
        Predicate::Or { operands }
    }

    pub fn compare(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Evaluate against an in-memory record.
    ///
    /// Used for diagnostics and tests; the execution engine evaluates the
    /// real predicate. Field paths may be written `$relation.column$`, in which
    /// case the record is walked through nested objects. Missing fields read
    /// as `null`.
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        match self {
            Predicate::True => true,
            Predicate::And { operands } => operands.iter().all(|p| p.matches(record)),
            Predicate::Or { operands } => operands.iter().any(|p| p.matches(record)),
            Predicate::Not { operand } => !operand.matches(record),
            Predicate::Compare { field, op, value } => {
                let actual = lookup(record, field).unwrap_or(&Value::Null);
                op.apply(actual, value)
            }
        }
    }
}

impl CompareOp {
    fn apply(self, actual: &Value, expected: &Value) -> bool {
        match self {
            CompareOp::Eq => loose_eq(actual, expected),
            CompareOp::Ne => !actual.is_null() && !loose_eq(actual, expected),
            CompareOp::Gt => order(actual, expected) == Some(Ordering::Greater),
            CompareOp::Gte => matches!(
                order(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            CompareOp::Lt => order(actual, expected) == Some(Ordering::Less),
            CompareOp::Lte => matches!(
                order(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::In => member_of(actual, expected),
            CompareOp::NotIn => !actual.is_null() && !member_of(actual, expected),
            CompareOp::Like => like_value(actual, expected, false),
            CompareOp::NotLike => actual.is_string() && !like_value(actual, expected, false),
            CompareOp::ILike => like_value(actual, expected, true),
            CompareOp::Is => actual == expected,
            CompareOp::IsNot => actual != expected,
            CompareOp::Between => between(actual, expected),
            CompareOp::NotBetween => !actual.is_null() && !between(actual, expected),
        }
    }
}

fn lookup<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    let path = field.trim_matches('$');
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// SQL semantics: comparing with NULL is never true
fn loose_eq(left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    order(left, right) == Some(Ordering::Equal) || left == right
}

fn member_of(actual: &Value, set: &Value) -> bool {
    set.as_array()
        .is_some_and(|items| items.iter().any(|item| loose_eq(actual, item)))
}

fn between(actual: &Value, bounds: &Value) -> bool {
    match bounds.as_array().map(Vec::as_slice) {
        Some([low, high]) => {
            matches!(order(actual, low), Some(Ordering::Greater | Ordering::Equal))
                && matches!(order(actual, high), Some(Ordering::Less | Ordering::Equal))
        }
        _ => false,
    }
}

fn like_value(actual: &Value, pattern: &Value, case_insensitive: bool) -> bool {
    match (actual.as_str(), pattern.as_str()) {
        (Some(text), Some(pattern)) if case_insensitive => {
            like(&text.to_lowercase(), &pattern.to_lowercase())
        }
        (Some(text), Some(pattern)) => like(text, pattern),
        _ => false,
    }
}

/// SQL `LIKE` with `%` and `_` wildcards
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_at(&text, &pattern)
}

fn like_at(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|i| like_at(&text[i..], rest)),
        Some(('_', rest)) => !text.is_empty() && like_at(&text[1..], rest),
        Some((c, rest)) => text.first() == Some(c) && like_at(&text[1..], rest),
    }
}
