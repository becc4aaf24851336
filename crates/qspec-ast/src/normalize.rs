//! Convert raw request input to a normalized `QuerySpec`
//!
//! Every field is checked for shape independently. A field with the wrong
//! shape is replaced by its default and never raises an error.

use serde_json::Value;

use crate::spec::*;

impl QuerySpec {
    /// Build from a raw JSON value.
    ///
    /// Non-object input yields `QuerySpec::default()`.
    pub fn from_value(raw: &Value) -> Self {
        let Some(raw) = raw.as_object() else {
            tracing::debug!("Query input is not an object, using defaults");
            return Self::default();
        };

        Self {
            filter: filter_expr(raw.get("filter")),
            additional_filter: filter_expr(raw.get("additionalFilter")),
            attributes: string_list(raw.get("attributes"), "attributes"),
            page: positive_int(raw.get("page"), "page").unwrap_or(DEFAULT_PAGE),
            per_page: positive_int(raw.get("perPage"), "perPage").unwrap_or(DEFAULT_PER_PAGE),
            all_page: raw.get("allPage").and_then(Value::as_bool).unwrap_or(false),
            order_by: string_list(raw.get("orderBy"), "orderBy"),
            expands: expand_entries(raw.get("expands")),
        }
    }

    /// Parse JSON text then normalize. Only JSON syntax errors are reported.
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(source)?;
        Ok(Self::from_value(&raw))
    }
}

impl ExpandEntry {
    fn from_value(raw: &Value) -> Self {
        match raw {
            Value::String(name) if !name.is_empty() => ExpandEntry::Name(name.clone()),
            Value::Object(_) => ExpandEntry::Spec(ExpandSpec::from_value(raw)),
            other => ExpandEntry::Invalid(other.clone()),
        }
    }
}

impl ExpandSpec {
    fn from_value(raw: &Value) -> Self {
        Self {
            name: non_empty_str(raw.get("name")),
            model_name: non_empty_str(raw.get("modelName")),
            where_clause: raw.get("where").filter(|w| !w.is_null()).cloned(),
            required: raw.get("required").and_then(Value::as_bool),
            limit: raw.get("limit").and_then(whole_number),
            separate: raw.get("separate").and_then(Value::as_bool),
            order: string_list(raw.get("order"), "order"),
            attributes: raw.get("attributes").filter(|a| !a.is_null()).cloned(),
            expands: expand_entries(raw.get("expands")),
        }
    }
}

// Missing or null means "no restriction". Anything else is kept as given and
// left for the filter translator to accept or reject.
fn filter_expr(raw: Option<&Value>) -> Value {
    match raw {
        None | Some(Value::Null) => empty_filter(),
        Some(value) => value.clone(),
    }
}

fn positive_int(raw: Option<&Value>, field: &str) -> Option<u64> {
    let raw = raw?;
    match whole_number(raw).filter(|n| *n >= 1) {
        Some(n) => Some(n),
        None => {
            tracing::debug!(field, value = %raw, "Invalid pagination value, using default");
            None
        }
    }
}

// JSON has one number type, so `5.0` counts as an integer.
fn whole_number(raw: &Value) -> Option<u64> {
    if let Some(n) = raw.as_u64() {
        return Some(n);
    }
    raw.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
        .map(|f| f as u64)
}

fn string_list(raw: Option<&Value>, field: &str) -> Vec<String> {
    match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                other => {
                    tracing::trace!(field, value = %other, "Skipping non-string list entry");
                    None
                }
            })
            .collect(),
        Some(other) => {
            tracing::debug!(field, value = %other, "Expected a list, using default");
            Vec::new()
        }
    }
}

fn expand_entries(raw: Option<&Value>) -> Vec<ExpandEntry> {
    match raw {
        Some(Value::Array(items)) => items.iter().map(ExpandEntry::from_value).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            tracing::debug!(value = %other, "Expected expands to be a list, using default");
            Vec::new()
        }
    }
}

fn non_empty_str(raw: Option<&Value>) -> Option<String> {
    raw.and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
