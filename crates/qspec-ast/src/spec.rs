//! Normalized query specification types
//!
//! A `QuerySpec` is built once from raw request input and is read-only
//! afterwards. Construction never fails on shape problems; see
//! [`QuerySpec::from_value`].

use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 20;

/// Normalized, immutable declarative query configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub(crate) filter: Value,
    pub(crate) additional_filter: Value,
    pub(crate) attributes: Vec<String>,
    pub(crate) page: u64,
    pub(crate) per_page: u64,
    pub(crate) all_page: bool,
    pub(crate) order_by: Vec<String>,
    pub(crate) expands: Vec<ExpandEntry>,
}

impl QuerySpec {
    pub fn builder() -> QuerySpecBuilder {
        QuerySpecBuilder::default()
    }

    /// Caller filter expression; `{}` when none was given
    pub fn filter(&self) -> &Value {
        &self.filter
    }

    /// Access-control filter expression; `{}` when none was given
    pub fn additional_filter(&self) -> &Value {
        &self.additional_filter
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn all_page(&self) -> bool {
        self.all_page
    }

    pub fn order_by(&self) -> &[String] {
        &self.order_by
    }

    pub fn expands(&self) -> &[ExpandEntry] {
        &self.expands
    }

    /// `(page - 1) * perPage`, saturating on overflow
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filter: empty_filter(),
            additional_filter: empty_filter(),
            attributes: Vec::new(),
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            all_page: false,
            order_by: Vec::new(),
            expands: Vec::new(),
        }
    }
}

/// One entry of `expands`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExpandEntry {
    /// Bare association name, passed through verbatim
    Name(String),
    Spec(ExpandSpec),
    /// Any other shape; kept so the resolver can report what it dropped
    Invalid(Value),
}

/// Structured expand entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub separate: Option<bool>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expands: Vec<ExpandEntry>,
}

pub(crate) fn empty_filter() -> Value {
    Value::Object(Map::new())
}

/// Programmatic construction with the same defaulting rules as
/// [`QuerySpec::from_value`]
#[derive(Debug, Clone, Default)]
pub struct QuerySpecBuilder {
    filter: Option<Value>,
    additional_filter: Option<Value>,
    attributes: Vec<String>,
    page: Option<u64>,
    per_page: Option<u64>,
    all_page: bool,
    order_by: Vec<String>,
    expands: Vec<ExpandEntry>,
}

impl QuerySpecBuilder {
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn additional_filter(mut self, filter: Value) -> Self {
        self.additional_filter = Some(filter);
        self
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn all_page(mut self, all_page: bool) -> Self {
        self.all_page = all_page;
        self
    }

    pub fn order_by<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn expand(mut self, entry: ExpandEntry) -> Self {
        self.expands.push(entry);
        self
    }

    pub fn build(self) -> QuerySpec {
        QuerySpec {
            filter: self.filter.filter(|f| !f.is_null()).unwrap_or_else(empty_filter),
            additional_filter: self
                .additional_filter
                .filter(|f| !f.is_null())
                .unwrap_or_else(empty_filter),
            attributes: self.attributes,
            page: self.page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE),
            per_page: self.per_page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PER_PAGE),
            all_page: self.all_page,
            order_by: self.order_by.into_iter().filter(|t| !t.is_empty()).collect(),
            expands: self.expands,
        }
    }
}
