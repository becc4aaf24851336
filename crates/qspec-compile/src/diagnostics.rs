//! Record of input the compiler skipped or degraded

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Sort token that does not match the token grammar; skipped
    InvalidSortToken { token: String, reason: String },

    /// Sort token naming an unknown relation; kept as an unqualified term
    UnresolvedOrderRelation { token: String, relation: String },

    /// Structured expand without a `name`; dropped
    MissingExpandName { entry: String },

    /// Expand whose `modelName` and `name` are both unknown; dropped
    UnresolvedExpand {
        name: String,
        model_name: Option<String>,
    },

    /// Expand that is neither a name nor an object; dropped
    InvalidExpandShape { entry: String },

    /// Base option named after a compiled descriptor field; dropped
    ReservedOption { key: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(?diagnostic, "Query input degraded");
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
