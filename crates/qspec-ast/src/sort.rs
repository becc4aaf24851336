//! Pest-based parser for sort tokens
//!
//! A token such as `-$pictures.age$` reads as: descending, column `age` on
//! relation `pictures`. The `$` delimiters are stripped with the other end
//! sigils; a two-segment path names the relation either way.

use pest::Parser;
use pest_derive::Parser;
use qspec_ir::Direction;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "sort.pest"]
pub struct SortTokenParser;

#[derive(Debug, Error)]
pub enum SortTokenError {
    #[error("Empty sort token")]
    Empty,

    #[error("Pest error: {0}")]
    Pest(#[from] pest::error::Error<Rule>),
}

/// Structured form of a raw sort token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortToken {
    pub direction: Direction,
    /// First path segment, present only for two-segment paths
    pub relation: Option<String>,
    pub column: String,
}

/// Parse one sort token
pub fn parse_sort_token(source: &str) -> Result<SortToken, SortTokenError> {
    let source = source.trim();
    if source.is_empty() {
        return Err(SortTokenError::Empty);
    }

    let token = SortTokenParser::parse(Rule::token, source)?
        .next()
        .ok_or(SortTokenError::Empty)?;

    let mut lead = "";
    let mut trail = "";
    let mut segments: Vec<&str> = Vec::with_capacity(2);

    for pair in token.into_inner() {
        match pair.as_rule() {
            Rule::lead => lead = pair.as_str(),
            Rule::trail => trail = pair.as_str(),
            Rule::path => segments.extend(pair.into_inner().take(2).map(|s| s.as_str())),
            _ => {}
        }
    }

    let direction = if lead.starts_with('-') {
        Direction::Desc
    } else {
        Direction::Asc
    };

    let (relation, column) = match segments.as_slice() {
        [relation, column] => (Some(relation.to_string()), column.to_string()),
        [column] => (None, column.to_string()),
        _ => return Err(SortTokenError::Empty),
    };

    tracing::trace!(source, ?direction, ?relation, %column, "Parsed sort token");

    Ok(SortToken {
        direction,
        relation,
        column,
    })
}
