//! qspec AST - raw query input, normalization and sort-token grammar

mod normalize;
pub mod sort;
pub mod spec;

pub use sort::{parse_sort_token, SortToken, SortTokenError};
pub use spec::*;
