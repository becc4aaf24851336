//! Sort token resolution

use qspec_ast::parse_sort_token;
use qspec_ir::OrderTerm;
use qspec_registry::{ModelRegistry, RegistryError};

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Resolve raw sort tokens into ordering terms, preserving order.
///
/// Tokens that do not parse are skipped. A token whose relation segment is
/// unknown to the registry becomes an unqualified term on its column. Only a
/// failing registry is an error.
pub fn resolve_order(
    tokens: &[String],
    registry: &dyn ModelRegistry,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<OrderTerm>, RegistryError> {
    let mut terms = Vec::with_capacity(tokens.len());

    for raw in tokens {
        let token = match parse_sort_token(raw) {
            Ok(token) => token,
            Err(err) => {
                diagnostics.push(Diagnostic::InvalidSortToken {
                    token: raw.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let term = match token.relation {
            Some(relation) => match registry.lookup(&relation)? {
                Some(handle) => {
                    OrderTerm::qualified(token.column, token.direction, handle, relation)
                }
                None => {
                    diagnostics.push(Diagnostic::UnresolvedOrderRelation {
                        token: raw.clone(),
                        relation,
                    });
                    OrderTerm::new(token.column, token.direction)
                }
            },
            None => OrderTerm::new(token.column, token.direction),
        };

        terms.push(term);
    }

    Ok(terms)
}
