//! Identifier quoting for N1QL statements.
//!
//! Values never pass through here: they are always bound as positional
//! arguments. This module only handles names (buckets and field paths), which
//! N1QL cannot parameterize.

use crate::error::InvalidFilterError;

/// Quotes bucket names and field paths as N1QL escaped identifiers.
pub struct IdentifierQuoter;

impl IdentifierQuoter {
    /// Quotes a single identifier in backticks, doubling embedded backticks.
    ///
    /// # Errors
    ///
    /// Rejects empty identifiers and identifiers containing control characters.
    pub fn quote(name: &str) -> Result<String, InvalidFilterError> {
        if name.is_empty() {
            return Err(InvalidFilterError::new("identifier must not be empty"));
        }
        if name.chars().any(char::is_control) {
            return Err(InvalidFilterError::new(format!(
                "identifier `{}` contains control characters",
                name.escape_default()
            )));
        }

        Ok(format!("`{}`", name.replace('`', "``")))
    }

    /// Quotes a dotted field path segment by segment (`a.b` becomes `` `a`.`b` ``).
    ///
    /// # Errors
    ///
    /// Rejects paths with empty segments; the error names the offending path.
    pub fn quote_path(path: &str) -> Result<String, InvalidFilterError> {
        path.split('.')
            .map(|segment| {
                Self::quote(segment).map_err(|err| InvalidFilterError {
                    field: Some(path.to_string()),
                    ..err
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|segments| segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_identifiers() {
        assert_eq!(IdentifierQuoter::quote("tickets").unwrap(), "`tickets`");
        assert_eq!(IdentifierQuoter::quote("travel-sample").unwrap(), "`travel-sample`");
    }

    #[test]
    fn doubles_embedded_backticks() {
        assert_eq!(
            IdentifierQuoter::quote("a` OR 1=1 --").unwrap(),
            "`a`` OR 1=1 --`"
        );
    }

    #[test]
    fn quotes_nested_paths() {
        assert_eq!(
            IdentifierQuoter::quote_path("address.city").unwrap(),
            "`address`.`city`"
        );
    }

    #[test]
    fn rejects_empty_segments_and_control_characters() {
        let err = IdentifierQuoter::quote_path("address..city").unwrap_err();

        assert_eq!(err.field.as_deref(), Some("address..city"));
        assert!(IdentifierQuoter::quote("").is_err());
        assert!(IdentifierQuoter::quote("a\nb").is_err());
    }
}
