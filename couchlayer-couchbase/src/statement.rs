//! Key-value operations expressed as N1QL statements.
//!
//! The document key is always bound as `$1` and the record as `$2`.

use couchlayer_core::{error::InvalidFilterError, escape::IdentifierQuoter};

pub(crate) fn get(bucket: &str) -> Result<String, InvalidFilterError> {
    let bucket = IdentifierQuoter::quote(bucket)?;

    Ok(format!("SELECT RAW {bucket} FROM {bucket} USE KEYS $1"))
}

pub(crate) fn insert(bucket: &str) -> Result<String, InvalidFilterError> {
    Ok(format!(
        "INSERT INTO {} (KEY, VALUE) VALUES ($1, $2)",
        IdentifierQuoter::quote(bucket)?
    ))
}

pub(crate) fn upsert(bucket: &str) -> Result<String, InvalidFilterError> {
    Ok(format!(
        "UPSERT INTO {} (KEY, VALUE) VALUES ($1, $2)",
        IdentifierQuoter::quote(bucket)?
    ))
}

/// Returns the removed key, so an empty result means the key was absent.
pub(crate) fn remove(bucket: &str) -> Result<String, InvalidFilterError> {
    Ok(format!(
        "DELETE FROM {} USE KEYS $1 RETURNING META().id",
        IdentifierQuoter::quote(bucket)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_quote_the_bucket() {
        assert_eq!(get("tickets").unwrap(), "SELECT RAW `tickets` FROM `tickets` USE KEYS $1");
        assert_eq!(insert("tickets").unwrap(), "INSERT INTO `tickets` (KEY, VALUE) VALUES ($1, $2)");
        assert_eq!(upsert("my`bucket").unwrap(), "UPSERT INTO `my``bucket` (KEY, VALUE) VALUES ($1, $2)");
        assert_eq!(remove("tickets").unwrap(), "DELETE FROM `tickets` USE KEYS $1 RETURNING META().id");
    }

    #[test]
    fn empty_bucket_is_rejected() {
        assert!(get("").is_err());
    }
}
