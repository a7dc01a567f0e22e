//! Evaluation of compiled filters against in-memory records.
//!
//! Comparison semantics follow N1QL closely enough for development and tests:
//!
//! - a missing field fails every condition,
//! - `null` only satisfies `eq null` (`IS NULL`),
//! - ordering comparisons between different types are false,
//! - sorting uses the N1QL collation order across types.

use std::{cmp::Ordering, collections::HashMap, convert::Infallible};

use serde_json::{Map, Value};

use couchlayer_core::query::{Condition, Where, WhereVisitor};

/// Type-erased, comparable representation of JSON values.
///
/// Numbers are normalized to `f64`. `Missing` stands for an absent field.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Missing,
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value
                .as_f64()
                .map(Comparable::Number)
                .unwrap_or(Comparable::Null),
            Value::String(value) => Comparable::String(value),
            Value::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Value::Object(map) => Comparable::Map(
                map.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
        }
    }
}

impl<'a> From<Option<&'a Value>> for Comparable<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        value.map(Comparable::from).unwrap_or(Comparable::Missing)
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the N1QL collation order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Missing => 0,
            Comparable::Null => 1,
            Comparable::Bool(_) => 2,
            Comparable::Number(_) => 3,
            Comparable::String(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Map(_) => 6,
        }
    }

    /// Whether the value is missing or null.
    fn is_unknown(&self) -> bool {
        matches!(self, Comparable::Missing | Comparable::Null)
    }

    /// Total order used for sorting.
    pub(crate) fn collate(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.collate(y))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => a.len().cmp(&b.len()),
            _ => self
                .partial_cmp(other)
                .unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Missing, Comparable::Missing) | (Comparable::Null, Comparable::Null) => {
                Some(Ordering::Equal)
            }
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted field path inside a record.
pub(crate) fn lookup<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

/// N1QL `LIKE`: `%` matches any run, `_` any single character, `\` escapes.
pub(crate) fn like(text: &str, pattern: &str) -> bool {
    enum Token {
        Any,
        One,
        Literal(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        });
    }

    let text = text.chars().collect::<Vec<_>>();
    // matches[j]: the first i text characters match the first j tokens
    let mut matches = vec![false; tokens.len() + 1];
    matches[0] = true;
    for (j, token) in tokens.iter().enumerate() {
        matches[j + 1] = matches[j] && matches!(token, Token::Any);
    }

    for c in &text {
        let mut next = vec![false; tokens.len() + 1];
        for (j, token) in tokens.iter().enumerate() {
            next[j + 1] = match token {
                Token::Any => next[j] || matches[j + 1],
                Token::One => matches[j],
                Token::Literal(l) => matches[j] && l == c,
            };
        }
        matches = next;
    }

    matches[tokens.len()]
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Map<String, Value>,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Map<String, Value>) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Where) -> bool {
        match self.visit_where(expr) {
            Ok(matched) => matched,
            Err(never) => match never {},
        }
    }
}

impl<'a> WhereVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = Infallible;

    fn visit_and(&mut self, exprs: &[Where]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_where(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Where]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_where(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_field(&mut self, field: &str, condition: &Condition) -> Result<Self::Output, Self::Error> {
        let actual = Comparable::from(lookup(self.document, field));

        let compare = |value: &Value, accept: fn(Ordering) -> bool| {
            actual
                .partial_cmp(&Comparable::from(value))
                .is_some_and(accept)
        };

        Ok(match condition {
            Condition::Eq(Value::Null) => matches!(actual, Comparable::Null),
            Condition::Neq(Value::Null) => !actual.is_unknown(),
            _ if actual.is_unknown() => false,
            Condition::Eq(value) => actual == Comparable::from(value),
            Condition::Neq(value) => actual != Comparable::from(value),
            Condition::Gt(value) => compare(value, Ordering::is_gt),
            Condition::Gte(value) => compare(value, Ordering::is_ge),
            Condition::Lt(value) => compare(value, Ordering::is_lt),
            Condition::Lte(value) => compare(value, Ordering::is_le),
            Condition::Inq(values) => values.iter().any(|value| actual == Comparable::from(value)),
            Condition::Nin(values) => !values.iter().any(|value| actual == Comparable::from(value)),
            Condition::Like(pattern) => match &actual {
                Comparable::String(text) => like(text, pattern),
                _ => false,
            },
            Condition::Between(low, high) => {
                compare(low, Ordering::is_ge) && compare(high, Ordering::is_le)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchlayer_core::query::Field;
    use serde_json::json;

    fn matches(document: Value, expr: Where) -> bool {
        DocumentEvaluator::new(document.as_object().unwrap()).evaluate(&expr)
    }

    #[test]
    fn like_supports_wildcards_and_escapes() {
        assert!(like("printer jam", "printer%"));
        assert!(like("printer jam", "%jam"));
        assert!(like("printer jam", "pr_nter%"));
        assert!(like("", "%"));
        assert!(!like("printer", "printer_"));
        assert!(like("50%", "50\\%"));
        assert!(!like("500", "50\\%"));
    }

    #[test]
    fn comparisons_normalize_numbers() {
        let doc = json!({ "priority": 4, "score": 2.5 });

        assert!(matches(doc.clone(), Field::new("priority").gt(3.5)));
        assert!(matches(doc.clone(), Field::new("priority").eq(4.0)));
        assert!(matches(doc.clone(), Field::new("score").between(2, 3)));
        assert!(!matches(doc, Field::new("priority").lt("5")));
    }

    #[test]
    fn missing_and_null_fields() {
        let doc = json!({ "owner": null });

        assert!(matches(doc.clone(), Field::new("owner").eq(Value::Null)));
        assert!(!matches(doc.clone(), Field::new("owner").neq(Value::Null)));
        assert!(!matches(doc.clone(), Field::new("missing").eq(Value::Null)));
        assert!(!matches(doc.clone(), Field::new("owner").neq("bob")));
        assert!(!matches(doc, Field::new("missing").nin(["x"])));
    }

    #[test]
    fn nested_paths_and_membership() {
        let doc = json!({ "owner": { "name": "ana" }, "tags": ["a", "b"] });

        assert!(matches(doc.clone(), Field::new("owner.name").inq(["ana", "bo"])));
        assert!(matches(doc.clone(), Field::new("owner.name").nin(["bo"])));
        assert!(matches(doc, Field::new("tags").eq(json!(["a", "b"]))));
    }

    #[test]
    fn collation_orders_types() {
        let values = [json!(null), json!(true), json!(1), json!("a"), json!([1])];

        for pair in values.windows(2) {
            assert_eq!(
                Comparable::from(&pair[0]).collate(&Comparable::from(&pair[1])),
                Ordering::Less
            );
        }
        assert_eq!(Comparable::Missing.collate(&Comparable::Null), Ordering::Less);
    }
}
