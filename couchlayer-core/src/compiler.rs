//! Compilation of [`Filter`]s into parameterized N1QL statements.
//!
//! The compiler is a pure function of `(bucket, model, filter)`. Every
//! statement it produces:
//!
//! - reads from the quoted bucket,
//! - always constrains `documentType` to the model, so several models can share
//!   one bucket,
//! - binds every value as a positional argument (`$1`, `$2`, ...).
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::{compiler::FilterCompiler, query::{Filter, Field, SortDirection}};
//!
//! let filter = Filter::builder()
//!     .filter(Field::new("status").eq("open").and(Field::new("priority").gt(3)))
//!     .order("createdAt", SortDirection::Desc)
//!     .limit(10)
//!     .build();
//!
//! let clause = FilterCompiler::compile_select("tickets", "Ticket", &filter)?;
//! assert_eq!(
//!     clause.statement(),
//!     "SELECT `tickets`.* FROM `tickets` WHERE `documentType` = $1 AND `status` = $2 \
//!      AND `priority` > $3 ORDER BY `createdAt` DESC LIMIT 10",
//! );
//! ```

use serde_json::Value;
use std::fmt;

use crate::{
    error::InvalidFilterError,
    escape::IdentifierQuoter,
    query::{Condition, Filter, Where, WhereVisitor},
    record::DOCUMENT_TYPE_FIELD,
};

/// Alias of the aggregate column produced by count statements.
pub const COUNT_ALIAS: &str = "cnt";

/// What a compiled statement returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    /// Rows are records (or projections of records).
    Select,
    /// A single row holding [`COUNT_ALIAS`].
    Count,
}

/// A compiled N1QL statement and its positional arguments.
///
/// Besides the statement text, the clause keeps the filter it was compiled
/// from so in-process stores can evaluate it without parsing N1QL.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledClause {
    statement: String,
    args: Vec<Value>,
    bucket: String,
    model: String,
    kind: ClauseKind,
    filter: Filter,
}

impl CompiledClause {
    /// The N1QL statement.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Positional arguments; `args()[0]` binds `$1`.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The bucket the statement reads from.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The model the statement is scoped to.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn kind(&self) -> ClauseKind {
        self.kind
    }

    /// The filter this clause was compiled from. For count clauses, ordering,
    /// pagination and projection are cleared.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}

impl fmt::Display for CompiledClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.statement)
    }
}

/// Compiles filters into N1QL.
pub struct FilterCompiler;

impl FilterCompiler {
    /// Compiles a statement returning the matching records of `model`.
    ///
    /// Projects `fields` when set, otherwise whole records. `order`, `limit` and
    /// `skip` are emitted only when present.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFilterError`] if the bucket name or a field path cannot be
    /// quoted.
    pub fn compile_select(
        bucket: &str,
        model: &str,
        filter: &Filter,
    ) -> Result<CompiledClause, InvalidFilterError> {
        let quoted_bucket = IdentifierQuoter::quote(bucket)?;
        let projection = match filter.fields.as_deref() {
            Some(fields) if !fields.is_empty() => fields
                .iter()
                .map(|field| IdentifierQuoter::quote_path(field))
                .collect::<Result<Vec<_>, _>>()?
                .join(", "),
            _ => format!("{quoted_bucket}.*"),
        };

        let mut translator = N1qlTranslator::default();
        let predicate = translator.scoped_predicate(model, filter.where_clause.as_ref())?;
        let mut statement = format!("SELECT {projection} FROM {quoted_bucket} WHERE {predicate}");

        if !filter.order.is_empty() {
            let terms = filter
                .order
                .iter()
                .map(|order| {
                    IdentifierQuoter::quote_path(&order.field)
                        .map(|field| format!("{field} {}", order.direction.keyword()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            statement.push_str(" ORDER BY ");
            statement.push_str(&terms.join(", "));
        }
        if let Some(limit) = filter.limit {
            statement.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(skip) = filter.skip {
            statement.push_str(&format!(" OFFSET {skip}"));
        }

        Ok(CompiledClause {
            statement,
            args: translator.args,
            bucket: bucket.to_string(),
            model: model.to_string(),
            kind: ClauseKind::Select,
            filter: filter.clone(),
        })
    }

    /// Compiles a statement counting the matching records of `model`.
    ///
    /// Only the predicate is used; ordering, pagination and projection are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`FilterCompiler::compile_select`].
    pub fn compile_count(
        bucket: &str,
        model: &str,
        filter: &Filter,
    ) -> Result<CompiledClause, InvalidFilterError> {
        let quoted_bucket = IdentifierQuoter::quote(bucket)?;

        let mut translator = N1qlTranslator::default();
        let predicate = translator.scoped_predicate(model, filter.where_clause.as_ref())?;

        Ok(CompiledClause {
            statement: format!(
                "SELECT COUNT(*) AS {COUNT_ALIAS} FROM {quoted_bucket} WHERE {predicate}"
            ),
            args: translator.args,
            bucket: bucket.to_string(),
            model: model.to_string(),
            kind: ClauseKind::Count,
            filter: Filter {
                where_clause: filter.where_clause.clone(),
                ..Filter::default()
            },
        })
    }
}

/// Renders a [`Where`] tree as a N1QL boolean expression, collecting arguments.
#[derive(Default)]
struct N1qlTranslator {
    args: Vec<Value>,
}

impl N1qlTranslator {
    fn bind(&mut self, value: Value) -> String {
        self.args.push(value);
        format!("${}", self.args.len())
    }

    /// `documentType = model`, AND-ed with the top-level terms of `expr`.
    fn scoped_predicate(
        &mut self,
        model: &str,
        expr: Option<&Where>,
    ) -> Result<String, InvalidFilterError> {
        let mut terms = vec![format!(
            "{} = {}",
            IdentifierQuoter::quote(DOCUMENT_TYPE_FIELD)?,
            self.bind(Value::String(model.to_string()))
        )];

        match expr {
            None => {}
            Some(Where::And(children)) => {
                for child in children {
                    terms.push(self.visit_where(child)?);
                }
            }
            Some(other) => terms.push(self.visit_where(other)?),
        }

        Ok(terms.join(" AND "))
    }

    fn join(
        &mut self,
        exprs: &[Where],
        separator: &str,
        empty: &str,
    ) -> Result<String, InvalidFilterError> {
        if exprs.is_empty() {
            return Ok(empty.to_string());
        }

        let parts = exprs
            .iter()
            .map(|expr| self.visit_where(expr))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(format!("({})", parts.join(separator)))
    }
}

impl WhereVisitor for N1qlTranslator {
    type Output = String;
    type Error = InvalidFilterError;

    fn visit_and(&mut self, exprs: &[Where]) -> Result<Self::Output, Self::Error> {
        self.join(exprs, " AND ", "TRUE")
    }

    fn visit_or(&mut self, exprs: &[Where]) -> Result<Self::Output, Self::Error> {
        self.join(exprs, " OR ", "FALSE")
    }

    fn visit_field(
        &mut self,
        field: &str,
        condition: &Condition,
    ) -> Result<Self::Output, Self::Error> {
        let path = IdentifierQuoter::quote_path(field)?;

        Ok(match condition {
            Condition::Eq(Value::Null) => format!("{path} IS NULL"),
            Condition::Neq(Value::Null) => format!("{path} IS NOT NULL"),
            Condition::Eq(value) => format!("{path} = {}", self.bind(value.clone())),
            Condition::Neq(value) => format!("{path} != {}", self.bind(value.clone())),
            Condition::Gt(value) => format!("{path} > {}", self.bind(value.clone())),
            Condition::Gte(value) => format!("{path} >= {}", self.bind(value.clone())),
            Condition::Lt(value) => format!("{path} < {}", self.bind(value.clone())),
            Condition::Lte(value) => format!("{path} <= {}", self.bind(value.clone())),
            Condition::Inq(values) => {
                format!("{path} IN {}", self.bind(Value::Array(values.clone())))
            }
            Condition::Nin(values) => {
                format!("{path} NOT IN {}", self.bind(Value::Array(values.clone())))
            }
            Condition::Like(pattern) => {
                format!("{path} LIKE {}", self.bind(Value::String(pattern.clone())))
            }
            Condition::Between(low, high) => {
                let low = self.bind(low.clone());
                let high = self.bind(high.clone());
                format!("{path} BETWEEN {low} AND {high}")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Field, Operator, SortDirection};
    use serde_json::json;

    #[test]
    fn compiles_ticket_example() {
        let filter = Filter::builder()
            .filter(Field::new("status").eq("open").and(Field::new("priority").gt(3)))
            .order("createdAt", SortDirection::Desc)
            .limit(10)
            .build();

        let clause = FilterCompiler::compile_select("tickets", "Ticket", &filter).unwrap();

        assert_eq!(
            clause.statement(),
            "SELECT `tickets`.* FROM `tickets` WHERE `documentType` = $1 AND `status` = $2 \
             AND `priority` > $3 ORDER BY `createdAt` DESC LIMIT 10"
        );
        assert_eq!(clause.args(), &[json!("Ticket"), json!("open"), json!(3)]);
        assert_eq!(clause.kind(), ClauseKind::Select);
    }

    #[test]
    fn compiles_ticket_example_from_json() {
        let filter = Filter::from_json(&json!({
            "where": { "status": "open", "priority": { "gt": 3 } },
            "order": [["createdAt", "DESC"]],
            "limit": 10
        }))
        .unwrap();

        let clause = FilterCompiler::compile_select("tickets", "Ticket", &filter).unwrap();

        assert_eq!(
            clause.statement(),
            "SELECT `tickets`.* FROM `tickets` WHERE `documentType` = $1 AND `priority` > $2 \
             AND `status` = $3 ORDER BY `createdAt` DESC LIMIT 10"
        );
        assert_eq!(clause.args(), &[json!("Ticket"), json!(3), json!("open")]);
    }

    #[test]
    fn empty_where_reduces_to_document_type() {
        for filter in [Filter::default(), Filter::from_json(&json!({ "where": {} })).unwrap()] {
            let select = FilterCompiler::compile_select("tickets", "Ticket", &filter).unwrap();
            let count = FilterCompiler::compile_count("tickets", "Ticket", &filter).unwrap();

            assert_eq!(
                select.statement(),
                "SELECT `tickets`.* FROM `tickets` WHERE `documentType` = $1"
            );
            assert_eq!(
                count.statement(),
                "SELECT COUNT(*) AS cnt FROM `tickets` WHERE `documentType` = $1"
            );
            assert_eq!(select.args(), &[json!("Ticket")]);
            assert_eq!(count.args(), &[json!("Ticket")]);
        }
    }

    #[test]
    fn count_ignores_order_pagination_and_projection() {
        let filter = Filter::builder()
            .filter(Field::new("status").eq("open"))
            .order("createdAt", SortDirection::Asc)
            .limit(5)
            .skip(5)
            .fields(["status"])
            .build();

        let clause = FilterCompiler::compile_count("tickets", "Ticket", &filter).unwrap();

        assert_eq!(
            clause.statement(),
            "SELECT COUNT(*) AS cnt FROM `tickets` WHERE `documentType` = $1 AND `status` = $2"
        );
        assert_eq!(clause.kind(), ClauseKind::Count);
        assert!(clause.filter().order.is_empty());
        assert_eq!(clause.filter().limit, None);
    }

    #[test]
    fn every_operator_uses_its_template() {
        let cases = [
            (Field::new("f").eq(1), "`f` = $2"),
            (Field::new("f").neq(1), "`f` != $2"),
            (Field::new("f").gt(1), "`f` > $2"),
            (Field::new("f").gte(1), "`f` >= $2"),
            (Field::new("f").lt(1), "`f` < $2"),
            (Field::new("f").lte(1), "`f` <= $2"),
            (Field::new("f").inq([1, 2]), "`f` IN $2"),
            (Field::new("f").nin([1, 2]), "`f` NOT IN $2"),
            (Field::new("f").like("a%"), "`f` LIKE $2"),
            (Field::new("f").between(1, 9), "`f` BETWEEN $2 AND $3"),
        ];
        assert_eq!(cases.len(), Operator::ALL.len());

        for (expr, template) in cases {
            let filter = Filter::builder().filter(expr).build();
            let clause = FilterCompiler::compile_select("b", "M", &filter).unwrap();

            assert!(
                clause.statement().ends_with(&format!("WHERE `documentType` = $1 AND {template}")),
                "unexpected statement {}",
                clause.statement()
            );
        }
    }

    #[test]
    fn null_equality_uses_is_null() {
        let filter = Filter::builder()
            .filter(Field::new("owner").eq(Value::Null).and(Field::new("closedAt").neq(Value::Null)))
            .build();

        let clause = FilterCompiler::compile_select("b", "M", &filter).unwrap();

        assert!(clause.statement().ends_with("`owner` IS NULL AND `closedAt` IS NOT NULL"));
        assert_eq!(clause.args().len(), 1);
    }

    #[test]
    fn nested_combinators_are_parenthesized() {
        let filter = Filter::builder()
            .filter(Where::any([
                Field::new("status").eq("open"),
                Where::all([Field::new("priority").gte(4), Field::new("owner.name").like("a%")]),
            ]))
            .build();

        let clause = FilterCompiler::compile_select("b", "M", &filter).unwrap();

        assert!(clause.statement().ends_with(
            "`documentType` = $1 AND (`status` = $2 OR (`priority` >= $3 AND `owner`.`name` LIKE $4))"
        ));
    }

    #[test]
    fn empty_combinators_compile_to_constants() {
        let filter = Filter::builder().filter(Where::Or(vec![])).build();
        let clause = FilterCompiler::compile_select("b", "M", &filter).unwrap();

        assert!(clause.statement().ends_with("`documentType` = $1 AND FALSE"));
    }

    #[test]
    fn values_are_never_interpolated() {
        let hostile = "x' OR '1'='1";
        let filter = Filter::builder().filter(Field::new("name").eq(hostile)).build();

        let clause = FilterCompiler::compile_select("b", "M", &filter).unwrap();

        assert!(!clause.statement().contains(hostile));
        assert_eq!(clause.args()[1], json!(hostile));
    }

    #[test]
    fn hostile_identifiers_stay_quoted() {
        let filter = Filter::builder().filter(Field::new("a` = 1 OR `b").eq(1)).build();

        let clause = FilterCompiler::compile_select("bucket`x", "M", &filter).unwrap();

        assert!(clause.statement().starts_with("SELECT `bucket``x`.* FROM `bucket``x`"));
        assert!(clause.statement().contains("`a`` = 1 OR ``b` = $2"));
    }

    #[test]
    fn projection_skip_and_multiple_orders() {
        let filter = Filter::builder()
            .fields(["status", "owner.name"])
            .order("priority", SortDirection::Desc)
            .order("createdAt", SortDirection::Asc)
            .skip(20)
            .build();

        let clause = FilterCompiler::compile_select("tickets", "Ticket", &filter).unwrap();

        assert_eq!(
            clause.statement(),
            "SELECT `status`, `owner`.`name` FROM `tickets` WHERE `documentType` = $1 \
             ORDER BY `priority` DESC, `createdAt` ASC OFFSET 20"
        );
    }

    #[test]
    fn invalid_field_paths_are_rejected() {
        let filter = Filter::builder().filter(Field::new("a..b").eq(1)).build();

        let err = FilterCompiler::compile_select("b", "M", &filter).unwrap_err();

        assert_eq!(err.field.as_deref(), Some("a..b"));
    }

    #[test]
    fn compilation_is_independent_of_json_key_order() {
        let first = Filter::from_json(&json!({ "where": { "a": 1, "b": { "gt": 2 } }, "limit": 3 }))
            .unwrap();
        let second = Filter::from_json(&json!({ "limit": 3, "where": { "b": { "gt": 2 }, "a": 1 } }))
            .unwrap();

        assert_eq!(
            FilterCompiler::compile_select("b", "M", &first).unwrap(),
            FilterCompiler::compile_select("b", "M", &second).unwrap()
        );
    }
}
