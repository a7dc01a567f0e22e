//! Filter construction API for finding and counting records.
//!
//! A [`Filter`] carries a predicate tree ([`Where`]), an ordering, pagination and an
//! optional projection. It is compiled into a N1QL statement by
//! [`FilterCompiler`](crate::compiler::FilterCompiler).
//!
//! # Filter Building
//!
//! ```ignore
//! use couchlayer::query::{Filter, Field, SortDirection};
//!
//! let filter = Filter::builder()
//!     .filter(Field::new("status").eq("open").and(Field::new("priority").gt(3)))
//!     .order("createdAt", SortDirection::Desc)
//!     .limit(10)
//!     .build();
//! ```
//!
//! # Field Condition API
//!
//! [`Field`] builds leaf predicates:
//!
//! - Comparison: `eq`, `neq`, `gt`, `gte`, `lt`, `lte`
//! - Membership: `inq`, `nin`
//! - Pattern: `like`
//! - Range: `between`
//!
//! Leaves combine with [`Where::and`] and [`Where::or`].

use serde_json::Value;
use std::fmt;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// Returns the N1QL keyword for this direction.
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// The field path to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// The operator set understood by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Inq,
    Nin,
    Like,
    Between,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Inq,
        Operator::Nin,
        Operator::Like,
        Operator::Between,
    ];

    /// Returns the operator name used in JSON filters.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Inq => "inq",
            Operator::Nin => "nin",
            Operator::Like => "like",
            Operator::Between => "between",
        }
    }

    /// Looks up an operator by its JSON name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A condition applied to a single field.
///
/// Each variant carries exactly the operands its operator needs, so a
/// `between` without two bounds cannot be expressed.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Equal to (`null` compiles to `IS NULL`).
    Eq(Value),
    /// Not equal to (`null` compiles to `IS NOT NULL`).
    Neq(Value),
    /// Greater than.
    Gt(Value),
    /// Greater than or equal to.
    Gte(Value),
    /// Less than.
    Lt(Value),
    /// Less than or equal to.
    Lte(Value),
    /// Value is one of the list.
    Inq(Vec<Value>),
    /// Value is none of the list.
    Nin(Vec<Value>),
    /// N1QL `LIKE` pattern (`%` any run, `_` any single character).
    Like(String),
    /// Inclusive range.
    Between(Value, Value),
}

impl Condition {
    /// Returns the operator of this condition.
    pub fn operator(&self) -> Operator {
        match self {
            Condition::Eq(_) => Operator::Eq,
            Condition::Neq(_) => Operator::Neq,
            Condition::Gt(_) => Operator::Gt,
            Condition::Gte(_) => Operator::Gte,
            Condition::Lt(_) => Operator::Lt,
            Condition::Lte(_) => Operator::Lte,
            Condition::Inq(_) => Operator::Inq,
            Condition::Nin(_) => Operator::Nin,
            Condition::Like(_) => Operator::Like,
            Condition::Between(_, _) => Operator::Between,
        }
    }
}

/// A predicate tree over record fields.
///
/// # Example
///
/// ```ignore
/// use couchlayer::query::{Where, Field};
///
/// let expr = Where::and(vec![
///     Field::new("status").eq("open"),
///     Field::new("priority").gt(3),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// All children must hold.
    And(Vec<Where>),
    /// At least one child must hold.
    Or(Vec<Where>),
    /// A condition on one field path.
    Field {
        /// Field path; dots address nested fields.
        field: String,
        /// The condition applied to the field.
        condition: Condition,
    },
}

impl Where {
    /// Creates a field condition.
    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        Where::Field { field: field.into(), condition }
    }

    /// Combines this predicate with another using logical AND.
    ///
    /// If this predicate is already an AND, the other one is appended.
    pub fn and(self, other: Where) -> Self {
        match self {
            Where::And(mut list) => {
                list.push(other);
                Where::And(list)
            }
            _ => Where::And(vec![self, other]),
        }
    }

    /// Combines this predicate with another using logical OR.
    ///
    /// If this predicate is already an OR, the other one is appended.
    pub fn or(self, other: Where) -> Self {
        match self {
            Where::Or(mut list) => {
                list.push(other);
                Where::Or(list)
            }
            _ => Where::Or(vec![self, other]),
        }
    }

    /// Creates an AND over any number of predicates.
    pub fn all(exprs: impl IntoIterator<Item = Where>) -> Self {
        Where::And(exprs.into_iter().collect())
    }

    /// Creates an OR over any number of predicates.
    pub fn any(exprs: impl IntoIterator<Item = Where>) -> Self {
        Where::Or(exprs.into_iter().collect())
    }
}

/// Entry point for building field conditions.
///
/// ```ignore
/// let expr = Field::new("priority").between(1, 5);
/// ```
#[derive(Debug, Clone)]
pub struct Field(String);

impl Field {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn eq(self, value: impl Into<Value>) -> Where {
        Where::field(self.0, Condition::Eq(value.into()))
    }

    pub fn neq(self, value: impl Into<Value>) -> Where {
        Where::field(self.0, Condition::Neq(value.into()))
    }

    pub fn gt(self, value: impl Into<Value>) -> Where {
        Where::field(self.0, Condition::Gt(value.into()))
    }

    pub fn gte(self, value: impl Into<Value>) -> Where {
        Where::field(self.0, Condition::Gte(value.into()))
    }

    pub fn lt(self, value: impl Into<Value>) -> Where {
        Where::field(self.0, Condition::Lt(value.into()))
    }

    pub fn lte(self, value: impl Into<Value>) -> Where {
        Where::field(self.0, Condition::Lte(value.into()))
    }

    pub fn inq<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Where {
        Where::field(self.0, Condition::Inq(values.into_iter().map(Into::into).collect()))
    }

    pub fn nin<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Where {
        Where::field(self.0, Condition::Nin(values.into_iter().map(Into::into).collect()))
    }

    pub fn like(self, pattern: impl Into<String>) -> Where {
        Where::field(self.0, Condition::Like(pattern.into()))
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Where {
        Where::field(self.0, Condition::Between(low.into(), high.into()))
    }
}

/// A structured request for finding or counting records of one model.
///
/// Use [`FilterBuilder`] for ergonomic construction, or
/// [`Filter::from_json`] to decode a loosely-typed filter object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Predicate tree; `None` matches every record of the model.
    pub where_clause: Option<Where>,
    /// Sort terms, applied in order.
    pub order: Vec<Order>,
    /// Maximum number of records to return.
    pub limit: Option<u64>,
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Fields to project; `None` projects whole records.
    pub fields: Option<Vec<String>>,
}

impl Filter {
    /// Creates a filter matching every record of a model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new filter builder.
    pub fn builder() -> FilterBuilder {
        FilterBuilder::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    filter: Filter,
}

impl FilterBuilder {
    pub fn new() -> Self {
        FilterBuilder { filter: Filter::default() }
    }

    /// Sets the predicate tree, AND-ing it with any predicate set earlier.
    pub fn filter(mut self, expr: Where) -> Self {
        self.filter.where_clause = Some(match self.filter.where_clause.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Appends a sort term.
    pub fn order(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.filter.order.push(Order { field: field.into(), direction });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.filter.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.filter.skip = Some(skip);
        self
    }

    /// Restricts the returned fields.
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.filter.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Filter {
        self.filter
    }
}

/// Walks a [`Where`] tree, producing one output per node.
///
/// Implemented by the N1QL compiler and by the in-memory evaluator.
pub trait WhereVisitor {
    type Output;
    type Error;

    fn visit_and(&mut self, exprs: &[Where]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Where]) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        condition: &Condition,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_where(&mut self, expr: &Where) -> Result<Self::Output, Self::Error> {
        match expr {
            Where::And(exprs) => self.visit_and(exprs),
            Where::Or(exprs) => self.visit_or(exprs),
            Where::Field { field, condition } => self.visit_field(field, condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn and_flattens_into_existing_list() {
        let expr = Field::new("a").eq(1).and(Field::new("b").eq(2)).and(Field::new("c").eq(3));

        match expr {
            Where::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected AND, got {other:?}"),
        }
    }

    #[test]
    fn builder_ands_repeated_filters() {
        let filter = Filter::builder()
            .filter(Field::new("status").eq("open"))
            .filter(Field::new("priority").gt(3))
            .order("createdAt", SortDirection::Desc)
            .limit(10)
            .build();

        assert_eq!(
            filter.where_clause,
            Some(Where::And(vec![
                Where::field("status", Condition::Eq(json!("open"))),
                Where::field("priority", Condition::Gt(json!(3))),
            ]))
        );
        assert_eq!(filter.order[0].direction, SortDirection::Desc);
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.skip, None);
    }

    #[test]
    fn operator_names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_name(op.name()), Some(op));
        }
        assert_eq!(Operator::from_name("nlike"), None);
    }
}
