//! Decoding of loosely-typed JSON filter objects into [`Filter`].
//!
//! Callers coming from a dynamic ORM hand over filters such as
//!
//! ```json
//! { "where": { "status": "open", "priority": { "gt": 3 } },
//!   "order": "createdAt DESC",
//!   "limit": 10 }
//! ```
//!
//! This module turns them into the typed [`Filter`] model. Every operator name,
//! operand shape and pagination value is checked here, so an unknown operator
//! never reaches the compiler.

use serde_json::{Map, Value};

use crate::{
    error::InvalidFilterError,
    query::{Condition, Filter, Operator, Order, SortDirection, Where},
};

impl Filter {
    /// Decodes a JSON filter object.
    ///
    /// `null` decodes to the empty filter. Unknown top-level keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFilterError`] for unknown operators, operands of the wrong
    /// shape, malformed `order` terms and non-integer `limit`/`skip` values.
    pub fn from_json(value: &Value) -> Result<Self, InvalidFilterError> {
        let object = match value {
            Value::Null => return Ok(Filter::default()),
            Value::Object(object) => object,
            other => {
                return Err(InvalidFilterError::new(format!(
                    "a filter must be an object, got `{other}`"
                )));
            }
        };

        Ok(Filter {
            where_clause: match object.get("where") {
                None | Some(Value::Null) => None,
                Some(value) => Some(Where::from_json(value)?),
            },
            order: decode_order(object.get("order"))?,
            limit: decode_count("limit", object.get("limit"))?,
            skip: match object.get("skip") {
                Some(value) => decode_count("skip", Some(value))?,
                None => decode_count("offset", object.get("offset"))?,
            },
            fields: decode_fields(object.get("fields"))?,
        })
    }
}

impl Where {
    /// Decodes a JSON `where` object.
    ///
    /// Several keys in one object are AND-ed. `and`/`or` keys take an array of
    /// nested `where` objects.
    pub fn from_json(value: &Value) -> Result<Self, InvalidFilterError> {
        let object = value.as_object().ok_or_else(|| {
            InvalidFilterError::new(format!("a where clause must be an object, got `{value}`"))
        })?;

        let mut terms = object
            .iter()
            .map(|(key, value)| decode_term(key, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Where::And(terms)
        })
    }
}

fn decode_term(key: &str, value: &Value) -> Result<Where, InvalidFilterError> {
    match key {
        "and" => Ok(Where::And(decode_branches(key, value)?)),
        "or" => Ok(Where::Or(decode_branches(key, value)?)),
        field => Ok(Where::field(field, decode_condition(field, value)?)),
    }
}

fn decode_branches(key: &str, value: &Value) -> Result<Vec<Where>, InvalidFilterError> {
    value
        .as_array()
        .ok_or_else(|| {
            InvalidFilterError::new(format!("`{key}` expects an array of where clauses"))
                .with_operator(key)
        })?
        .iter()
        .map(Where::from_json)
        .collect()
}

fn decode_condition(field: &str, value: &Value) -> Result<Condition, InvalidFilterError> {
    let Value::Object(object) = value else {
        return Ok(Condition::Eq(value.clone()));
    };

    let (name, operand) = split_operator(field, object)?;
    let operator = Operator::from_name(name).ok_or_else(|| {
        InvalidFilterError::new("unrecognized operator")
            .with_field(field)
            .with_operator(name)
    })?;
    let invalid = |reason: &str| {
        InvalidFilterError::new(reason)
            .with_field(field)
            .with_operator(operator.name())
    };

    Ok(match operator {
        Operator::Eq => Condition::Eq(operand.clone()),
        Operator::Neq => Condition::Neq(operand.clone()),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            if matches!(operand, Value::Null | Value::Array(_) | Value::Object(_)) {
                return Err(invalid("comparison requires a scalar, non-null value"));
            }
            match operator {
                Operator::Gt => Condition::Gt(operand.clone()),
                Operator::Gte => Condition::Gte(operand.clone()),
                Operator::Lt => Condition::Lt(operand.clone()),
                _ => Condition::Lte(operand.clone()),
            }
        }
        Operator::Inq | Operator::Nin => {
            let values = operand
                .as_array()
                .ok_or_else(|| invalid("membership requires an array of values"))?
                .clone();
            if operator == Operator::Inq {
                Condition::Inq(values)
            } else {
                Condition::Nin(values)
            }
        }
        Operator::Like => Condition::Like(
            operand
                .as_str()
                .ok_or_else(|| invalid("pattern must be a string"))?
                .to_string(),
        ),
        Operator::Between => match operand.as_array().map(Vec::as_slice) {
            Some([low, high]) => Condition::Between(low.clone(), high.clone()),
            _ => return Err(invalid("range must be a two-element array")),
        },
    })
}

/// Accepts `{"<op>": value}` and `{"op": "<op>", "value": value}`.
fn split_operator<'a>(
    field: &str,
    object: &'a Map<String, Value>,
) -> Result<(&'a str, &'a Value), InvalidFilterError> {
    if object.len() == 2 {
        if let (Some(Value::String(op)), Some(operand)) = (object.get("op"), object.get("value")) {
            return Ok((op.as_str(), operand));
        }
    }

    let mut entries = object.iter();
    match (entries.next(), entries.next()) {
        (Some((name, operand)), None) => Ok((name.as_str(), operand)),
        _ => Err(InvalidFilterError::new(
            "an operator object must hold exactly one operator",
        )
        .with_field(field)),
    }
}

fn decode_order(value: Option<&Value>) -> Result<Vec<Order>, InvalidFilterError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(term)) => Ok(vec![decode_order_term(term)?]),
        Some(Value::Array(terms)) => terms
            .iter()
            .map(|term| match term {
                Value::String(term) => decode_order_term(term),
                Value::Array(pair) => match pair.as_slice() {
                    [Value::String(field), Value::String(direction)] => Ok(Order {
                        field: field.clone(),
                        direction: decode_direction(field, direction)?,
                    }),
                    [Value::String(field)] => Ok(Order {
                        field: field.clone(),
                        direction: SortDirection::Asc,
                    }),
                    _ => Err(InvalidFilterError::new(format!(
                        "order pair must be [field, direction], got `{term}`"
                    ))),
                },
                other => Err(InvalidFilterError::new(format!(
                    "unsupported order term `{other}`"
                ))),
            })
            .collect(),
        Some(other) => Err(InvalidFilterError::new(format!(
            "order must be a string or an array, got `{other}`"
        ))),
    }
}

fn decode_order_term(term: &str) -> Result<Order, InvalidFilterError> {
    let mut parts = term.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), None, None) => Ok(Order {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }),
        (Some(field), Some(direction), None) => Ok(Order {
            field: field.to_string(),
            direction: decode_direction(field, direction)?,
        }),
        _ => Err(InvalidFilterError::new(format!("malformed order term `{term}`"))),
    }
}

fn decode_direction(field: &str, direction: &str) -> Result<SortDirection, InvalidFilterError> {
    if direction.eq_ignore_ascii_case("asc") {
        Ok(SortDirection::Asc)
    } else if direction.eq_ignore_ascii_case("desc") {
        Ok(SortDirection::Desc)
    } else {
        Err(InvalidFilterError::new(format!("unknown sort direction `{direction}`"))
            .with_field(field))
    }
}

fn decode_count(key: &str, value: Option<&Value>) -> Result<Option<u64>, InvalidFilterError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            InvalidFilterError::new(format!(
                "`{key}` must be a non-negative integer, got `{value}`"
            ))
        }),
    }
}

/// `fields` lists the paths to project, as an array or as `{ name: true }` flags.
/// A `false` flag only drops that name from the selection.
fn decode_fields(value: Option<&Value>) -> Result<Option<Vec<String>>, InvalidFilterError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| {
                name.as_str().map(str::to_string).ok_or_else(|| {
                    InvalidFilterError::new(format!("field names must be strings, got `{name}`"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(Value::Object(flags)) => {
            let included = flags
                .iter()
                .filter(|(_, include)| include.as_bool().unwrap_or(false))
                .map(|(name, _)| name.clone())
                .collect::<Vec<_>>();

            if included.is_empty() && !flags.is_empty() {
                return Err(InvalidFilterError::new(
                    "fields can only select what to include; exclusion-only selections are not supported",
                ));
            }

            Ok(Some(included))
        }
        Some(other) => Err(InvalidFilterError::new(format!(
            "fields must be an array or an object, got `{other}`"
        ))),
    }
}
