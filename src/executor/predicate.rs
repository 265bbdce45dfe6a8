use std::cmp::Ordering;

use crate::{
    storage::schema::TableSchema,
    types::{
        error::{DatabaseError, Result},
        record::Record,
        value::Value,
    },
};

/// Comparison operators for predicates
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    IsNull,
    IsNotNull,
    Like,
    NotLike,
}

/// Logical operators for combining predicates
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// A predicate expression for filtering records
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field comparison: field op value
    Comparison {
        column_name: String,
        op: ComparisonOp,
        value: Value,
    },
    /// Field membership (IN / NOT IN)
    InList {
        column_name: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// Logical combination of predicates
    Logical {
        op: LogicalOp,
        left: Box<Predicate>,
        right: Option<Box<Predicate>>, // None for NOT operator
    },
    /// Always true predicate
    True,
    /// Always false predicate
    False,
}

impl Predicate {
    fn comparison(column_name: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        Self::Comparison {
            column_name: column_name.into(),
            op,
            value,
        }
    }

    /// Create an equality predicate
    pub fn eq(column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(column_name, ComparisonOp::Equal, value.into())
    }

    /// Create a not equal predicate
    pub fn ne(column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(column_name, ComparisonOp::NotEqual, value.into())
    }

    /// Create a less than predicate
    pub fn lt(column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(column_name, ComparisonOp::LessThan, value.into())
    }

    /// Create a less than or equal predicate
    pub fn le(column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(column_name, ComparisonOp::LessThanOrEqual, value.into())
    }

    /// Create a greater than predicate
    pub fn gt(column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(column_name, ComparisonOp::GreaterThan, value.into())
    }

    /// Create a greater than or equal predicate
    pub fn ge(column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(column_name, ComparisonOp::GreaterThanOrEqual, value.into())
    }

    pub fn like(column_name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::comparison(column_name, ComparisonOp::Like, Value::Text(pattern.into()))
    }

    pub fn not_like(column_name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::comparison(column_name, ComparisonOp::NotLike, Value::Text(pattern.into()))
    }

    /// Create an IS NULL predicate
    pub fn is_null(column_name: impl Into<String>) -> Self {
        Self::comparison(column_name, ComparisonOp::IsNull, Value::Null)
    }

    /// Create an IS NOT NULL predicate
    pub fn is_not_null(column_name: impl Into<String>) -> Self {
        Self::comparison(column_name, ComparisonOp::IsNotNull, Value::Null)
    }

    /// Create an IN predicate
    pub fn in_list(column_name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::InList {
            column_name: column_name.into(),
            values,
            negated: false,
        }
    }

    /// Create a NOT IN predicate
    pub fn not_in_list(column_name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::InList {
            column_name: column_name.into(),
            values,
            negated: true,
        }
    }

    /// Create an AND predicate
    pub fn and(left: Predicate, right: Predicate) -> Self {
        Self::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    /// Create an OR predicate
    pub fn or(left: Predicate, right: Predicate) -> Self {
        Self::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    /// Create a NOT predicate
    pub fn not(predicate: Predicate) -> Self {
        Self::Logical {
            op: LogicalOp::Not,
            left: Box::new(predicate),
            right: None,
        }
    }

    /// Evaluate the predicate against a record using its type's schema
    pub fn evaluate(&self, record: &Record, schema: &TableSchema) -> Result<bool> {
        match self {
            Predicate::Comparison {
                column_name,
                op,
                value,
            } => {
                let field = field_value(record, schema, column_name)?;
                Ok(compare_values(field, op, value))
            }
            Predicate::InList {
                column_name,
                values,
                negated,
            } => {
                let field = field_value(record, schema, column_name)?;
                let in_list = values.iter().any(|v| values_equal(field, v));
                Ok(if *negated { !in_list } else { in_list })
            }
            Predicate::Logical { op, left, right } => match op {
                LogicalOp::And => {
                    if !left.evaluate(record, schema)? {
                        return Ok(false); // Short-circuit evaluation
                    }
                    binary_operand(right, "AND")?.evaluate(record, schema)
                }
                LogicalOp::Or => {
                    if left.evaluate(record, schema)? {
                        return Ok(true); // Short-circuit evaluation
                    }
                    binary_operand(right, "OR")?.evaluate(record, schema)
                }
                LogicalOp::Not => Ok(!left.evaluate(record, schema)?),
            },
            Predicate::True => Ok(true),
            Predicate::False => Ok(false),
        }
    }

    /// Get all field names referenced in this predicate
    pub fn get_referenced_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns.sort();
        columns.dedup();
        columns
    }

    fn collect_columns(&self, columns: &mut Vec<String>) {
        match self {
            Predicate::Comparison { column_name, .. } | Predicate::InList { column_name, .. } => {
                columns.push(column_name.clone());
            }
            Predicate::Logical { left, right, .. } => {
                left.collect_columns(columns);
                if let Some(right_pred) = right {
                    right_pred.collect_columns(columns);
                }
            }
            Predicate::True | Predicate::False => {}
        }
    }

    /// Validate that all referenced fields exist in the schema
    pub fn validate_against_schema(&self, schema: &TableSchema) -> Result<()> {
        for column_name in self.get_referenced_columns() {
            if schema.get_column(&column_name).is_none() {
                return Err(DatabaseError::ColumnNotFound {
                    name: column_name,
                    type_name: schema.type_name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn field_value<'r>(record: &'r Record, schema: &TableSchema, column_name: &str) -> Result<&'r Value> {
    let column_index =
        schema
            .get_column_index(column_name)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: column_name.to_string(),
                type_name: schema.type_name.clone(),
            })?;

    record
        .get_value(column_index)
        .ok_or_else(|| DatabaseError::SchemaViolation {
            details: format!(
                "Record has no value for field '{}' at index {}",
                column_name, column_index
            ),
        })
}

fn binary_operand<'p>(right: &'p Option<Box<Predicate>>, op: &str) -> Result<&'p Predicate> {
    right
        .as_deref()
        .ok_or_else(|| DatabaseError::SchemaViolation {
            details: format!("{} operator requires two operands", op),
        })
}

/// Ordering comparisons against NULL or across incomparable kinds are false.
fn compare_values(left: &Value, op: &ComparisonOp, right: &Value) -> bool {
    match op {
        ComparisonOp::Equal => values_equal(left, right),
        ComparisonOp::NotEqual => !values_equal(left, right),
        ComparisonOp::LessThan => ordered(left, right, |o| o == Ordering::Less),
        ComparisonOp::LessThanOrEqual => ordered(left, right, |o| o != Ordering::Greater),
        ComparisonOp::GreaterThan => ordered(left, right, |o| o == Ordering::Greater),
        ComparisonOp::GreaterThanOrEqual => ordered(left, right, |o| o != Ordering::Less),
        ComparisonOp::IsNull => left.is_null(),
        ComparisonOp::IsNotNull => !left.is_null(),
        ComparisonOp::Like => match (left, right) {
            (Value::Text(text), Value::Text(pattern)) => like_match(text, pattern),
            _ => false,
        },
        ComparisonOp::NotLike => match (left, right) {
            (Value::Text(text), Value::Text(pattern)) => !like_match(text, pattern),
            _ => false,
        },
    }
}

fn ordered(left: &Value, right: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    left.partial_cmp(right).is_some_and(accept)
}

/// Equal values of the same kind, or numerically equal integers and reals
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Integer(_), Value::Real(_)) | (Value::Real(_), Value::Integer(_)) => {
            left.partial_cmp(right) == Some(Ordering::Equal)
        }
        _ => left == right,
    }
}

/// LIKE matching: `%` matches any run of characters, `_` exactly one.
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    // Position of the last `%` seen and the text index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}

/// Builder for creating complex predicates
pub struct PredicateBuilder {
    predicate: Option<Predicate>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self { predicate: None }
    }

    pub fn eq(self, column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::eq(column_name, value))
    }

    pub fn ne(self, column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::ne(column_name, value))
    }

    pub fn lt(self, column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::lt(column_name, value))
    }

    pub fn le(self, column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::le(column_name, value))
    }

    pub fn gt(self, column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::gt(column_name, value))
    }

    pub fn ge(self, column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::ge(column_name, value))
    }

    pub fn like(self, column_name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.and(Predicate::like(column_name, pattern))
    }

    pub fn is_null(self, column_name: impl Into<String>) -> Self {
        self.and(Predicate::is_null(column_name))
    }

    pub fn is_not_null(self, column_name: impl Into<String>) -> Self {
        self.and(Predicate::is_not_null(column_name))
    }

    pub fn in_list(self, column_name: impl Into<String>, values: Vec<Value>) -> Self {
        self.and(Predicate::in_list(column_name, values))
    }

    pub fn or(mut self, other_predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate {
            Some(existing) => Predicate::or(existing, other_predicate),
            None => other_predicate,
        });
        self
    }

    pub fn build(self) -> Predicate {
        self.predicate.unwrap_or(Predicate::True)
    }

    fn and(mut self, new_predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate {
            Some(existing) => Predicate::and(existing, new_predicate),
            None => new_predicate,
        });
        self
    }
}

impl Default for PredicateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
