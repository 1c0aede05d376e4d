//! Generic filter language over stored events.
//!
//! Callers describe what they want with an [`Expression`] tree and a
//! [`LimitAndSort`] descriptor; [`compiler`] turns the tree into a typed
//! [`Predicate`](predicate::Predicate) that each store backend knows how to
//! execute.
//!
//! # Example
//!
//! ```
//! use sui_event_indexer::query::{ComparisonOperator, Expression, ValueComparator};
//!
//! // newValue >= 10 AND (owner = "0xa" OR owner = "0xb")
//! let filter = Expression::and(vec![
//!     Expression::comparator(
//!         "newValue",
//!         vec![ValueComparator::new(10, ComparisonOperator::Gte)],
//!     ),
//!     Expression::or(vec![
//!         Expression::comparator("owner", vec![ValueComparator::new("0xa", ComparisonOperator::Eq)]),
//!         Expression::comparator("owner", vec![ValueComparator::new("0xb", ComparisonOperator::Eq)]),
//!     ]),
//! ]);
//! assert!(sui_event_indexer::query::compiler::compile(&filter).is_ok());
//! ```

pub mod compiler;
pub mod predicate;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operators of the filter language.
///
/// Operators arriving as text are parsed leniently: any unrecognized spelling
/// becomes [`ComparisonOperator::Eq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOperator {
    /// SQL symbol of the operator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Neq => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
        }
    }

    /// Applies the operator to the ordering of `lhs` relative to `rhs`.
    #[must_use]
    pub fn evaluate(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::Eq => ordering == Ordering::Equal,
            ComparisonOperator::Neq => ordering != Ordering::Equal,
            ComparisonOperator::Gt => ordering == Ordering::Greater,
            ComparisonOperator::Gte => ordering != Ordering::Less,
            ComparisonOperator::Lt => ordering == Ordering::Less,
            ComparisonOperator::Lte => ordering != Ordering::Greater,
        }
    }

    fn is_lower_bound(self) -> bool {
        matches!(self, ComparisonOperator::Gt | ComparisonOperator::Gte)
    }
}

impl From<&str> for ComparisonOperator {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "neq" | "!=" | "<>" => ComparisonOperator::Neq,
            "gt" | ">" => ComparisonOperator::Gt,
            "gte" | ">=" => ComparisonOperator::Gte,
            "lt" | "<" => ComparisonOperator::Lt,
            "lte" | "<=" => ComparisonOperator::Lte,
            // "eq", "=", "==" and anything unknown
            _ => ComparisonOperator::Eq,
        }
    }
}

impl From<String> for ComparisonOperator {
    fn from(s: String) -> Self {
        ComparisonOperator::from(s.as_str())
    }
}

impl From<ComparisonOperator> for String {
    fn from(op: ComparisonOperator) -> Self {
        match op {
            ComparisonOperator::Eq => "eq",
            ComparisonOperator::Neq => "neq",
            ComparisonOperator::Gt => "gt",
            ComparisonOperator::Gte => "gte",
            ComparisonOperator::Lt => "lt",
            ComparisonOperator::Lte => "lte",
        }
        .to_string()
    }
}

/// One value/operator pair of a comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueComparator {
    pub value: Value,
    pub operator: ComparisonOperator,
}

impl ValueComparator {
    pub fn new(value: impl Into<Value>, operator: ComparisonOperator) -> Self {
        Self {
            value: value.into(),
            operator,
        }
    }
}

/// Confidence levels of the generic filter language. Sui has no probabilistic
/// finality, so every level matches everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Unconfirmed,
    Finalized,
}

/// Leaf filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    /// Compares a field of the event data against every listed value (AND).
    Comparator {
        name: String,
        value_comparators: Vec<ValueComparator>,
    },
    /// Compares the block timestamp (ms).
    Timestamp {
        timestamp: u64,
        operator: ComparisonOperator,
    },
    Confidence { level: ConfidenceLevel },
    /// Block-number filter. Not supported by the event store.
    Block {
        block: String,
        operator: ComparisonOperator,
    },
    /// Transaction-hash filter. Not supported by the event store.
    TxHash { hash: String },
}

/// Boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolExpression {
    pub operator: BoolOperator,
    pub expressions: Vec<Expression>,
}

/// A filter expression: a primitive or a boolean combination of expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Primitive(Primitive),
    Boolean(BoolExpression),
}

impl Expression {
    pub fn comparator(name: impl Into<String>, value_comparators: Vec<ValueComparator>) -> Self {
        Expression::Primitive(Primitive::Comparator {
            name: name.into(),
            value_comparators,
        })
    }

    pub fn timestamp(timestamp: u64, operator: ComparisonOperator) -> Self {
        Expression::Primitive(Primitive::Timestamp {
            timestamp,
            operator,
        })
    }

    pub fn confidence(level: ConfidenceLevel) -> Self {
        Expression::Primitive(Primitive::Confidence { level })
    }

    pub fn and(expressions: Vec<Expression>) -> Self {
        Expression::Boolean(BoolExpression {
            operator: BoolOperator::And,
            expressions,
        })
    }

    pub fn or(expressions: Vec<Expression>) -> Self {
        Expression::Boolean(BoolExpression {
            operator: BoolOperator::Or,
            expressions,
        })
    }

    /// Returns the timestamp if this is a `Timestamp` primitive with `>` or `>=`.
    pub(crate) fn timestamp_lower_bound(&self) -> Option<(u64, ComparisonOperator)> {
        match self {
            Expression::Primitive(Primitive::Timestamp {
                timestamp,
                operator,
            }) if operator.is_lower_bound() => Some((*timestamp, *operator)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Sequence(SortDirection),
    Timestamp(SortDirection),
    Block(SortDirection),
}

/// Row limit and ordering for a query.
///
/// Results are always ordered by event offset; only a leading
/// `SortBy::Sequence(Desc)` flips the direction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LimitAndSort {
    /// Maximum rows to return; `None` or `Some(0)` means unlimited.
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub sort_by: Vec<SortBy>,
}

impl LimitAndSort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort_by: SortBy) -> Self {
        self.sort_by.push(sort_by);
        self
    }

    /// Direction applied to the offset ordering.
    #[must_use]
    pub fn direction(&self) -> SortDirection {
        match self.sort_by.first() {
            Some(SortBy::Sequence(SortDirection::Desc)) => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    /// Effective row limit.
    #[must_use]
    pub fn effective_limit(&self) -> Option<u64> {
        self.limit.filter(|l| *l > 0)
    }
}
