//! Compiles filter expressions into predicates and whole event queries.

use serde_json::Value;

use super::predicate::{Column, Operand, Predicate, PredicateBuilder, SqlParam};
use super::{
    BoolExpression, BoolOperator, ComparisonOperator, Expression, LimitAndSort, Primitive,
    SortDirection,
};
use crate::utils::error::{Result, SuiIndexerError};

/// Compiles one expression tree into a [`Predicate`].
///
/// # Errors
///
/// Returns [`SuiIndexerError::FilterError`] for comparators without values,
/// boolean expressions with fewer than two children, timestamps above
/// `i64::MAX` (the `BIGINT` column's range), and primitives this store has no
/// column for (`Block`, `TxHash`).
pub fn compile(expression: &Expression) -> Result<Predicate> {
    match expression {
        Expression::Primitive(primitive) => compile_primitive(primitive),
        Expression::Boolean(boolean) => compile_boolean(boolean),
    }
}

fn compile_primitive(primitive: &Primitive) -> Result<Predicate> {
    match primitive {
        Primitive::Comparator {
            name,
            value_comparators,
        } => {
            if name.is_empty() {
                return Err(SuiIndexerError::FilterError(
                    "comparator field name is empty".to_string(),
                ));
            }
            if value_comparators.is_empty() {
                return Err(SuiIndexerError::FilterError(format!(
                    "comparator '{name}' has no values"
                )));
            }
            let terms = value_comparators
                .iter()
                .map(|vc| {
                    let (numeric, param) = match &vc.value {
                        Value::Number(n) => (true, SqlParam::Text(n.to_string())),
                        Value::String(s) => (false, SqlParam::Text(s.clone())),
                        other => (false, SqlParam::Text(other.to_string())),
                    };
                    Predicate::Compare {
                        operand: Operand::data_field(name, numeric),
                        operator: vc.operator,
                        param,
                    }
                })
                .collect();
            Ok(Predicate::all(terms))
        }
        Primitive::Timestamp {
            timestamp,
            operator,
        } => timestamp_predicate(*timestamp, *operator),
        Primitive::Confidence { .. } => Ok(Predicate::Always),
        Primitive::Block { .. } => Err(SuiIndexerError::FilterError(
            "unsupported primitive type: block".to_string(),
        )),
        Primitive::TxHash { .. } => Err(SuiIndexerError::FilterError(
            "unsupported primitive type: tx_hash".to_string(),
        )),
    }
}

fn compile_boolean(boolean: &BoolExpression) -> Result<Predicate> {
    if boolean.expressions.len() < 2 {
        return Err(SuiIndexerError::FilterError(format!(
            "boolean expression requires at least 2 sub-expressions, got {}",
            boolean.expressions.len()
        )));
    }
    let terms = boolean
        .expressions
        .iter()
        .map(compile)
        .collect::<Result<Vec<_>>>()?;
    Ok(match boolean.operator {
        BoolOperator::And => Predicate::all(terms),
        BoolOperator::Or => Predicate::any(terms),
    })
}

fn timestamp_predicate(timestamp: u64, operator: ComparisonOperator) -> Result<Predicate> {
    let bound = i64::try_from(timestamp).map_err(|_| {
        SuiIndexerError::FilterError(format!(
            "timestamp {timestamp} is out of range (max {})",
            i64::MAX
        ))
    })?;
    Ok(Predicate::column(
        Column::BlockTimestamp,
        operator,
        SqlParam::BigInt(bound),
    ))
}

/// A fully compiled read against one event stream.
///
/// `terms` are AND-joined: the address and handle predicates first, then the
/// hoisted timestamp lower bound if one was given, then every other expression
/// in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub terms: Vec<Predicate>,
    pub direction: SortDirection,
    pub limit: Option<u64>,
}

impl EventQuery {
    /// Compiles a stream query.
    ///
    /// # Errors
    ///
    /// Propagates the first [`compile`] failure.
    pub fn new(
        address: &str,
        handle: &str,
        expressions: &[Expression],
        limit_and_sort: &LimitAndSort,
    ) -> Result<Self> {
        let mut terms = vec![
            Predicate::column(
                Column::EventAccountAddress,
                ComparisonOperator::Eq,
                SqlParam::Text(address.to_string()),
            ),
            Predicate::column(
                Column::EventHandle,
                ComparisonOperator::Eq,
                SqlParam::Text(handle.to_string()),
            ),
        ];

        let hoisted = expressions
            .iter()
            .position(|e| e.timestamp_lower_bound().is_some());
        if let Some((timestamp, operator)) =
            hoisted.and_then(|i| expressions[i].timestamp_lower_bound())
        {
            terms.push(timestamp_predicate(timestamp, operator)?);
        }

        for (i, expression) in expressions.iter().enumerate() {
            if Some(i) == hoisted {
                continue;
            }
            terms.push(compile(expression)?);
        }

        Ok(Self {
            terms,
            direction: limit_and_sort.direction(),
            limit: limit_and_sort.effective_limit(),
        })
    }

    /// Renders `SELECT <columns> FROM <table> WHERE ... ORDER BY ... [LIMIT n]`.
    #[must_use]
    pub fn to_sql(&self, columns: &str, table: &str) -> (String, Vec<SqlParam>) {
        let mut builder = PredicateBuilder::new(1);
        builder.push_str(&format!("SELECT {columns} FROM {table} WHERE "));
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                builder.push_str(" AND ");
            }
            builder.push(term);
        }
        builder.push_str(match self.direction {
            SortDirection::Asc => " ORDER BY event_offset ASC",
            SortDirection::Desc => " ORDER BY event_offset DESC",
        });
        if let Some(limit) = self.limit {
            builder.push_str(&format!(" LIMIT {limit}"));
        }
        let rendered = builder.finish();
        (rendered.sql, rendered.params)
    }

    /// Whether a record satisfies every term. Terms are checked in order and
    /// the first one that fails stops the evaluation.
    ///
    /// # Errors
    ///
    /// Propagates [`Predicate::matches`] failures.
    pub fn matches(&self, record: &crate::types::events::EventRecord) -> Result<bool> {
        for term in &self.terms {
            if !term.matches(record)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ConfidenceLevel, SortBy, ValueComparator};

    #[test]
    fn test_comparator_numeric_and_text() {
        let expr = Expression::comparator(
            "newValue",
            vec![
                ValueComparator::new(1, ComparisonOperator::Gt),
                ValueComparator::new("abc", ComparisonOperator::Neq),
            ],
        );
        let rendered = compile(&expr).unwrap().render(3);
        assert_eq!(
            rendered.sql,
            "(CAST(data->>'newValue' AS numeric) > CAST($3 AS numeric) AND data->>'newValue' != $4)"
        );
        assert_eq!(
            rendered.params,
            vec![SqlParam::Text("1".into()), SqlParam::Text("abc".into())]
        );
    }

    #[test]
    fn test_empty_comparator_rejected() {
        let expr = Expression::comparator("x", vec![]);
        assert!(matches!(compile(&expr), Err(SuiIndexerError::FilterError(_))));
    }

    #[test]
    fn test_unsupported_primitives() {
        let block = Expression::Primitive(Primitive::Block {
            block: "10".into(),
            operator: ComparisonOperator::Gte,
        });
        let tx = Expression::Primitive(Primitive::TxHash { hash: "D".into() });
        for expr in [block, tx] {
            match compile(&expr) {
                Err(SuiIndexerError::FilterError(msg)) => {
                    assert!(msg.contains("unsupported primitive"));
                }
                other => panic!("expected FilterError, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_boolean_needs_two_children() {
        let expr = Expression::and(vec![Expression::confidence(ConfidenceLevel::Finalized)]);
        assert!(matches!(compile(&expr), Err(SuiIndexerError::FilterError(_))));
    }

    #[test]
    fn test_event_query_hoists_timestamp_lower_bound() {
        let expressions = vec![
            Expression::comparator("a", vec![ValueComparator::new("x", ComparisonOperator::Eq)]),
            Expression::timestamp(100, ComparisonOperator::Lt),
            Expression::timestamp(50, ComparisonOperator::Gte),
        ];
        let query = EventQuery::new(
            "0x1",
            "0x1::m::E",
            &expressions,
            &LimitAndSort::new()
                .with_limit(10)
                .sort(SortBy::Sequence(SortDirection::Desc)),
        )
        .unwrap();

        let (sql, params) = query.to_sql("id", "sui.events");
        assert_eq!(
            sql,
            "SELECT id FROM sui.events WHERE event_account_address = $1 AND event_handle = $2 \
             AND block_timestamp >= $3 AND (data->>'a' = $4) AND block_timestamp < $5 \
             ORDER BY event_offset DESC LIMIT 10"
        );
        assert_eq!(
            params,
            vec![
                SqlParam::Text("0x1".into()),
                SqlParam::Text("0x1::m::E".into()),
                SqlParam::BigInt(50),
                SqlParam::Text("x".into()),
                SqlParam::BigInt(100),
            ]
        );
    }

    #[test]
    fn test_timestamp_above_bigint_range_rejected() {
        let too_big = Expression::timestamp(u64::MAX, ComparisonOperator::Lt);
        match compile(&too_big) {
            Err(SuiIndexerError::FilterError(msg)) => assert!(msg.contains("out of range")),
            other => panic!("expected FilterError, got {other:?}"),
        }

        // The hoisted lower bound goes through the same check.
        let hoisted = Expression::timestamp(i64::MAX as u64 + 1, ComparisonOperator::Gte);
        assert!(matches!(
            EventQuery::new("0x1", "0x1::m::E", &[hoisted], &LimitAndSort::new()),
            Err(SuiIndexerError::FilterError(_))
        ));

        let edge = Expression::timestamp(i64::MAX as u64, ComparisonOperator::Lte);
        assert_eq!(
            compile(&edge).unwrap().render(1).params,
            vec![SqlParam::BigInt(i64::MAX)]
        );
    }
}
