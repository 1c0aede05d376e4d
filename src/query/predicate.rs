//! Typed predicate AST produced by the filter compiler.
//!
//! A [`Predicate`] is rendered to a parameterized SQL fragment through
//! [`PredicateBuilder`], or evaluated directly against an [`EventRecord`] with
//! [`Predicate::matches`]. Only column names, JSON field names and operator
//! symbols end up in SQL text; every value is a bound parameter.
//!
//! Numeric data-field comparisons evaluate like PostgreSQL's `numeric`: both
//! sides are compared as exact decimals, so integers past 2^53 (Move `u64` and
//! `u128` values) keep every digit.

use serde_json::Value;
use std::cmp::Ordering;

use super::ComparisonOperator;
use crate::types::events::EventRecord;
use crate::utils::error::{Result, SuiIndexerError};

/// Event table columns a predicate can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    EventAccountAddress,
    EventHandle,
    BlockTimestamp,
}

impl Column {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Column::EventAccountAddress => "event_account_address",
            Column::EventHandle => "event_handle",
            Column::BlockTimestamp => "block_timestamp",
        }
    }
}

/// Left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(Column),
    /// A (possibly nested) field of the `data` document. `numeric` selects a
    /// numeric comparison instead of a text one.
    DataField { path: Vec<String>, numeric: bool },
}

impl Operand {
    /// Parses a dotted field name (`a.b.c`) into a data-field operand.
    pub fn data_field(name: &str, numeric: bool) -> Self {
        Operand::DataField {
            path: name.split('.').map(str::to_string).collect(),
            numeric,
        }
    }
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    BigInt(i64),
}

impl SqlParam {
    fn as_text(&self) -> String {
        match self {
            SqlParam::Text(s) => s.clone(),
            SqlParam::BigInt(i) => i.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    fn separator(self) -> &'static str {
        match self {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every row.
    Always,
    Compare {
        operand: Operand,
        operator: ComparisonOperator,
        param: SqlParam,
    },
    Group {
        conjunction: Conjunction,
        terms: Vec<Predicate>,
    },
}

impl Predicate {
    pub fn column(column: Column, operator: ComparisonOperator, param: SqlParam) -> Self {
        Predicate::Compare {
            operand: Operand::Column(column),
            operator,
            param,
        }
    }

    pub fn all(terms: Vec<Predicate>) -> Self {
        Predicate::Group {
            conjunction: Conjunction::And,
            terms,
        }
    }

    pub fn any(terms: Vec<Predicate>) -> Self {
        Predicate::Group {
            conjunction: Conjunction::Or,
            terms,
        }
    }

    /// Renders the predicate with placeholders numbered from `first_index`.
    #[must_use]
    pub fn render(&self, first_index: usize) -> RenderedPredicate {
        let mut builder = PredicateBuilder::new(first_index);
        builder.push(self);
        builder.finish()
    }

    /// Evaluates the predicate against a record with the same semantics as the
    /// rendered SQL.
    ///
    /// # Errors
    ///
    /// Returns [`SuiIndexerError::FilterError`] when a numeric comparison
    /// reaches a field whose value is not a number. PostgreSQL rejects the
    /// whole query in that case (`CAST` fails), so the evaluator does too
    /// instead of treating the row as a non-match.
    pub fn matches(&self, record: &EventRecord) -> Result<bool> {
        match self {
            Predicate::Always => Ok(true),
            Predicate::Group {
                conjunction: Conjunction::And,
                terms,
            } => {
                for term in terms {
                    if !term.matches(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Group {
                conjunction: Conjunction::Or,
                terms,
            } => {
                for term in terms {
                    if term.matches(record)? {
                        return Ok(true);
                    }
                }
                Ok(terms.is_empty())
            }
            Predicate::Compare {
                operand,
                operator,
                param,
            } => compare_record(record, operand, *operator, param),
        }
    }
}

/// SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedPredicate {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Accumulates SQL fragments and assigns `$n` placeholders in order.
#[derive(Debug)]
pub struct PredicateBuilder {
    sql: String,
    params: Vec<SqlParam>,
    first_index: usize,
}

impl PredicateBuilder {
    #[must_use]
    pub fn new(first_index: usize) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            first_index,
        }
    }

    /// Index the next bound parameter will get.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.first_index + self.params.len()
    }

    pub fn push_str(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn bind(&mut self, param: &SqlParam) -> String {
        let placeholder = format!("${}", self.next_index());
        self.params.push(param.clone());
        placeholder
    }

    pub fn push(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::Always => self.push_str("TRUE"),
            Predicate::Compare {
                operand,
                operator,
                param,
            } => {
                let placeholder = self.bind(param);
                let fragment = match operand {
                    Operand::Column(column) => {
                        format!("{} {} {placeholder}", column.name(), operator.symbol())
                    }
                    Operand::DataField {
                        path,
                        numeric: true,
                    } => format!(
                        "CAST({} AS numeric) {} CAST({placeholder} AS numeric)",
                        json_path_expr("data", path),
                        operator.symbol()
                    ),
                    Operand::DataField {
                        path,
                        numeric: false,
                    } => format!(
                        "{} {} {placeholder}",
                        json_path_expr("data", path),
                        operator.symbol()
                    ),
                };
                self.push_str(&fragment);
            }
            Predicate::Group { terms, .. } if terms.is_empty() => self.push_str("TRUE"),
            Predicate::Group { conjunction, terms } => {
                self.push_str("(");
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        self.push_str(conjunction.separator());
                    }
                    self.push(term);
                }
                self.push_str(")");
            }
        }
    }

    #[must_use]
    pub fn finish(self) -> RenderedPredicate {
        RenderedPredicate {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Builds `column->'a'->'b'->>'c'` for the path `[a, b, c]`.
#[must_use]
pub fn json_path_expr(column: &str, path: &[String]) -> String {
    let mut expr = column.to_string();
    for (i, segment) in path.iter().enumerate() {
        let arrow = if i + 1 == path.len() { "->>" } else { "->" };
        expr.push_str(arrow);
        expr.push('\'');
        expr.push_str(&segment.replace('\'', "''"));
        expr.push('\'');
    }
    expr
}

fn compare_record(
    record: &EventRecord,
    operand: &Operand,
    operator: ComparisonOperator,
    param: &SqlParam,
) -> Result<bool> {
    match operand {
        Operand::Column(Column::EventAccountAddress) => {
            Ok(operator.evaluate(record.event_account_address.as_str().cmp(&param.as_text())))
        }
        Operand::Column(Column::EventHandle) => {
            Ok(operator.evaluate(record.event_handle.as_str().cmp(&param.as_text())))
        }
        Operand::Column(Column::BlockTimestamp) => {
            let lhs = i128::from(record.block_timestamp);
            Ok(match param {
                SqlParam::BigInt(rhs) => operator.evaluate(lhs.cmp(&i128::from(*rhs))),
                SqlParam::Text(rhs) => rhs
                    .parse::<i128>()
                    .is_ok_and(|rhs| operator.evaluate(lhs.cmp(&rhs))),
            })
        }
        Operand::DataField { path, numeric } => {
            let Some(text) = extract_text(record, path) else {
                return Ok(false);
            };
            if !*numeric {
                return Ok(operator.evaluate(text.as_str().cmp(param.as_text().as_str())));
            }
            let lhs = Decimal::parse(&text).ok_or_else(|| {
                SuiIndexerError::FilterError(format!(
                    "field '{}' holds non-numeric value '{text}'",
                    path.join(".")
                ))
            })?;
            let rhs_text = param.as_text();
            let rhs = Decimal::parse(&rhs_text).ok_or_else(|| {
                SuiIndexerError::FilterError(format!("filter value '{rhs_text}' is not numeric"))
            })?;
            Ok(operator.evaluate(lhs.cmp(&rhs)))
        }
    }
}

/// Arbitrary-precision decimal used for numeric comparisons.
///
/// Stored as `0.d1d2d3... * 10^exponent` with no leading or trailing zero
/// digits; zero has no digits and is never negative.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Decimal {
    negative: bool,
    digits: Vec<u8>,
    exponent: i64,
}

impl Decimal {
    /// Parses the text forms `numeric` accepts for finite values: optional
    /// sign, digits with an optional decimal point, optional `e` exponent,
    /// surrounding whitespace allowed.
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, unsigned) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(at) => (&unsigned[..at], unsigned[at + 1..].parse::<i64>().ok()?),
            None => (unsigned, 0),
        };
        let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }

        let mut digits = Vec::with_capacity(integer.len() + fraction.len());
        for byte in integer.bytes().chain(fraction.bytes()) {
            if !byte.is_ascii_digit() {
                return None;
            }
            digits.push(byte - b'0');
        }

        let mut exponent = i64::try_from(integer.len()).ok()?.checked_add(exponent)?;
        let leading = digits.iter().take_while(|d| **d == 0).count();
        digits.drain(..leading);
        exponent = exponent.checked_sub(i64::try_from(leading).ok()?)?;
        while digits.last() == Some(&0) {
            digits.pop();
        }

        if digits.is_empty() {
            return Some(Self {
                negative: false,
                digits,
                exponent: 0,
            });
        }
        Some(Self {
            negative,
            digits,
            exponent,
        })
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match (self.digits.is_empty(), other.digits.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .exponent
                .cmp(&other.exponent)
                .then_with(|| self.digits.cmp(&other.digits)),
        }
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Mirrors `->>`: strings come out raw, other values as JSON text, and a
/// missing path or JSON null yields no value.
fn extract_text(record: &EventRecord, path: &[String]) -> Option<String> {
    let (first, rest) = path.split_first()?;
    let mut value = record.data.get(first)?;
    for segment in rest {
        value = value.get(segment)?;
    }
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
