//! Predicate trees and their reduction to bitmasks.

use crate::bitmask::Bitmask;
use crate::error::{FilterError, Result};
use crate::operator::Operator;
use crate::schema::{ColumnDef, ColumnKind, Row, Schema};
use crate::value::Value;
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

/// A single comparison `column <operator> operand`, bound to a column of a
/// schema. The operand has already been converted to the column's type.
#[derive(Debug, Clone)]
pub struct Leaf {
    column: ColumnDef,
    operator: Operator,
    operand: Value,
    regex: Option<Regex>,
}

impl Leaf {
    pub fn new(
        schema: &Schema,
        column: &str,
        operator: Operator,
        operand: impl Into<Value>,
    ) -> Result<Self> {
        let column = schema.column(column)?.clone();
        if !operator.applies_to(&column.kind) {
            return Err(FilterError::UnsupportedOperator {
                column: column.name,
                operator,
            });
        }

        let operand = coerce_operand(&column, operand.into())?;
        let (operand, regex) = match operator {
            Operator::Matches | Operator::MatchesIcase => {
                let pattern = operand.as_text().unwrap_or_default();
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(operator == Operator::MatchesIcase)
                    .build()
                    .map_err(|e| FilterError::InvalidRegex {
                        pattern: pattern.to_string(),
                        reason: e.to_string(),
                    })?;
                (operand, Some(regex))
            }
            Operator::EqualIcase => {
                let lowered = operand.as_text().unwrap_or_default().to_lowercase();
                (Value::Text(lowered), None)
            }
            _ => (operand, None),
        };

        Ok(Self {
            column,
            operator,
            operand,
            regex,
        })
    }

    pub fn column(&self) -> &ColumnDef {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// Applies the comparison to a value of this leaf's column.
    pub fn test(&self, value: &Value) -> bool {
        let ordering = || value.compare(&self.operand);
        match self.operator {
            Operator::Equal => ordering() == Some(Ordering::Equal),
            Operator::NotEqual => ordering() != Some(Ordering::Equal),
            Operator::Less => ordering() == Some(Ordering::Less),
            Operator::LessOrEqual => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            Operator::Greater => ordering() == Some(Ordering::Greater),
            Operator::GreaterOrEqual => {
                matches!(ordering(), Some(Ordering::Greater | Ordering::Equal))
            }
            Operator::Matches | Operator::MatchesIcase => match (value.as_text(), &self.regex) {
                (Some(text), Some(regex)) => regex.is_match(text),
                _ => false,
            },
            Operator::EqualIcase => match (value.as_text(), self.operand.as_text()) {
                (Some(text), Some(lowered)) => text.to_lowercase() == lowered,
                _ => false,
            },
        }
    }

    /// Mask of the domain values this leaf admits, or `None` if the leaf is
    /// not a bit test on `column`.
    fn admitted_bits(&self, column: &str) -> Option<Bitmask> {
        if self.column.name != column || !self.operator.is_ordering() {
            return None;
        }
        let domain = self.column.kind.bit_domain()?;
        let mut mask = Bitmask::EMPTY;
        for k in 0..domain.len() {
            let value = self.column.kind.value_of_bit(k)?;
            if self.test(&value) {
                mask |= Bitmask::bit(k);
            }
        }
        Some(mask)
    }
}

fn coerce_operand(column: &ColumnDef, operand: Value) -> Result<Value> {
    let invalid = |operand: &Value| FilterError::InvalidOperand {
        column: column.name.clone(),
        operand: operand.to_string(),
    };

    let coerced = match (&column.kind, &operand) {
        (_, Value::Null) => None,
        (ColumnKind::Text, v) => Some(Value::Text(v.to_string())),
        (ColumnKind::Int, Value::Int(v) | Value::Time(v)) => Some(Value::Int(*v)),
        (ColumnKind::Time, Value::Int(v) | Value::Time(v)) => Some(Value::Time(*v)),
        (ColumnKind::Int | ColumnKind::Time | ColumnKind::Float, Value::Float(v)) => {
            Some(Value::Float(*v))
        }
        (ColumnKind::Int | ColumnKind::Time, Value::Text(s)) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(v) if column.kind == ColumnKind::Time => Some(Value::Time(v)),
                Ok(v) => Some(Value::Int(v)),
                Err(_) => s.parse::<f64>().ok().map(Value::Float),
            }
        }
        (ColumnKind::Float, v) => match v {
            Value::Text(s) => s.trim().parse::<f64>().ok().map(Value::Float),
            other => other.as_f64().map(Value::Float),
        },
        (ColumnKind::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
        (ColumnKind::Bool, Value::Int(0)) => Some(Value::Bool(false)),
        (ColumnKind::Bool, Value::Int(1)) => Some(Value::Bool(true)),
        (ColumnKind::Bool, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" | "no" => Some(Value::Bool(false)),
            "1" | "true" | "yes" => Some(Value::Bool(true)),
            _ => None,
        },
        (ColumnKind::Enum(_), Value::Int(v)) => Some(Value::Int(*v)),
        (ColumnKind::Enum(domain), Value::Text(s)) => domain.parse(s).map(Value::Int),
        _ => None,
    };

    coerced.ok_or_else(|| invalid(&operand))
}

/// Boolean predicate over rows.
///
/// Build trees through [`FilterNode::leaf`], [`FilterNode::and`],
/// [`FilterNode::or`] and [`FilterNode::not`]; the combinators reject empty
/// child lists so that every `And`/`Or` seen during evaluation has at least
/// one child.
#[derive(Debug, Clone)]
pub enum FilterNode {
    Leaf(Leaf),
    Not(Box<FilterNode>),
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
}

impl FilterNode {
    pub fn leaf(
        schema: &Schema,
        column: &str,
        operator: Operator,
        operand: impl Into<Value>,
    ) -> Result<Self> {
        Leaf::new(schema, column, operator, operand).map(FilterNode::Leaf)
    }

    pub fn not(child: FilterNode) -> Self {
        FilterNode::Not(Box::new(child))
    }

    pub fn and(children: Vec<FilterNode>) -> Result<Self> {
        if children.is_empty() {
            return Err(FilterError::EmptyConjunction);
        }
        Ok(FilterNode::And(children))
    }

    pub fn or(children: Vec<FilterNode>) -> Result<Self> {
        if children.is_empty() {
            return Err(FilterError::EmptyDisjunction);
        }
        Ok(FilterNode::Or(children))
    }

    /// Evaluates the predicate against one row. Children of `And`/`Or` are
    /// visited in order and evaluation stops at the first deciding child.
    pub fn accepts<R: Row + ?Sized>(&self, row: &R) -> bool {
        match self {
            FilterNode::Leaf(leaf) => leaf.test(&row.get(leaf.column.id)),
            FilterNode::Not(child) => !child.accepts(row),
            FilterNode::And(children) => children.iter().all(|c| c.accepts(row)),
            FilterNode::Or(children) => children.iter().any(|c| c.accepts(row)),
        }
    }

    /// Tries to express the whole predicate as "the bit of the row's value
    /// in `column` is set in `mask`".
    ///
    /// On success `mask` is narrowed to the admissible values and `true` is
    /// returned. On failure `mask` is left as it was and the caller has to
    /// fall back to [`FilterNode::accepts`].
    pub fn optimize_bitmask(&self, column: &str, mask: &mut Bitmask) -> bool {
        match self {
            FilterNode::Leaf(leaf) => match leaf.admitted_bits(column) {
                Some(bits) => {
                    *mask &= bits;
                    true
                }
                None => false,
            },
            FilterNode::Not(child) => {
                let mut inner = Bitmask::ALL;
                if !child.optimize_bitmask(column, &mut inner) {
                    return false;
                }
                let valid = child.bit_domain(column).unwrap_or(Bitmask::ALL);
                *mask &= !inner & valid;
                true
            }
            FilterNode::And(children) => {
                let mut acc = Bitmask::ALL;
                for child in children {
                    if !child.optimize_bitmask(column, &mut acc) {
                        return false;
                    }
                }
                *mask &= acc;
                true
            }
            FilterNode::Or(children) => {
                // Every child must be a bit test on the same column.
                let mut acc = Bitmask::EMPTY;
                for child in children {
                    let mut scratch = Bitmask::ALL;
                    if !child.optimize_bitmask(column, &mut scratch) {
                        return false;
                    }
                    acc |= scratch;
                }
                *mask &= acc;
                true
            }
        }
    }

    /// Full mask of `column`'s domain, taken from the first leaf on it.
    fn bit_domain(&self, column: &str) -> Option<Bitmask> {
        match self {
            FilterNode::Leaf(leaf) if leaf.column.name == column => {
                leaf.column.kind.bit_domain().map(|d| d.full_mask())
            }
            FilterNode::Leaf(_) => None,
            FilterNode::Not(child) => child.bit_domain(column),
            FilterNode::And(children) | FilterNode::Or(children) => {
                children.iter().find_map(|c| c.bit_domain(column))
            }
        }
    }

    /// Every leaf of the tree, depth first.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            FilterNode::Leaf(leaf) => out.push(leaf),
            FilterNode::Not(child) => child.collect_leaves(out),
            FilterNode::And(children) | FilterNode::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}
