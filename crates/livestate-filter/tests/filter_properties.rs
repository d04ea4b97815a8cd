//! Property tests: tree evaluation against an independent evaluator, and
//! bitmask reduction against tree evaluation.

use livestate_filter::{
    Bitmask, ColumnId, ColumnKind, EnumDomain, FilterNode, Operator, Row, Schema, Value,
};
use proptest::prelude::*;

const LEVELS: EnumDomain = EnumDomain::new(-1, &["NONE", "LOW", "MID", "HIGH", "MAX"]);
const COLORS: EnumDomain = EnumDomain::new(0, &["RED", "GREEN", "BLUE"]);

const COLUMNS: [&str; 3] = ["level", "color", "count"];

fn schema() -> Schema {
    Schema::new()
        .with_column("level", "Level", ColumnKind::Enum(LEVELS))
        .with_column("color", "Color", ColumnKind::Enum(COLORS))
        .with_column("count", "Count", ColumnKind::Int)
}

#[derive(Debug, Clone, Copy)]
struct TestRow {
    level: i64,
    color: i64,
    count: i64,
}

impl Row for TestRow {
    fn get(&self, column: ColumnId) -> Value {
        match column.0 {
            0 => Value::Int(self.level),
            1 => Value::Int(self.color),
            2 => Value::Int(self.count),
            other => panic!("column {other} not in schema"),
        }
    }
}

/// Plain description of a tree, interpreted independently of the crate.
#[derive(Debug, Clone)]
enum Spec {
    Leaf { column: usize, op: Operator, operand: i64 },
    Not(Box<Spec>),
    And(Vec<Spec>),
    Or(Vec<Spec>),
}

impl Spec {
    fn build(&self, schema: &Schema) -> FilterNode {
        match self {
            Spec::Leaf { column, op, operand } => {
                FilterNode::leaf(schema, COLUMNS[*column], *op, *operand).unwrap()
            }
            Spec::Not(child) => FilterNode::not(child.build(schema)),
            Spec::And(children) => {
                FilterNode::and(children.iter().map(|c| c.build(schema)).collect()).unwrap()
            }
            Spec::Or(children) => {
                FilterNode::or(children.iter().map(|c| c.build(schema)).collect()).unwrap()
            }
        }
    }

    fn eval(&self, row: &TestRow) -> bool {
        match self {
            Spec::Leaf { column, op, operand } => {
                let v = match column {
                    0 => row.level,
                    1 => row.color,
                    _ => row.count,
                };
                match op {
                    Operator::Equal => v == *operand,
                    Operator::NotEqual => v != *operand,
                    Operator::Less => v < *operand,
                    Operator::LessOrEqual => v <= *operand,
                    Operator::Greater => v > *operand,
                    Operator::GreaterOrEqual => v >= *operand,
                    _ => unreachable!("only ordering operators are generated"),
                }
            }
            Spec::Not(child) => !child.eval(row),
            Spec::And(children) => {
                let mut result = true;
                for c in children {
                    result = result && c.eval(row);
                }
                result
            }
            Spec::Or(children) => {
                let mut result = false;
                for c in children {
                    result = result || c.eval(row);
                }
                result
            }
        }
    }
}

fn operator() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Equal),
        Just(Operator::NotEqual),
        Just(Operator::Less),
        Just(Operator::LessOrEqual),
        Just(Operator::Greater),
        Just(Operator::GreaterOrEqual),
    ]
}

fn tree(columns: std::ops::Range<usize>) -> impl Strategy<Value = Spec> {
    let leaf = (columns, operator(), -2i64..6)
        .prop_map(|(column, op, operand)| Spec::Leaf { column, op, operand });
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|c| Spec::Not(Box::new(c))),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Spec::And),
            prop::collection::vec(inner, 1..4).prop_map(Spec::Or),
        ]
    })
}

fn row() -> impl Strategy<Value = TestRow> {
    (-1i64..4, 0i64..3, -3i64..8).prop_map(|(level, color, count)| TestRow {
        level,
        color,
        count,
    })
}

proptest! {
    #[test]
    fn accepts_matches_reference(spec in tree(0..3), rows in prop::collection::vec(row(), 1..16)) {
        let schema = schema();
        let filter = spec.build(&schema);
        for r in &rows {
            prop_assert_eq!(filter.accepts(r), spec.eval(r), "row {:?}", r);
        }
    }

    #[test]
    fn single_column_trees_always_reduce(spec in tree(0..1)) {
        let filter = spec.build(&schema());
        let mut mask = Bitmask::ALL;
        prop_assert!(filter.optimize_bitmask("level", &mut mask));
        prop_assert_eq!(mask & !LEVELS.full_mask(), Bitmask::EMPTY);
    }

    #[test]
    fn bitmask_agrees_with_accepts(spec in tree(0..2), incoming in any::<u32>(), color in 0i64..3, count in -3i64..8) {
        let filter = spec.build(&schema());
        let mut mask = Bitmask(incoming);
        if filter.optimize_bitmask("level", &mut mask) {
            for level in -1i64..4 {
                let r = TestRow { level, color, count };
                let bit = LEVELS.bit_of(level).unwrap();
                let admitted = Bitmask(incoming).contains_bit(bit) && filter.accepts(&r);
                prop_assert_eq!(mask.contains_bit(bit), admitted, "level {}", level);
            }
        } else {
            prop_assert_eq!(mask, Bitmask(incoming));
        }
    }

    #[test]
    fn mixed_or_never_reduces(level_op in operator(), level in -1i64..4, color in 0i64..3) {
        let schema = schema();
        let filter = FilterNode::or(vec![
            FilterNode::leaf(&schema, "level", level_op, level).unwrap(),
            FilterNode::leaf(&schema, "color", Operator::Equal, color).unwrap(),
        ]).unwrap();
        let mut mask = Bitmask::ALL;
        prop_assert!(!filter.optimize_bitmask("level", &mut mask));
        prop_assert_eq!(mask, Bitmask::ALL);
    }
}
