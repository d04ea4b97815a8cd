use crate::bitmask::Bitmask;
use crate::filter::FilterNode;
use crate::schema::{ColumnDef, Row, Schema};
use tracing::debug;

/// A filter prepared for evaluation over many rows.
///
/// If the whole predicate reduces to a membership test on one enum or flag
/// column, rows are checked with a single mask lookup; otherwise the tree is
/// walked for every row.
#[derive(Debug, Clone)]
pub enum CompiledFilter {
    AcceptAll,
    Mask { column: ColumnDef, mask: Bitmask },
    Tree(FilterNode),
}

impl CompiledFilter {
    pub fn compile(filter: Option<FilterNode>, schema: &Schema) -> Self {
        let Some(filter) = filter else {
            return CompiledFilter::AcceptAll;
        };

        let referenced: Vec<&str> = filter.leaves().iter().map(|l| l.column().name.as_str()).collect();
        for column in schema.bit_columns().filter(|c| referenced.contains(&c.name.as_str())) {
            let mut mask = Bitmask::ALL;
            if filter.optimize_bitmask(&column.name, &mut mask) {
                debug!(column = %column.name, %mask, "Filter compiled to bitmask");
                return CompiledFilter::Mask {
                    column: column.clone(),
                    mask,
                };
            }
        }

        debug!(leaves = referenced.len(), "Filter evaluated per row");
        CompiledFilter::Tree(filter)
    }

    pub fn matches<R: Row + ?Sized>(&self, row: &R) -> bool {
        match self {
            CompiledFilter::AcceptAll => true,
            CompiledFilter::Mask { column, mask } => column
                .kind
                .bit_of(&row.get(column.id))
                .is_some_and(|bit| mask.contains_bit(bit)),
            CompiledFilter::Tree(filter) => filter.accepts(row),
        }
    }

    /// Drops the rows the filter rejects, keeping the order of the rest.
    pub fn retain<R: Row>(&self, rows: &mut Vec<R>) {
        if matches!(self, CompiledFilter::AcceptAll) {
            return;
        }
        rows.retain(|row| self.matches(row));
    }

    pub fn is_bitmask(&self) -> bool {
        matches!(self, CompiledFilter::Mask { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;
    use crate::schema::{ColumnId, ColumnKind, EnumDomain};
    use crate::value::Value;

    const STATES: EnumDomain = EnumDomain::new(0, &["UP", "DOWN", "UNREACHABLE"]);

    #[derive(Debug, PartialEq)]
    struct HostRow(i64, &'static str);

    impl Row for HostRow {
        fn get(&self, column: ColumnId) -> Value {
            match column.0 {
                0 => Value::Int(self.0),
                1 => Value::Text(self.1.to_string()),
                other => panic!("unexpected column {other}"),
            }
        }
    }

    fn schema() -> Schema {
        Schema::new()
            .with_column("state", "Host state", ColumnKind::Enum(STATES))
            .with_column("name", "Host name", ColumnKind::Text)
    }

    #[test]
    fn test_no_filter_accepts_all() {
        let compiled = CompiledFilter::compile(None, &schema());
        assert!(compiled.matches(&HostRow(2, "x")));
    }

    #[test]
    fn test_state_filter_uses_mask() {
        let s = schema();
        let filter = FilterNode::or(vec![
            FilterNode::leaf(&s, "state", Operator::Equal, "DOWN").unwrap(),
            FilterNode::leaf(&s, "state", Operator::Equal, "UNREACHABLE").unwrap(),
        ])
        .unwrap();
        let compiled = CompiledFilter::compile(Some(filter), &s);
        assert!(compiled.is_bitmask());

        let mut rows = vec![HostRow(0, "a"), HostRow(1, "b"), HostRow(2, "c")];
        compiled.retain(&mut rows);
        assert_eq!(rows, vec![HostRow(1, "b"), HostRow(2, "c")]);
    }

    #[test]
    fn test_mixed_filter_falls_back_to_tree() {
        let s = schema();
        let filter = FilterNode::and(vec![
            FilterNode::leaf(&s, "state", Operator::Equal, "UP").unwrap(),
            FilterNode::leaf(&s, "name", Operator::Matches, "^a").unwrap(),
        ])
        .unwrap();
        let compiled = CompiledFilter::compile(Some(filter), &s);
        assert!(!compiled.is_bitmask());

        let mut rows = vec![HostRow(0, "alpha"), HostRow(0, "beta"), HostRow(1, "apex")];
        compiled.retain(&mut rows);
        assert_eq!(rows, vec![HostRow(0, "alpha")]);
    }
}
