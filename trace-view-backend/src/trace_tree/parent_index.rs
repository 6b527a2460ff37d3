use crate::trace_tree::TraceRow;
use std::collections::HashMap;

/// Rows of a trace keyed by the span id their parent recorded.
///
/// When several rows claim the same parent span the last one wins, a parent span can only
/// start one transaction.
#[derive(Debug)]
pub struct ParentIndex<'a> {
    rows_by_parent_span: HashMap<&'a str, &'a TraceRow>,
}

impl<'a> ParentIndex<'a> {
    pub fn build(rows: &'a [TraceRow]) -> Self {
        let rows_by_parent_span = rows
            .iter()
            .map(|row| (row.parent_span_id.as_str(), row))
            .collect();
        Self {
            rows_by_parent_span,
        }
    }

    /// Row started by `span_id`, if any
    pub fn child_of(&self, span_id: &str) -> Option<&'a TraceRow> {
        self.rows_by_parent_span.get(span_id).copied()
    }

    /// Like [`Self::child_of`] but the row can't be found again afterwards
    pub fn take_child_of(&mut self, span_id: &str) -> Option<&'a TraceRow> {
        self.rows_by_parent_span.remove(span_id)
    }

    pub fn len(&self) -> usize {
        self.rows_by_parent_span.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace_tree::test_support::row;

    #[test]
    fn duplicate_parent_spans_keep_last_row() {
        let rows = vec![
            row("root", "r0", "", 10),
            row("first", "f0", "r1", 9),
            row("second", "s0", "r1", 8),
        ];
        let index = ParentIndex::build(&rows);
        assert_eq!(index.len(), 2);
        assert_eq!(index.child_of("r1").unwrap().event_id, "second");
    }

    #[test]
    fn taken_rows_are_gone() {
        let rows = vec![row("root", "r0", "", 10), row("child", "c0", "r1", 9)];
        let mut index = ParentIndex::build(&rows);
        assert_eq!(index.take_child_of("r1").unwrap().event_id, "child");
        assert!(index.take_child_of("r1").is_none());
        assert!(index.child_of("r1").is_none());
        assert!(index.child_of("unknown").is_none());
    }
}
