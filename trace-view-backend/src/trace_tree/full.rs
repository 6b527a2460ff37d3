use crate::collaborators::event_store::EventStore;
use crate::trace_tree::parent_index::ParentIndex;
use crate::trace_tree::{ResolvedTrace, TraceRow, TraceSerializer, TraceViewError, MAX_TRACE_SIZE};
use api_structs::trace_view::TraceNode;
use async_trait::async_trait;
use std::collections::VecDeque;
use tracing::{debug, instrument, warn};

/// Every transaction reachable from the root, breadth first.
///
/// Rows are taken out of the parent index as soon as they get a parent, so each row is attached
/// at most once and span loops in the stored events can't be followed around.
#[derive(Debug, Clone, Default)]
pub struct FullTraceSerializer;

#[async_trait]
impl TraceSerializer for FullTraceSerializer {
    #[instrument(skip_all, fields(trace=%trace.context.trace_id, rows=trace.rows.len()))]
    async fn serialize(
        &self,
        trace: &ResolvedTrace,
        event_store: &dyn EventStore,
    ) -> Result<Vec<TraceNode>, TraceViewError> {
        let mut parent_index = ParentIndex::build(&trace.rows);
        debug!("{} rows have a parent span", parent_index.len());
        let mut nodes = vec![trace.root.to_root_node()];
        let mut to_check: VecDeque<&TraceRow> = VecDeque::from([&trace.root]);
        let mut iteration = 0;
        while let Some(current) = to_check.pop_front() {
            let detail = event_store
                .get_event_by_id(current.project_id, &current.event_id)
                .await?;
            for span in &detail.spans {
                if let Some(child) = parent_index.take_child_of(&span.span_id) {
                    nodes.push(child.to_node(Some(current.event_id.clone())));
                    to_check.push_back(child);
                }
            }
            iteration += 1;
            if iteration > MAX_TRACE_SIZE && !to_check.is_empty() {
                warn!(
                    trace = %trace.context.trace_id,
                    organization = %trace.context.organization,
                    extra_roots = trace.context.extra_roots,
                    pending = to_check.len(),
                    "discover.trace-view.surpassed-trace-limit"
                );
                break;
            }
        }
        debug!("Expanded {iteration} transactions into {} nodes", nodes.len());
        Ok(nodes)
    }
}
