use crate::collaborators::event_store::EventStore;
use crate::trace_tree::parent_index::ParentIndex;
use crate::trace_tree::{ResolvedTrace, TraceSerializer, TraceViewError};
use api_structs::trace_view::TraceNode;
use api_structs::EventId;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Root, the requested event and its direct children.
///
/// The requested event only gets a parent when it is a direct child of the root, finding the
/// real parent would need walking the whole tree.
#[derive(Debug, Clone)]
pub struct LightTraceSerializer {
    event_id: Option<EventId>,
}

impl LightTraceSerializer {
    pub fn new(event_id: Option<EventId>) -> Self {
        Self { event_id }
    }
}

#[async_trait]
impl TraceSerializer for LightTraceSerializer {
    #[instrument(skip_all, fields(trace=%trace.context.trace_id))]
    async fn serialize(
        &self,
        trace: &ResolvedTrace,
        event_store: &dyn EventStore,
    ) -> Result<Vec<TraceNode>, TraceViewError> {
        let root = &trace.root;
        let parent_index = ParentIndex::build(&trace.rows);
        let mut nodes = vec![root.to_root_node()];

        let focal = self
            .event_id
            .as_ref()
            .and_then(|event_id| trace.rows.iter().find(|row| &row.event_id == event_id))
            .ok_or(TraceViewError::FocalEventNotFound)?;

        if root.event_id != focal.event_id {
            let root_detail = event_store
                .get_event_by_id(root.project_id, &root.event_id)
                .await?;
            let parent_event_id = root_detail
                .recorded_span(&focal.parent_span_id)
                .map(|_| root.event_id.clone());
            debug!(
                "Focal event parent resolved to root: {}",
                parent_event_id.is_some()
            );
            nodes.push(focal.to_node(parent_event_id));
        }

        let focal_detail = event_store
            .get_event_by_id(focal.project_id, &focal.event_id)
            .await?;
        for span in &focal_detail.spans {
            if let Some(child) = parent_index.child_of(&span.span_id) {
                nodes.push(child.to_node(Some(focal.event_id.clone())));
            }
        }
        Ok(nodes)
    }
}
