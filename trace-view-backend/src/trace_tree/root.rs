use crate::collaborators::search::{DiscoverQuery, QueryScope, TraceSearch};
use crate::collaborators::CollaboratorError;
use crate::trace_tree::{TraceContext, TraceRow};
use std::cmp::Ordering;
use tracing::{debug, instrument, warn};

/// Rows of a trace that has a root, root first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrace {
    pub rows: Vec<TraceRow>,
    pub root: TraceRow,
    pub context: TraceContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootResolution {
    /// No transaction carries the trace id
    NotFound,
    /// The trace exists but none of its rows is a root
    RootMissing,
    Found(ResolvedTrace),
}

/// Root flag descending, timestamp descending, event id ascending
fn trace_order(a: &TraceRow, b: &TraceRow) -> Ordering {
    b.is_root()
        .cmp(&a.is_root())
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| a.event_id.cmp(&b.event_id))
}

#[instrument(skip_all, fields(trace=%context.trace_id, organization=%context.organization))]
pub async fn resolve_root(
    search: &dyn TraceSearch,
    scope: QueryScope,
    context: TraceContext,
) -> Result<RootResolution, CollaboratorError> {
    let query = DiscoverQuery::transactions_of_trace(&context.trace_id, scope);
    let rows = search.query(query).await?;
    debug!("Trace has {} transactions", rows.len());
    Ok(pick_root(rows, context))
}

pub fn pick_root(mut rows: Vec<TraceRow>, mut context: TraceContext) -> RootResolution {
    // the search service is asked for this order already, this keeps the choice independent of it
    rows.sort_by(trace_order);
    let root = match rows.first() {
        None => return RootResolution::NotFound,
        Some(first) if !first.is_root() => {
            warn!(
                trace = %context.trace_id,
                organization = %context.organization,
                "discover.trace-view.root.not-found"
            );
            return RootResolution::RootMissing;
        }
        Some(first) => first.clone(),
    };
    let extra_roots = rows.iter().skip(1).take_while(|row| row.is_root()).count();
    if extra_roots > 0 {
        context.extra_roots = extra_roots;
        warn!(
            trace = %context.trace_id,
            organization = %context.organization,
            extra_roots,
            "discover.trace-view.root.extra-found"
        );
    }
    RootResolution::Found(ResolvedTrace {
        rows,
        root,
        context,
    })
}
