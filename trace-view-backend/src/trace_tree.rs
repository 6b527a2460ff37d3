//! Rebuilds the parent/child tree of the transactions of a distributed trace.
//!
//! Rows come from the search service, one per transaction. A row only knows the span id its
//! parent recorded, so children are found by asking each parent's stored event which spans it
//! recorded and matching those against the `parent_span_id` of the rows.

use crate::collaborators::event_store::EventStore;
use crate::collaborators::CollaboratorError;
use api_structs::trace_view::TraceNode;
use api_structs::{EventId, OrganizationSlug, ProjectId, SpanId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub mod full;
pub mod light;
pub mod parent_index;
pub mod root;

pub use full::FullTraceSerializer;
pub use light::LightTraceSerializer;
pub use root::{resolve_root, ResolvedTrace, RootResolution};

/// Maximum rows fetched for a trace and maximum expansions done by the full view
pub const MAX_TRACE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TraceRow {
    #[serde(rename = "id")]
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "transaction")]
    pub transaction_name: String,
    pub project_id: ProjectId,
    #[serde(rename = "trace.span")]
    pub span_id: SpanId,
    /// Empty for roots
    #[serde(rename = "trace.parent_span", default, deserialize_with = "empty_if_null")]
    pub parent_span_id: SpanId,
}

fn empty_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TraceRow {
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_empty()
    }

    pub fn to_root_node(&self) -> TraceNode {
        TraceNode {
            event_id: self.event_id.clone(),
            span_id: self.span_id.clone(),
            transaction: self.transaction_name.clone(),
            project_id: self.project_id,
            parent_event_id: None,
            is_root: true,
        }
    }

    pub fn to_node(&self, parent_event_id: Option<EventId>) -> TraceNode {
        TraceNode {
            event_id: self.event_id.clone(),
            span_id: self.span_id.clone(),
            transaction: self.transaction_name.clone(),
            project_id: self.project_id,
            parent_event_id,
            is_root: false,
        }
    }
}

/// Attached to every data quality warning about a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub organization: OrganizationSlug,
    pub extra_roots: usize,
}

impl TraceContext {
    pub fn new(trace_id: String, organization: OrganizationSlug) -> Self {
        Self {
            trace_id,
            organization,
            extra_roots: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceViewError {
    #[error("event matching requested id not found")]
    FocalEventNotFound,
    #[error("failed to fetch trace data")]
    Collaborator(#[from] CollaboratorError),
}

/// A way of walking a resolved trace into the nodes returned to the client
#[async_trait]
pub trait TraceSerializer: Send + Sync {
    async fn serialize(
        &self,
        trace: &ResolvedTrace,
        event_store: &dyn EventStore,
    ) -> Result<Vec<TraceNode>, TraceViewError>;
}

/// Trace ids are 32 hex chars, optionally dashed like a uuid, or plain numbers
pub fn is_valid_trace_id(trace_id: &str) -> bool {
    let is_hex_id = (32..=36).contains(&trace_id.len())
        && trace_id.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    let is_numeric_id = !trace_id.is_empty() && trace_id.chars().all(|c| c.is_ascii_digit());
    is_hex_id || is_numeric_id
}


#[test]
fn trace_id_validation() {
    assert!(is_valid_trace_id("a".repeat(32).as_str()));
    assert!(is_valid_trace_id("0123abcd-0123-abcd-0123-0123456789ab"));
    assert!(is_valid_trace_id("12345"));
    assert!(!is_valid_trace_id(""));
    assert!(!is_valid_trace_id("abc"));
    assert!(!is_valid_trace_id(&"g".repeat(32)));
    assert!(!is_valid_trace_id("a OR trace:b"));
}

#[test]
fn row_decodes_null_parent_as_root() {
    let row: TraceRow = serde_json::from_value(serde_json::json!({
        "id": "e1",
        "timestamp": "2021-01-01T10:00:00+00:00",
        "transaction": "/checkout",
        "project_id": 2,
        "trace.span": "aaaa",
        "trace.parent_span": null
    }))
    .unwrap();
    assert!(row.is_root());
    assert_eq!(row.to_root_node().parent_event_id, None);
}
