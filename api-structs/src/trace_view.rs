use crate::{EventId, ProjectId, SpanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::formats::CommaSeparator;
use serde_with::serde_as;
use serde_with::StringWithSeparator;

/// One transaction of a trace as returned by both trace views
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct TraceNode {
    pub event_id: EventId,
    pub span_id: SpanId,
    pub transaction: String,
    pub project_id: ProjectId,
    /// None for the root, and in the light view also for events whose parent wasn't resolved
    pub parent_event_id: Option<EventId>,
    pub is_root: bool,
}

/// Query string shared by the light and full trace views
#[serde_as]
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct TraceViewQuery {
    /// Projects the caller is allowed to see, comma separated
    #[serde_as(as = "StringWithSeparator::<CommaSeparator, ProjectId>")]
    #[serde(default)]
    pub project: Vec<ProjectId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(rename = "statsPeriod")]
    pub stats_period: Option<String>,
    /// Focal event, required by the light view
    pub event_id: Option<EventId>,
}
