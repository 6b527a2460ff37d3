use crate::api::state::AppState;
use crate::api::ApiError;
use crate::collaborators::search::QueryScope;
use crate::trace_tree::{
    is_valid_trace_id, resolve_root, FullTraceSerializer, LightTraceSerializer, RootResolution,
    TraceContext, TraceSerializer, TraceViewError,
};
use api_structs::time_conversion::resolve_time_window;
use api_structs::trace_view::{TraceNode, TraceViewQuery};
use api_structs::OrganizationSlug;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, instrument, Span};

#[derive(Debug)]
pub enum TraceViewResponse {
    NotFound,
    /// Trace exists but has no root in the queried window
    NoContent,
    Nodes(Vec<TraceNode>),
}

impl IntoResponse for TraceViewResponse {
    fn into_response(self) -> Response {
        match self {
            TraceViewResponse::NotFound => StatusCode::NOT_FOUND.into_response(),
            TraceViewResponse::NoContent => StatusCode::NO_CONTENT.into_response(),
            TraceViewResponse::Nodes(nodes) => Json(nodes).into_response(),
        }
    }
}

#[instrument(
    level = "error",
    skip_all,
    err(Debug),
    fields(trace_id=%trace_id, organization=%organization, query.error_reason=tracing::field::Empty)
)]
pub(crate) async fn trace_light_get(
    Path((organization, trace_id)): Path<(OrganizationSlug, String)>,
    Query(query): Query<TraceViewQuery>,
    State(app_state): State<AppState>,
) -> Result<TraceViewResponse, ApiError> {
    let serializer = LightTraceSerializer::new(query.event_id.clone());
    trace_view(&app_state, organization, trace_id, query, &serializer).await
}

#[instrument(
    level = "error",
    skip_all,
    err(Debug),
    fields(trace_id=%trace_id, organization=%organization)
)]
pub(crate) async fn trace_full_get(
    Path((organization, trace_id)): Path<(OrganizationSlug, String)>,
    Query(query): Query<TraceViewQuery>,
    State(app_state): State<AppState>,
) -> Result<TraceViewResponse, ApiError> {
    trace_view(&app_state, organization, trace_id, query, &FullTraceSerializer).await
}

async fn trace_view(
    app_state: &AppState,
    organization: OrganizationSlug,
    trace_id: String,
    query: TraceViewQuery,
    serializer: &dyn TraceSerializer,
) -> Result<TraceViewResponse, ApiError> {
    if !is_valid_trace_id(&trace_id) {
        return Ok(TraceViewResponse::NotFound);
    }
    if query.project.is_empty() {
        info!("No projects in scope, nothing to look at");
        return Ok(TraceViewResponse::Nodes(vec![]));
    }
    let (start, end) = resolve_time_window(
        query.start,
        query.end,
        query.stats_period.as_deref(),
        chrono::Utc::now(),
    )
    .map_err(|message| ApiError {
        code: StatusCode::BAD_REQUEST,
        message,
    })?;
    let scope = QueryScope {
        organization: organization.clone(),
        project_ids: query.project,
        start,
        end,
    };
    let context = TraceContext::new(trace_id, organization);
    match resolve_root(app_state.search.as_ref(), scope, context).await? {
        RootResolution::NotFound => Ok(TraceViewResponse::NotFound),
        RootResolution::RootMissing => Ok(TraceViewResponse::NoContent),
        RootResolution::Found(trace) => {
            let nodes = serializer
                .serialize(&trace, app_state.event_store.as_ref())
                .await
                .map_err(|e| {
                    if matches!(e, TraceViewError::FocalEventNotFound) {
                        Span::current().record("query.error_reason", "Matching event not found");
                    }
                    e
                })?;
            info!("Returning {} nodes", nodes.len());
            Ok(TraceViewResponse::Nodes(nodes))
        }
    }
}
