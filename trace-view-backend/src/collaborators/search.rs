use crate::collaborators::{decode_json_body, http_client, CollaboratorError};
use crate::trace_tree::{TraceRow, MAX_TRACE_SIZE};
use api_structs::{OrganizationSlug, ProjectId};
use async_trait::async_trait;
use backtraced_error::ReqwestError;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub const TRACE_COLUMNS: [&str; 7] = [
    "id",
    "timestamp",
    "transaction",
    "project_id",
    "trace.span",
    "trace.parent_span",
    "to_other(trace.parent_span, \"\", 0, 1) AS root",
];
/// Roots first, then newest, event id only keeps results stable
pub const TRACE_ORDER_BY: [&str; 3] = ["-root", "-timestamp", "id"];
pub const TRACE_REFERRER: &str = "api.trace-view.get_ids";

/// Projects and time window a query is allowed to look at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryScope {
    pub organization: OrganizationSlug,
    pub project_ids: Vec<ProjectId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverQuery {
    pub selected_columns: Vec<String>,
    pub query: String,
    pub orderby: Vec<String>,
    pub limit: usize,
    pub referrer: String,
    pub params: QueryScope,
}

impl DiscoverQuery {
    /// Every transaction of a trace, roots sorted first
    pub fn transactions_of_trace(trace_id: &str, scope: QueryScope) -> Self {
        Self {
            selected_columns: TRACE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            query: format!("event.type:transaction trace:{trace_id}"),
            orderby: TRACE_ORDER_BY.iter().map(|c| c.to_string()).collect(),
            limit: MAX_TRACE_SIZE,
            referrer: TRACE_REFERRER.to_string(),
            params: scope,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverResult {
    data: Vec<TraceRow>,
}

/// Event search service, answers discover queries with rows
#[async_trait]
pub trait TraceSearch: Send + Sync {
    async fn query(&self, query: DiscoverQuery) -> Result<Vec<TraceRow>, CollaboratorError>;
}

pub struct HttpTraceSearch {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTraceSearch {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ReqwestError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TraceSearch for HttpTraceSearch {
    #[instrument(skip_all, err(Debug), fields(filter=%query.query, referrer=%query.referrer))]
    async fn query(&self, query: DiscoverQuery) -> Result<Vec<TraceRow>, CollaboratorError> {
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&query)
            .send()
            .await
            .map_err(|e| ReqwestError::from_reqwest_error(e, "sending discover query"))?;
        if response.status() == StatusCode::BAD_REQUEST {
            let reason = response.text().await.map_err(|e| {
                ReqwestError::from_reqwest_error(e, "reading rejected discover query reason")
            })?;
            return Err(CollaboratorError::InvalidQuery(reason));
        }
        let response = response
            .error_for_status()
            .map_err(|e| ReqwestError::from_reqwest_error(e, "discover query status"))?;
        let result: DiscoverResult = decode_json_body(response, "discover query").await?;
        debug!("Got {} rows", result.data.len());
        Ok(result.data)
    }
}
