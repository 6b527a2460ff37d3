use crate::collaborators::{decode_json_body, http_client, CollaboratorError};
use api_structs::{EventId, ProjectId, SpanId};
use async_trait::async_trait;
use backtraced_error::ReqwestError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedSpan {
    pub span_id: SpanId,
}

/// Stored payload of a transaction, only the parts the trace views need
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetail {
    /// Spans recorded by the transaction itself, in recorded order
    #[serde(default)]
    pub spans: Vec<RecordedSpan>,
}

impl EventDetail {
    pub fn recorded_span(&self, span_id: &str) -> Option<&RecordedSpan> {
        self.spans.iter().find(|span| span.span_id == span_id)
    }
}

#[derive(Debug, Deserialize)]
struct StoredEvent {
    #[serde(default)]
    data: EventDetail,
}

/// Key value lookup of stored events
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event_by_id(
        &self,
        project_id: ProjectId,
        event_id: &str,
    ) -> Result<EventDetail, CollaboratorError>;
}

pub struct HttpEventStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEventStore {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ReqwestError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    #[instrument(skip(self), err(Debug))]
    async fn get_event_by_id(
        &self,
        project_id: ProjectId,
        event_id: &str,
    ) -> Result<EventDetail, CollaboratorError> {
        let response = self
            .client
            .get(format!(
                "{}/projects/{project_id}/events/{event_id}",
                self.base_url
            ))
            .send()
            .await
            .map_err(|e| {
                ReqwestError::from_reqwest_error(e, format!("fetching event {event_id}"))
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CollaboratorError::EventNotFound {
                project_id,
                event_id: EventId::from(event_id),
            });
        }
        let response = response.error_for_status().map_err(|e| {
            ReqwestError::from_reqwest_error(e, format!("event {event_id} status"))
        })?;
        let stored: StoredEvent = decode_json_body(response, "stored event").await?;
        Ok(stored.data)
    }
}
