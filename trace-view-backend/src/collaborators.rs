use api_structs::{EventId, ProjectId};
use backtraced_error::{ReqwestError, SerdeJsonError};

pub mod event_store;
pub mod search;

/// Failure talking to the search service or the event store
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("request to collaborator failed")]
    Request(#[from] ReqwestError),
    #[error("collaborator answered with an unexpected payload")]
    Decode(#[from] SerdeJsonError),
    #[error("search service rejected the query: {0}")]
    InvalidQuery(String),
    #[error("event {event_id} of project {project_id} not found in the event store")]
    EventNotFound {
        project_id: ProjectId,
        event_id: EventId,
    },
}

pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ReqwestError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ReqwestError::from_reqwest_error(e, "building collaborator http client"))
}

/// Reads the whole body and decodes it, keeping a sample of the body if decoding fails
pub(crate) async fn decode_json_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, CollaboratorError> {
    let body = response
        .text()
        .await
        .map_err(|e| ReqwestError::from_reqwest_error(e, format!("reading body of {context}")))?;
    let decoded = serde_json::from_str(&body).map_err(|e| {
        SerdeJsonError::from_serde_json_error(e, format!("decoding body of {context}"), &body)
    })?;
    Ok(decoded)
}

/// Spins up a throwaway http server standing in for a collaborator
#[cfg(test)]
pub(crate) async fn spawn_fake_collaborator(app: axum::Router) -> String {
    let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(app.into_make_service());
    let address = server.local_addr();
    tokio::spawn(async move { server.await.unwrap() });
    format!("http://{address}")
}
