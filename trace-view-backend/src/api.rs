use crate::api::state::AppState;
use crate::collaborators::CollaboratorError;
use crate::trace_tree::TraceViewError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backtraced_error::error_chain_to_pretty_formatted;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

pub mod handlers;
pub mod state;

#[derive(Debug)]
pub struct ApiError {
    pub code: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code, self.message).into_response()
    }
}

impl From<CollaboratorError> for ApiError {
    fn from(value: CollaboratorError) -> Self {
        match value {
            CollaboratorError::InvalidQuery(reason) => ApiError {
                code: StatusCode::BAD_REQUEST,
                message: format!("Invalid query: {reason}"),
            },
            other => {
                error!(
                    "Error during api request: {}",
                    error_chain_to_pretty_formatted(&other)
                );
                ApiError {
                    code: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Error fetching trace data when handling the request".to_string(),
                }
            }
        }
    }
}

impl From<TraceViewError> for ApiError {
    fn from(value: TraceViewError) -> Self {
        match value {
            TraceViewError::FocalEventNotFound => ApiError {
                code: StatusCode::BAD_REQUEST,
                message: value.to_string(),
            },
            TraceViewError::Collaborator(e) => ApiError::from(e),
        }
    }
}

pub fn app(app_state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/api/ready", axum::routing::get(handlers::ready))
        .route(
            "/api/organizations/:organization/events-trace-light/:trace_id",
            axum::routing::get(handlers::trace::trace_light_get),
        )
        .route(
            "/api/organizations/:organization/events-trace/:trace_id",
            axum::routing::get(handlers::trace::trace_full_get),
        )
        .with_state(app_state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::very_permissive())
}

#[instrument(skip_all)]
pub fn start(app_state: AppState, api_port: u16) -> JoinHandle<()> {
    info!("Starting API on port {api_port}");
    let app = app(app_state);
    tokio::spawn(async move {
        let address = SocketAddr::from(([0, 0, 0, 0], api_port));
        if let Err(e) = axum::Server::bind(&address)
            .serve(app.into_make_service())
            .await
        {
            error!("API server stopped: {e}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace_tree::test_support::{row, CapturedLogs, InMemoryEventStore, InMemorySearch};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;
    use tracing::instrument::WithSubscriber;

    const TRACE_ID: &str = "a7d67cf796774551a95be6543cacd459";

    fn state(search: InMemorySearch, event_store: InMemoryEventStore) -> AppState {
        AppState {
            search: Arc::new(search),
            event_store: Arc::new(event_store),
        }
    }

    /// root -> e1 -> e2
    fn chain_state() -> AppState {
        state(
            InMemorySearch::with_rows(vec![
                row("root", "r0", "", 10),
                row("e1", "a0", "r1", 11),
                row("e2", "b0", "a1", 12),
            ]),
            InMemoryEventStore::with_spans(&[
                ("root", &["r1"]),
                ("e1", &["a1"]),
                ("e2", &[]),
            ]),
        )
    }

    async fn get(app_state: AppState, uri: &str) -> (StatusCode, String) {
        let response = app(app_state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn get_with_logs(app_state: AppState, uri: &str) -> (StatusCode, CapturedLogs) {
        let logs = CapturedLogs::default();
        let (status, _) = get(app_state, uri)
            .with_subscriber(logs.subscriber())
            .await;
        (status, logs)
    }

    fn light_uri(query: &str) -> String {
        format!("/api/organizations/acme/events-trace-light/{TRACE_ID}?{query}")
    }

    fn full_uri(query: &str) -> String {
        format!("/api/organizations/acme/events-trace/{TRACE_ID}?{query}")
    }

    #[tokio::test]
    async fn full_view_returns_every_reachable_transaction() {
        let (status, body) = get(chain_state(), &full_uri("project=1&statsPeriod=24h")).await;
        assert_eq!(status, StatusCode::OK);
        let nodes: serde_json::Value = serde_json::from_str(&body).unwrap();
        insta::assert_json_snapshot!(nodes, @r###"
        [
          {
            "event_id": "root",
            "is_root": true,
            "parent_event_id": null,
            "project_id": 1,
            "span_id": "r0",
            "transaction": "/root"
          },
          {
            "event_id": "e1",
            "is_root": false,
            "parent_event_id": "root",
            "project_id": 1,
            "span_id": "a0",
            "transaction": "/e1"
          },
          {
            "event_id": "e2",
            "is_root": false,
            "parent_event_id": "e1",
            "project_id": 1,
            "span_id": "b0",
            "transaction": "/e2"
          }
        ]
        "###);
    }

    #[tokio::test]
    async fn light_view_returns_focal_neighbourhood() {
        let (status, body) = get(chain_state(), &light_uri("project=1&event_id=e1")).await;
        assert_eq!(status, StatusCode::OK);
        let nodes: Vec<api_structs::trace_view::TraceNode> = serde_json::from_str(&body).unwrap();
        let parents: Vec<(&str, Option<&str>)> = nodes
            .iter()
            .map(|n| (n.event_id.as_str(), n.parent_event_id.as_deref()))
            .collect();
        assert_eq!(
            parents,
            vec![("root", None), ("e1", Some("root")), ("e2", Some("e1"))]
        );
    }

    #[tokio::test]
    async fn unknown_trace_is_not_found_with_empty_body() {
        let app_state = state(InMemorySearch::default(), InMemoryEventStore::default());
        let (status, body) = get(app_state.clone(), &full_uri("project=1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
        let (status, _) = get(app_state, &light_uri("project=1&event_id=e1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn trace_without_root_is_no_content() {
        let app_state = state(
            InMemorySearch::with_rows(vec![row("only", "s1", "s0", 10)]),
            InMemoryEventStore::default(),
        );
        let (status, body) = get(app_state, &full_uri("project=1")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn trace_without_root_logs_trace_and_organization() {
        let app_state = state(
            InMemorySearch::with_rows(vec![row("only", "s1", "s0", 10)]),
            InMemoryEventStore::default(),
        );
        let (status, logs) = get_with_logs(app_state, &full_uri("project=1")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let warnings = logs.lines_with("discover.trace-view.root.not-found");
        assert_eq!(warnings.len(), 1, "{}", logs.contents());
        assert!(warnings[0].contains(&format!("trace={TRACE_ID}")));
        assert!(warnings[0].contains("organization=acme"));
    }

    #[tokio::test]
    async fn light_view_rejects_unknown_focal_event() {
        let (status, body) = get(chain_state(), &light_uri("project=1&event_id=nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "event matching requested id not found");
        let (status, _) = get(chain_state(), &light_uri("project=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_focal_event_tags_the_request_span() {
        let (status, logs) =
            get_with_logs(chain_state(), &light_uri("project=1&event_id=nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let tagged = logs.lines_with("query.error_reason");
        assert!(!tagged.is_empty(), "{}", logs.contents());
        assert!(tagged[0].contains("Matching event not found"));

        let (status, logs) = get_with_logs(chain_state(), &light_uri("project=1&event_id=e1")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(logs.lines_with("Matching event not found").is_empty());
    }

    #[tokio::test]
    async fn full_view_ignores_event_id() {
        let (status, body) = get(chain_state(), &full_uri("project=1&event_id=nope")).await;
        assert_eq!(status, StatusCode::OK);
        let nodes: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(nodes.len(), 3);
    }

    #[tokio::test]
    async fn empty_project_scope_returns_empty_list() {
        let (status, body) = get(chain_state(), &full_uri("")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn projects_outside_scope_are_not_seen() {
        let (status, _) = get(chain_state(), &full_uri("project=2,3")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_trace_id_is_not_found() {
        let (status, _) = get(
            chain_state(),
            "/api/organizations/acme/events-trace/not-a-trace?project=1",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_time_range_is_bad_request() {
        let (status, body) = get(chain_state(), &full_uri("project=1&statsPeriod=3y")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid statsPeriod: 3y");
        let (status, _) = get(
            chain_state(),
            &full_uri("project=1&start=2021-01-01T00:00:00Z"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_period_past_representable_dates_is_bad_request() {
        let (status, body) = get(
            chain_state(),
            &full_uri("project=1&statsPeriod=100000000d"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid statsPeriod: 100000000d");
    }

    #[tokio::test]
    async fn rejected_search_query_is_bad_request() {
        let app_state = state(
            InMemorySearch {
                invalid_query: true,
                ..Default::default()
            },
            InMemoryEventStore::default(),
        );
        let (status, _) = get(app_state, &full_uri("project=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_stored_event_is_server_error() {
        tracing_config_helper::setup_tracing_console_logging_for_test();
        let app_state = state(
            InMemorySearch::with_rows(vec![row("root", "r0", "", 10)]),
            InMemoryEventStore::default(),
        );
        let (status, body) = get(app_state, &full_uri("project=1")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error fetching trace data when handling the request");
    }

    #[tokio::test]
    async fn ready_answers() {
        let (status, body) = get(chain_state(), "/api/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
