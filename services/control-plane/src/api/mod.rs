//! HTTP API handlers and routing.

pub mod error;
mod health;
pub mod request_context;
mod v1;
mod v2;

use std::future::Future;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderName, Method},
    Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::state::AppState;
use crate::workers::WorkerError;

use self::error::ApiError;
use self::request_context::{RequestContext, REQUEST_ID_HEADER};

/// Prefix under which each API version serves a cluster's nodes.
const NODES_PATH: &str = "/projects/{project_id}/clusters/{cluster_id}/nodes";

/// Create the main API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_origin(Any);

    Router::new()
        .merge(health::routes())
        .nest("/v1", v1::routes())
        .nest("/v2", v2::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClusterPath {
    pub project_id: String,
    pub cluster_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodePath {
    pub project_id: String,
    pub cluster_id: String,
    pub node_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct NodeQuery {
    hide_initial_conditions: Option<String>,
}

impl NodeQuery {
    /// Unrecognised spellings read as `false` rather than failing the request.
    pub fn hide_initial_conditions(&self) -> bool {
        self.hide_initial_conditions
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(false)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

pub(crate) fn invalid_query(rejection: QueryRejection, ctx: &RequestContext) -> ApiError {
    ApiError::bad_request("validation_failed", rejection.body_text())
        .with_request_id(ctx.request_id.clone())
}

pub(crate) fn invalid_body(rejection: JsonRejection, ctx: &RequestContext) -> ApiError {
    ApiError::bad_request("validation_failed", rejection.body_text())
        .with_request_id(ctx.request_id.clone())
}

/// Run a worker operation under the configured request deadline.
///
/// Failures are logged here with their full cause and converted into
/// problem responses carrying the request id.
pub(crate) async fn within_deadline<T, F>(
    state: &AppState,
    ctx: &RequestContext,
    operation: &'static str,
    fut: F,
) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, WorkerError>>,
{
    let timeout = state.request_timeout();
    let result = match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(WorkerError::Timeout(timeout)),
    };

    result.map_err(|err| {
        match &err {
            WorkerError::NotFound { .. } | WorkerError::Validation(_) | WorkerError::Conflict(_) => {
                warn!(request_id = %ctx.request_id, operation, code = err.code(), error = %err, "request rejected");
            }
            WorkerError::Upstream(source) => {
                error!(request_id = %ctx.request_id, operation, code = err.code(), error = %source, "cluster store failed");
            }
            WorkerError::Templating(_) | WorkerError::Timeout(_) => {
                error!(request_id = %ctx.request_id, operation, code = err.code(), error = %err, "request failed");
            }
        }
        ApiError::from(err).with_request_id(ctx.request_id.clone())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use chrono::Utc;
    use fleet_reconcile::MemoryStore;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use rstest::rstest;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::fixtures::{cluster, condition, datacenter, node, with_conditions};
    use crate::model::{Machine, CONDITION_READY};
    use crate::provider::{
        ClusterHandle, ClusterProvider, DefaultMachineTemplater, InMemoryClusterProvider,
    };

    /// Provider that never answers within a test deadline.
    struct StalledProvider;

    #[async_trait]
    impl ClusterProvider for StalledProvider {
        async fn cluster(&self, _: &str, _: &str) -> Result<ClusterHandle, WorkerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(WorkerError::not_found("Cluster", "stalled"))
        }

        async fn clusters(&self) -> Vec<ClusterHandle> {
            Vec::new()
        }
    }

    fn router(clusters: Arc<dyn ClusterProvider>, timeout: Duration) -> Router {
        create_router(AppState::new(
            clusters,
            Arc::new(DefaultMachineTemplater),
            timeout,
        ))
    }

    /// Cluster `c7kx9` in project `prj-1` with one node that registered
    /// just now and is not ready yet.
    fn fresh_cluster() -> Arc<dyn ClusterProvider> {
        let mut fresh = node("node-5", "n-5");
        fresh.metadata.creation_timestamp = Some(Time(Utc::now()));
        let fresh = with_conditions(
            fresh,
            vec![condition(CONDITION_READY, "False", "KubeletNotReady", "runtime not ready")],
        );

        let mut provider = InMemoryClusterProvider::new();
        provider.insert(ClusterHandle {
            cluster: cluster(),
            datacenter: datacenter(),
            machines: Arc::new(MemoryStore::<Machine>::new()),
            nodes: Arc::new(MemoryStore::with_objects([fresh])),
            roles: Arc::new(MemoryStore::new()),
            role_bindings: Arc::new(MemoryStore::new()),
        });
        Arc::new(provider)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(REQUEST_ID_HEADER, "req-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, serde_json::from_slice(&body).unwrap())
    }

    async fn problem(router: Router, uri: &str) -> (StatusCode, Value) {
        let (status, content_type, body) = get(router, uri).await;
        assert_eq!(content_type.as_deref(), Some("application/problem+json"));
        (status, body)
    }

    #[tokio::test]
    async fn test_expired_deadline_is_gateway_timeout() {
        let router = router(Arc::new(StalledProvider), Duration::from_millis(20));

        let (status, body) = problem(router, "/v2/projects/p/clusters/c/nodes").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["code"], "deadline_exceeded");
        assert_eq!(body["retryable"], true);
        assert_eq!(body["request_id"], "req-7");
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some("true"), true)]
    #[case(Some("1"), true)]
    #[case(Some("t"), true)]
    #[case(Some("T"), true)]
    #[case(Some("TRUE"), true)]
    #[case(Some("True"), true)]
    #[case(Some("false"), false)]
    #[case(Some("0"), false)]
    #[case(Some("F"), false)]
    #[case(Some("False"), false)]
    #[case(Some("maybe"), false)]
    #[case(Some("yes"), false)]
    #[case(Some(""), false)]
    fn test_hide_flag_spellings(#[case] raw: Option<&str>, #[case] expected: bool) {
        let query = NodeQuery {
            hide_initial_conditions: raw.map(str::to_string),
        };
        assert_eq!(query.hide_initial_conditions(), expected);
    }

    #[rstest]
    #[case("v2", "1", "")]
    #[case("v2", "True", "")]
    #[case("v1", "t", "")]
    #[case("v2", "0", "KubeletNotReady")]
    #[case("v1", "maybe", "KubeletNotReady")]
    #[tokio::test]
    async fn test_hide_flag_is_lenient_over_http(
        #[case] version: &str,
        #[case] flag: &str,
        #[case] error_reason: &str,
    ) {
        let router = router(fresh_cluster(), Duration::from_secs(5));

        let (status, _, body) = get(
            router,
            &format!("/{version}/projects/prj-1/clusters/c7kx9/nodes?hideInitialConditions={flag}"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["status"]["errorReason"], error_reason);
    }

    #[tokio::test]
    async fn test_repeated_query_parameter_is_validation_failure() {
        let router = router(fresh_cluster(), Duration::from_secs(5));

        let (status, body) = problem(
            router,
            "/v2/projects/prj-1/clusters/c7kx9/nodes?hideInitialConditions=1&hideInitialConditions=0",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_failed");
        assert_eq!(body["request_id"], "req-7");
    }
}
