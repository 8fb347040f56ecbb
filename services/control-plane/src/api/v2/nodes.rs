//! Node endpoints in the current shape.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::api::{invalid_body, invalid_query, within_deadline, ClusterPath, NodePath, NodeQuery};
use crate::state::AppState;
use crate::views::NodeView;
use crate::workers;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_nodes).post(create_node))
        .route("/{node_id}", get(get_node).delete(delete_node))
}

/// GET /v2/projects/{project_id}/clusters/{cluster_id}/nodes
async fn list_nodes(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<ClusterPath>,
    query: Result<Query<NodeQuery>, QueryRejection>,
) -> Result<Json<Vec<NodeView>>, ApiError> {
    let Query(query) = query.map_err(|e| invalid_query(e, &ctx))?;

    let nodes = within_deadline(&state, &ctx, "list_nodes", async {
        let cluster = state
            .clusters()
            .cluster(&path.project_id, &path.cluster_id)
            .await?;
        workers::list_workers(&cluster, query.hide_initial_conditions(), Utc::now()).await
    })
    .await?;

    Ok(Json(nodes))
}

/// GET /v2/projects/{project_id}/clusters/{cluster_id}/nodes/{node_id}
async fn get_node(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<NodePath>,
    query: Result<Query<NodeQuery>, QueryRejection>,
) -> Result<Json<NodeView>, ApiError> {
    let Query(query) = query.map_err(|e| invalid_query(e, &ctx))?;

    let node = within_deadline(&state, &ctx, "get_node", async {
        let cluster = state
            .clusters()
            .cluster(&path.project_id, &path.cluster_id)
            .await?;
        workers::get_worker(
            &cluster,
            &path.node_id,
            query.hide_initial_conditions(),
            Utc::now(),
        )
        .await
    })
    .await?;

    Ok(Json(node))
}

/// POST /v2/projects/{project_id}/clusters/{cluster_id}/nodes
async fn create_node(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<ClusterPath>,
    body: Result<Json<NodeView>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| invalid_body(e, &ctx))?;

    let node = within_deadline(&state, &ctx, "create_node", async {
        let cluster = state
            .clusters()
            .cluster(&path.project_id, &path.cluster_id)
            .await?;
        workers::create_worker(&cluster, state.templater(), request).await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(node)))
}

/// DELETE /v2/projects/{project_id}/clusters/{cluster_id}/nodes/{node_id}
async fn delete_node(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(path): Path<NodePath>,
) -> Result<StatusCode, ApiError> {
    within_deadline(&state, &ctx, "delete_node", async {
        let cluster = state
            .clusters()
            .cluster(&path.project_id, &path.cluster_id)
            .await?;
        workers::delete_worker(&cluster, &path.node_id).await
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
