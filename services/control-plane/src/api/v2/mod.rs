//! API v2 routes: the structured node shape.

mod nodes;

use axum::Router;

use crate::state::AppState;

use super::NODES_PATH;

pub fn routes() -> Router<AppState> {
    Router::new().nest(NODES_PATH, nodes::routes())
}
