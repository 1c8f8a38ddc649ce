//! Session status route

use axum::{extract::State, Json};
use monitor::SessionSnapshot;
use std::sync::Arc;

use crate::AppState;

/// Current session state plus the derived status line
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.monitor.snapshot().await)
}
