//! Alert and error dismissal routes

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::AppState;

/// Response for dismiss endpoints
#[derive(Debug, Serialize)]
pub struct DismissResponse {
    /// Whether something was dismissed
    pub dismissed: bool,
}

/// Dismiss the active alert
pub async fn dismiss_alert(State(state): State<Arc<AppState>>) -> Json<DismissResponse> {
    let dismissed = state.monitor.dismiss_alert().await;
    if dismissed {
        info!("Alert dismissed by user");
    }
    Json(DismissResponse { dismissed })
}

/// Dismiss the current error. Configuration errors stay.
pub async fn dismiss_error(State(state): State<Arc<AppState>>) -> Json<DismissResponse> {
    let dismissed = state.monitor.dismiss_error().await;
    if dismissed {
        info!("Error dismissed by user");
    }
    Json(DismissResponse { dismissed })
}
