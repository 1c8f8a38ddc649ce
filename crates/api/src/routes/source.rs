//! Source selection route

use axum::{extract::State, Json};
use monitor::{SessionSnapshot, SourceSelection};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Switch between the live camera and a clip file.
///
/// File paths are relative to the configured media directory. Omitting the
/// path puts the session in "waiting for file" mode.
pub async fn select_source(
    State(state): State<Arc<AppState>>,
    Json(selection): Json<SourceSelection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let selection = match selection {
        SourceSelection::File { path: Some(path) } => SourceSelection::File {
            path: Some(resolve_clip(&state.media_dir, &path)?),
        },
        other => other,
    };

    state.monitor.select_source(selection).await?;
    Ok(Json(state.monitor.snapshot().await))
}

/// Join `requested` under `media_dir`, refusing anything that could escape it
pub fn resolve_clip(media_dir: &Path, requested: &Path) -> Result<PathBuf, ApiError> {
    let plain = requested
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !plain || requested.as_os_str().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "clip path must be relative to the media directory: {}",
            requested.display()
        )));
    }
    Ok(media_dir.join(requested))
}
