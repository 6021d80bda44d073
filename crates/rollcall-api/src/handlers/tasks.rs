use axum::{
    extract::{Path, State},
    Json,
};
use rollcall_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::TaskResponse;
use crate::state::AppState;

/// Poll a submission task
#[utoipa::path(
    get,
    path = "/api/tasks/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = Uuid, Path, description = "Task ID from the submit receipt")
    ),
    responses(
        (status = 200, description = "Current task snapshot", body = TaskResponse),
        (status = 404, description = "Unknown or expired task", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskResponse>, HttpAppError> {
    match state.coordinator.poll(task_id) {
        Some(task) => Ok(Json(TaskResponse::new(&task, state.storage.as_ref()))),
        None => {
            tracing::debug!(task_id = %task_id, "Task not found");
            Err(AppError::NotFound(format!("Task {} not found", task_id)).into())
        }
    }
}
