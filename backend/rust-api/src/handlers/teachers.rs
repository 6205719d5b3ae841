use axum::{extract::State, Json};
use std::sync::Arc;

use super::{ApiError, ApiResponse};
use crate::{
    models::teacher::TeacherSummary,
    services::{teacher_service::TeacherService, AppState},
};

pub async fn list_teachers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TeacherSummary>>>, ApiError> {
    let service = TeacherService::new(state.store.clone());
    let teachers = service.list().await?;
    Ok(ApiResponse::ok("Teachers retrieved successfully", teachers))
}
