use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse};
use crate::{
    extractors::AppJson,
    models::course::{CourseResponse, CreateCourseRequest, UpdateCourseRequest},
    services::{course_service::CourseService, AppState},
};

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CourseResponse>>), ApiError> {
    let service = CourseService::new(state.store.clone());
    let course = service.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Course created successfully", course),
    ))
}

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CourseResponse>>>, ApiError> {
    let service = CourseService::new(state.store.clone());
    let courses = service.list().await?;
    Ok(ApiResponse::ok("Courses retrieved successfully", courses))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CourseResponse>>, ApiError> {
    let service = CourseService::new(state.store.clone());
    let course = service.get(&id).await?;
    Ok(ApiResponse::ok("Course retrieved successfully", course))
}

pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateCourseRequest>,
) -> Result<Json<ApiResponse<CourseResponse>>, ApiError> {
    let service = CourseService::new(state.store.clone());
    let course = service.update(&id, payload).await?;
    Ok(ApiResponse::ok("Course updated successfully", course))
}

pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let service = CourseService::new(state.store.clone());
    service.delete(&id).await?;
    Ok(ApiResponse::message("Course deleted successfully"))
}
