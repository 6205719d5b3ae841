use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse};
use crate::{
    extractors::{AppJson, AppQuery},
    middlewares::auth::CurrentUser,
    models::course_meta::{
        CourseMetaResponse, CreateCourseMetaRequest, ListCourseMetaQuery, SubmitAssignmentRequest,
        ToggleSubtopicRequest, UpdateCourseMetaRequest, WeekDataBody,
    },
    services::{course_meta_service::CourseMetaService, AppState},
};

type MetaResult = Result<Json<ApiResponse<CourseMetaResponse>>, ApiError>;

pub async fn create_course_meta(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateCourseMetaRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CourseMetaResponse>>), ApiError> {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service.create(payload, user.id).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Course meta created successfully", meta),
    ))
}

pub async fn list_course_metas(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<ListCourseMetaQuery>,
) -> Result<Json<ApiResponse<Vec<CourseMetaResponse>>>, ApiError> {
    let service = CourseMetaService::new(state.store.clone());
    let metas = service.list(query).await?;
    Ok(ApiResponse::ok("Course metas retrieved successfully", metas))
}

pub async fn get_course_meta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service.get(&id).await?;
    Ok(ApiResponse::ok("Course meta retrieved successfully", meta))
}

pub async fn get_course_meta_by_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service.get_by_course(&course_id).await?;
    Ok(ApiResponse::ok("Course meta retrieved successfully", meta))
}

pub async fn update_course_meta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateCourseMetaRequest>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service.update(&id, payload).await?;
    Ok(ApiResponse::ok("Course meta updated successfully", meta))
}

pub async fn add_week(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<WeekDataBody>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service.add_week(&id, payload).await?;
    Ok(ApiResponse::ok("Week added successfully", meta))
}

pub async fn update_week(
    State(state): State<Arc<AppState>>,
    Path((id, week_id)): Path<(String, String)>,
    AppJson(payload): AppJson<WeekDataBody>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service.update_week(&id, &week_id, payload).await?;
    Ok(ApiResponse::ok("Week updated successfully", meta))
}

pub async fn delete_week(
    State(state): State<Arc<AppState>>,
    Path((id, week_id)): Path<(String, String)>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service.delete_week(&id, &week_id).await?;
    Ok(ApiResponse::ok("Week deleted successfully", meta))
}

pub async fn set_subtopic_completed(
    State(state): State<Arc<AppState>>,
    Path((id, week_id, subtopic_id)): Path<(String, String, String)>,
    AppJson(payload): AppJson<ToggleSubtopicRequest>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service
        .set_subtopic_completed(&id, &week_id, &subtopic_id, payload)
        .await?;
    Ok(ApiResponse::ok("Sub-topic status updated successfully", meta))
}

pub async fn set_assignment_submitted(
    State(state): State<Arc<AppState>>,
    Path((id, week_id, assignment_id)): Path<(String, String, String)>,
    AppJson(payload): AppJson<SubmitAssignmentRequest>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service
        .set_assignment_submitted(&id, &week_id, &assignment_id, payload)
        .await?;
    Ok(ApiResponse::ok("Assignment submission updated successfully", meta))
}

pub async fn publish_course_meta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> MetaResult {
    let service = CourseMetaService::new(state.store.clone());
    let meta = service.publish(&id).await?;
    Ok(ApiResponse::ok("Course meta published successfully", meta))
}

pub async fn delete_course_meta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let service = CourseMetaService::new(state.store.clone());
    service.delete(&id).await?;
    Ok(ApiResponse::message("Course meta deleted successfully"))
}
