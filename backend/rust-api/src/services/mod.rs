use std::sync::Arc;

use crate::config::Config;
use crate::middlewares::auth::JwtService;
use crate::models::{
    course::COURSE_COLLECTION,
    course_meta::{AggregateError, COURSE_META_COLLECTION},
    InvalidObjectId,
};

pub mod course_meta_service;
pub mod course_service;
pub mod memory_store;
pub mod mongo_store;
pub mod store;
pub mod teacher_service;

pub use store::{CourseStore, StoreError};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CourseStore>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CourseStore>) -> Self {
        let jwt = JwtService::new(&config.jwt_secret);
        Self { config, store, jwt }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    InvalidId(#[from] InvalidObjectId),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("Course meta was modified by another request, reload and retry")]
    StaleVersion,
    #[error("{0}")]
    Unauthenticated(String),
    #[error("Access denied: insufficient permissions")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(format!("Validation error: {}", errors))
    }
}

impl From<AggregateError> for ServiceError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::WeekNotFound => ServiceError::NotFound("Week not found"),
            AggregateError::SubTopicNotFound => ServiceError::NotFound("Sub-topic not found"),
            AggregateError::AssignmentNotFound => ServiceError::NotFound("Assignment not found"),
            AggregateError::InvalidId(e) => ServiceError::InvalidId(e),
            AggregateError::Validation(message) => ServiceError::Validation(message),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(collection) => ServiceError::Conflict(match collection {
                COURSE_META_COLLECTION => "Course meta already exists for this course",
                COURSE_COLLECTION => "Course already exists",
                _ => "Document already exists",
            }),
            StoreError::VersionConflict => ServiceError::StaleVersion,
            // Callers that know which document they addressed map this themselves.
            StoreError::NotFound => ServiceError::NotFound("Document not found"),
            StoreError::Backend(e) => ServiceError::Internal(e),
        }
    }
}
