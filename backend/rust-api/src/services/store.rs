use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::{course::Course, course_meta::CourseMeta, teacher::Teacher, user::User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key in {0}")]
    Duplicate(&'static str),
    #[error("document was modified by another request")]
    VersionConflict,
    #[error("document not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence seam for the course catalogue.
///
/// Lists are returned newest first. Course metas are written back whole;
/// `replace_course_meta` only succeeds when the stored version still equals
/// `expected_version`.
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;
    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>, StoreError>;

    async fn list_teachers(&self) -> Result<Vec<Teacher>, StoreError>;
    async fn find_teachers(&self, ids: &[ObjectId]) -> Result<Vec<Teacher>, StoreError>;

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError>;
    async fn list_courses(&self) -> Result<Vec<Course>, StoreError>;
    async fn find_course(&self, id: &ObjectId) -> Result<Option<Course>, StoreError>;
    async fn find_courses(&self, ids: &[ObjectId]) -> Result<Vec<Course>, StoreError>;
    /// Errors with `NotFound` when the course is gone.
    async fn replace_course(&self, course: &Course) -> Result<(), StoreError>;
    /// Returns false when nothing was deleted.
    async fn delete_course(&self, id: &ObjectId) -> Result<bool, StoreError>;

    /// Errors with `Duplicate` when the course already has a meta.
    async fn insert_course_meta(&self, meta: &CourseMeta) -> Result<(), StoreError>;
    async fn list_course_metas(
        &self,
        published: Option<bool>,
    ) -> Result<Vec<CourseMeta>, StoreError>;
    async fn find_course_meta(&self, id: &ObjectId) -> Result<Option<CourseMeta>, StoreError>;
    async fn find_course_meta_by_course(
        &self,
        course_id: &ObjectId,
    ) -> Result<Option<CourseMeta>, StoreError>;
    async fn replace_course_meta(
        &self,
        meta: &CourseMeta,
        expected_version: i64,
    ) -> Result<(), StoreError>;
    async fn delete_course_meta(&self, id: &ObjectId) -> Result<bool, StoreError>;
}
