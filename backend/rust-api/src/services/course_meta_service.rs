use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use super::{CourseStore, ServiceError, StoreError};
use crate::metrics;
use crate::models::{
    course::CourseSummary,
    course_meta::{
        CourseMeta, CourseMetaResponse, CreateCourseMetaRequest, ListCourseMetaQuery,
        SubmitAssignmentRequest, ToggleSubtopicRequest, UpdateCourseMetaRequest, WeekDataBody,
    },
    parse_object_id,
    user::UserSummary,
};

const META_NOT_FOUND: &str = "Course meta not found";

pub struct CourseMetaService {
    store: Arc<dyn CourseStore>,
}

impl CourseMetaService {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }

    /// Создать course meta для существующего курса
    pub async fn create(
        &self,
        req: CreateCourseMetaRequest,
        created_by: ObjectId,
    ) -> Result<CourseMetaResponse, ServiceError> {
        let req = req.normalized();
        req.validate()?;

        let course_id = parse_object_id(&req.course_id, "course ID")?;
        if self.store.find_course(&course_id).await?.is_none() {
            return Err(ServiceError::NotFound("Course not found"));
        }
        if self
            .store
            .find_course_meta_by_course(&course_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "Course meta already exists for this course",
            ));
        }

        let meta = CourseMeta::new(course_id, created_by, req, Utc::now())?;
        let result = self.store.insert_course_meta(&meta).await;
        metrics::record_course_meta_mutation("create", result.is_ok());
        result?;

        tracing::info!(
            course_meta_id = %meta.id,
            course_id = %course_id,
            weeks = meta.weeks.len(),
            "Course meta created"
        );
        self.resolve(meta).await
    }

    pub async fn list(
        &self,
        query: ListCourseMetaQuery,
    ) -> Result<Vec<CourseMetaResponse>, ServiceError> {
        let metas = self.store.list_course_metas(query.published).await?;

        let mut course_ids: Vec<ObjectId> = metas.iter().map(|m| m.course_id).collect();
        let mut user_ids: Vec<ObjectId> = metas.iter().map(|m| m.created_by).collect();
        course_ids.sort();
        course_ids.dedup();
        user_ids.sort();
        user_ids.dedup();

        let courses: HashMap<ObjectId, CourseSummary> = self
            .store
            .find_courses(&course_ids)
            .await?
            .iter()
            .map(|c| (c.id, CourseSummary::from(c)))
            .collect();
        let users: HashMap<ObjectId, UserSummary> = self
            .store
            .find_users(&user_ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        Ok(metas
            .into_iter()
            .map(|meta| {
                let course = courses.get(&meta.course_id).cloned();
                let author = users.get(&meta.created_by).cloned();
                CourseMetaResponse::from_meta(meta, course, author)
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<CourseMetaResponse, ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        let meta = self.load(&id).await?;
        self.resolve(meta).await
    }

    pub async fn get_by_course(&self, course_id: &str) -> Result<CourseMetaResponse, ServiceError> {
        let course_id = parse_object_id(course_id, "course ID")?;
        let meta = self
            .store
            .find_course_meta_by_course(&course_id)
            .await?
            .ok_or(ServiceError::NotFound("Course meta not found for this course"))?;
        self.resolve(meta).await
    }

    /// Shallow merge; a `weeks` array replaces the stored weeks.
    pub async fn update(
        &self,
        id: &str,
        req: UpdateCourseMetaRequest,
    ) -> Result<CourseMetaResponse, ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        let req = req.normalized();
        req.validate()?;

        self.mutate(&id, "update", |meta| {
            meta.apply_update(req, Utc::now())?;
            Ok(true)
        })
        .await
    }

    pub async fn add_week(
        &self,
        id: &str,
        body: WeekDataBody,
    ) -> Result<CourseMetaResponse, ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        let week = body.week_data.normalized();
        week.validate()?;

        self.mutate(&id, "add_week", |meta| {
            let week_id = meta.add_week(week, Utc::now())?;
            tracing::debug!(week_id = %week_id, "Week appended");
            Ok(true)
        })
        .await
    }

    pub async fn update_week(
        &self,
        id: &str,
        week_id: &str,
        body: WeekDataBody,
    ) -> Result<CourseMetaResponse, ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        let week_id = parse_object_id(week_id, "week ID")?;
        let week = body.week_data.normalized();
        week.validate()?;

        self.mutate(&id, "update_week", |meta| {
            meta.update_week(&week_id, week, Utc::now())?;
            Ok(true)
        })
        .await
    }

    pub async fn delete_week(
        &self,
        id: &str,
        week_id: &str,
    ) -> Result<CourseMetaResponse, ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        let week_id = parse_object_id(week_id, "week ID")?;

        self.mutate(&id, "delete_week", |meta| {
            meta.delete_week(&week_id, Utc::now())?;
            Ok(true)
        })
        .await
    }

    /// Отметить sub-topic как пройденный (или снять отметку)
    pub async fn set_subtopic_completed(
        &self,
        id: &str,
        week_id: &str,
        subtopic_id: &str,
        req: ToggleSubtopicRequest,
    ) -> Result<CourseMetaResponse, ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        let week_id = parse_object_id(week_id, "week ID")?;
        let subtopic_id = parse_object_id(subtopic_id, "sub-topic ID")?;

        let response = self
            .mutate(&id, "toggle_subtopic", |meta| {
                Ok(meta.set_subtopic_completed(
                    &week_id,
                    &subtopic_id,
                    req.is_completed,
                    Utc::now(),
                )?)
            })
            .await?;
        metrics::record_subtopic_toggle(req.is_completed);
        Ok(response)
    }

    pub async fn set_assignment_submitted(
        &self,
        id: &str,
        week_id: &str,
        assignment_id: &str,
        req: SubmitAssignmentRequest,
    ) -> Result<CourseMetaResponse, ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        let week_id = parse_object_id(week_id, "week ID")?;
        let assignment_id = parse_object_id(assignment_id, "assignment ID")?;

        let response = self
            .mutate(&id, "submit_assignment", |meta| {
                meta.set_assignment_submitted(
                    &week_id,
                    &assignment_id,
                    req.is_submitted,
                    req.submitted_at,
                    Utc::now(),
                )?;
                Ok(true)
            })
            .await?;
        metrics::record_assignment_submission(req.is_submitted);
        Ok(response)
    }

    pub async fn publish(&self, id: &str) -> Result<CourseMetaResponse, ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        self.mutate(&id, "publish", |meta| {
            meta.publish(Utc::now());
            Ok(true)
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_object_id(id, "course meta ID")?;
        let deleted = self.store.delete_course_meta(&id).await?;
        metrics::record_course_meta_mutation("delete", deleted);
        if !deleted {
            return Err(ServiceError::NotFound(META_NOT_FOUND));
        }
        tracing::info!(course_meta_id = %id, "Course meta deleted");
        Ok(())
    }

    async fn load(&self, id: &ObjectId) -> Result<CourseMeta, ServiceError> {
        self.store
            .find_course_meta(id)
            .await?
            .ok_or(ServiceError::NotFound(META_NOT_FOUND))
    }

    /// Load, apply `change`, write back under the loaded version.
    /// `change` returns false when the aggregate was left untouched.
    async fn mutate<F>(
        &self,
        id: &ObjectId,
        operation: &str,
        change: F,
    ) -> Result<CourseMetaResponse, ServiceError>
    where
        F: FnOnce(&mut CourseMeta) -> Result<bool, ServiceError> + Send,
    {
        let result = self.apply(id, change).await;
        metrics::record_course_meta_mutation(operation, result.is_ok());

        match result {
            Ok(meta) => {
                tracing::info!(
                    course_meta_id = %meta.id,
                    version = meta.version,
                    "Course meta {} applied",
                    operation
                );
                self.resolve(meta).await
            }
            Err(ServiceError::StaleVersion) => {
                tracing::warn!(course_meta_id = %id, "Stale write rejected for {}", operation);
                Err(ServiceError::StaleVersion)
            }
            Err(e) => Err(e),
        }
    }

    async fn apply<F>(&self, id: &ObjectId, change: F) -> Result<CourseMeta, ServiceError>
    where
        F: FnOnce(&mut CourseMeta) -> Result<bool, ServiceError> + Send,
    {
        let mut meta = self.load(id).await?;
        if !change(&mut meta)? {
            return Ok(meta);
        }

        let expected_version = meta.version;
        meta.version += 1;
        match self.store.replace_course_meta(&meta, expected_version).await {
            Ok(()) => Ok(meta),
            Err(StoreError::NotFound) => Err(ServiceError::NotFound(META_NOT_FOUND)),
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve(&self, meta: CourseMeta) -> Result<CourseMetaResponse, ServiceError> {
        let course = self
            .store
            .find_course(&meta.course_id)
            .await?
            .as_ref()
            .map(CourseSummary::from);
        let author = self
            .store
            .find_user(&meta.created_by)
            .await?
            .as_ref()
            .map(UserSummary::from);
        Ok(CourseMetaResponse::from_meta(meta, course, author))
    }
}
