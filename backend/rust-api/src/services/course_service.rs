use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use validator::Validate;

use super::{teacher_service::TeacherService, CourseStore, ServiceError, StoreError};
use crate::models::{
    course::{parse_teacher_ids, Course, CourseResponse, CreateCourseRequest, UpdateCourseRequest},
    parse_object_id,
};

const COURSE_NOT_FOUND: &str = "Course not found";

pub struct CourseService {
    store: Arc<dyn CourseStore>,
    teachers: TeacherService,
}

impl CourseService {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self {
            teachers: TeacherService::new(store.clone()),
            store,
        }
    }

    /// Создать курс
    pub async fn create(&self, req: CreateCourseRequest) -> Result<CourseResponse, ServiceError> {
        req.validate()?;
        let teacher_ids = parse_teacher_ids(&req.assigned_teachers)?;

        let course = Course::new(req, teacher_ids, Utc::now());
        self.store.insert_course(&course).await?;

        tracing::info!(course_id = %course.id, title = %course.title, "Course created");
        self.populate(course).await
    }

    pub async fn list(&self) -> Result<Vec<CourseResponse>, ServiceError> {
        let courses = self.store.list_courses().await?;
        let mut responses = Vec::with_capacity(courses.len());
        for course in courses {
            responses.push(self.populate(course).await?);
        }
        Ok(responses)
    }

    pub async fn get(&self, id: &str) -> Result<CourseResponse, ServiceError> {
        let id = parse_object_id(id, "course ID")?;
        let course = self.load(&id).await?;
        self.populate(course).await
    }

    pub async fn update(
        &self,
        id: &str,
        req: UpdateCourseRequest,
    ) -> Result<CourseResponse, ServiceError> {
        let id = parse_object_id(id, "course ID")?;
        req.validate()?;
        let teacher_ids = req
            .assigned_teachers
            .as_deref()
            .map(parse_teacher_ids)
            .transpose()?;

        let mut course = self.load(&id).await?;
        course.apply_update(req, teacher_ids, Utc::now());
        self.store.replace_course(&course).await.map_err(|e| match e {
            StoreError::NotFound => ServiceError::NotFound(COURSE_NOT_FOUND),
            other => other.into(),
        })?;

        tracing::info!(course_id = %course.id, "Course updated");
        self.populate(course).await
    }

    /// The course meta, if any, is left in place.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_object_id(id, "course ID")?;
        if !self.store.delete_course(&id).await? {
            return Err(ServiceError::NotFound(COURSE_NOT_FOUND));
        }
        tracing::info!(course_id = %id, "Course deleted");
        Ok(())
    }

    async fn load(&self, id: &ObjectId) -> Result<Course, ServiceError> {
        self.store
            .find_course(id)
            .await?
            .ok_or(ServiceError::NotFound(COURSE_NOT_FOUND))
    }

    async fn populate(&self, course: Course) -> Result<CourseResponse, ServiceError> {
        let teachers = self.teachers.summaries(&course.assigned_teachers).await?;
        Ok(CourseResponse::from_course(course, teachers))
    }
}
