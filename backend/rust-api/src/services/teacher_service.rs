use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::Arc;

use super::{CourseStore, ServiceError};
use crate::models::{
    teacher::{Teacher, TeacherSummary},
    user::UserSummary,
};

pub struct TeacherService {
    store: Arc<dyn CourseStore>,
}

impl TeacherService {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }

    /// Все преподаватели, новые первыми
    pub async fn list(&self) -> Result<Vec<TeacherSummary>, ServiceError> {
        let teachers = self.store.list_teachers().await?;
        self.with_users(&teachers).await
    }

    /// Summaries in the order of `ids`; unknown ids are skipped.
    pub async fn summaries(&self, ids: &[ObjectId]) -> Result<Vec<TeacherSummary>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: HashMap<ObjectId, Teacher> = self
            .store
            .find_teachers(ids)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let ordered: Vec<Teacher> = ids.iter().filter_map(|id| found.get(id).cloned()).collect();
        self.with_users(&ordered).await
    }

    async fn with_users(&self, teachers: &[Teacher]) -> Result<Vec<TeacherSummary>, ServiceError> {
        let user_ids: Vec<ObjectId> = teachers.iter().map(|t| t.user_id).collect();
        let users: HashMap<ObjectId, UserSummary> = self
            .store
            .find_users(&user_ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        Ok(teachers
            .iter()
            .map(|t| TeacherSummary::from_teacher(t, users.get(&t.user_id).cloned()))
            .collect())
    }
}
