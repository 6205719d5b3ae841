//! In-process store used for local demos and the test suite.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{CourseStore, StoreError};
use crate::models::{
    course::{Course, COURSE_COLLECTION},
    course_meta::{CourseMeta, COURSE_META_COLLECTION},
    teacher::Teacher,
    user::User,
};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<ObjectId, User>>,
    teachers: RwLock<HashMap<ObjectId, Teacher>>,
    courses: RwLock<HashMap<ObjectId, Course>>,
    course_metas: RwLock<HashMap<ObjectId, CourseMeta>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users and teachers are owned by the identity side; seeding only.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn insert_teacher(&self, teacher: Teacher) {
        self.teachers.write().await.insert(teacher.id, teacher);
    }
}

fn pick<T: Clone>(map: &HashMap<ObjectId, T>, ids: &[ObjectId]) -> Vec<T> {
    ids.iter().filter_map(|id| map.get(id).cloned()).collect()
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>, StoreError> {
        Ok(pick(&*self.users.read().await, ids))
    }

    async fn list_teachers(&self) -> Result<Vec<Teacher>, StoreError> {
        let mut teachers: Vec<Teacher> = self.teachers.read().await.values().cloned().collect();
        teachers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(teachers)
    }

    async fn find_teachers(&self, ids: &[ObjectId]) -> Result<Vec<Teacher>, StoreError> {
        Ok(pick(&*self.teachers.read().await, ids))
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        let mut courses = self.courses.write().await;
        if courses.contains_key(&course.id) {
            return Err(StoreError::Duplicate(COURSE_COLLECTION));
        }
        courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        let mut courses: Vec<Course> = self.courses.read().await.values().cloned().collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(courses)
    }

    async fn find_course(&self, id: &ObjectId) -> Result<Option<Course>, StoreError> {
        Ok(self.courses.read().await.get(id).cloned())
    }

    async fn find_courses(&self, ids: &[ObjectId]) -> Result<Vec<Course>, StoreError> {
        Ok(pick(&*self.courses.read().await, ids))
    }

    async fn replace_course(&self, course: &Course) -> Result<(), StoreError> {
        let mut courses = self.courses.write().await;
        match courses.get_mut(&course.id) {
            Some(stored) => {
                *stored = course.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_course(&self, id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self.courses.write().await.remove(id).is_some())
    }

    async fn insert_course_meta(&self, meta: &CourseMeta) -> Result<(), StoreError> {
        let mut metas = self.course_metas.write().await;
        if metas.contains_key(&meta.id) || metas.values().any(|m| m.course_id == meta.course_id)
        {
            return Err(StoreError::Duplicate(COURSE_META_COLLECTION));
        }
        metas.insert(meta.id, meta.clone());
        Ok(())
    }

    async fn list_course_metas(
        &self,
        published: Option<bool>,
    ) -> Result<Vec<CourseMeta>, StoreError> {
        let mut metas: Vec<CourseMeta> = self
            .course_metas
            .read()
            .await
            .values()
            .filter(|m| published.is_none_or(|p| m.is_published == p))
            .cloned()
            .collect();
        metas.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(metas)
    }

    async fn find_course_meta(&self, id: &ObjectId) -> Result<Option<CourseMeta>, StoreError> {
        Ok(self.course_metas.read().await.get(id).cloned())
    }

    async fn find_course_meta_by_course(
        &self,
        course_id: &ObjectId,
    ) -> Result<Option<CourseMeta>, StoreError> {
        Ok(self
            .course_metas
            .read()
            .await
            .values()
            .find(|m| &m.course_id == course_id)
            .cloned())
    }

    async fn replace_course_meta(
        &self,
        meta: &CourseMeta,
        expected_version: i64,
    ) -> Result<(), StoreError> {
        let mut metas = self.course_metas.write().await;
        let stored = metas.get_mut(&meta.id).ok_or(StoreError::NotFound)?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict);
        }
        *stored = meta.clone();
        Ok(())
    }

    async fn delete_course_meta(&self, id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self.course_metas.write().await.remove(id).is_some())
    }
}
