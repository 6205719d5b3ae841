use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use serde::de::DeserializeOwned;

use super::store::{CourseStore, StoreError};
use crate::metrics::track_db_operation;
use crate::models::{
    course::{Course, COURSE_COLLECTION},
    course_meta::{CourseMeta, COURSE_META_COLLECTION},
    teacher::{Teacher, TEACHER_COLLECTION},
    user::{User, USER_COLLECTION},
};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USER_COLLECTION)
    }

    fn teachers(&self) -> Collection<Teacher> {
        self.db.collection(TEACHER_COLLECTION)
    }

    fn courses(&self) -> Collection<Course> {
        self.db.collection(COURSE_COLLECTION)
    }

    fn course_metas(&self) -> Collection<CourseMeta> {
        self.db.collection(COURSE_META_COLLECTION)
    }

    /// Creates the course-meta indexes; safe to run on every start.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "courseId": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder().keys(doc! { "createdBy": 1 }).build(),
            IndexModel::builder().keys(doc! { "isPublished": 1 }).build(),
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
        ];

        self.course_metas()
            .create_indexes(indexes)
            .await
            .context("Failed to create coursemetas indexes")?;

        tracing::info!("MongoDB indexes ensured for {}", COURSE_META_COLLECTION);
        Ok(())
    }

    async fn find_many<T>(
        &self,
        collection: Collection<T>,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let name = collection.name().to_string();
        let items = track_db_operation("find", &name, async {
            let cursor = match sort {
                Some(sort) => collection.find(filter).sort(sort).await,
                None => collection.find(filter).await,
            }
            .with_context(|| format!("Failed to query {}", name))?;
            cursor
                .try_collect()
                .await
                .with_context(|| format!("Failed to collect {} documents", name))
        })
        .await?;
        Ok(items)
    }

    async fn find_by_id<T>(
        &self,
        collection: Collection<T>,
        filter: Document,
    ) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let name = collection.name().to_string();
        let item = track_db_operation("find_one", &name, async {
            collection
                .find_one(filter)
                .await
                .with_context(|| format!("Failed to load document from {}", name))
        })
        .await?;
        Ok(item)
    }
}

fn is_duplicate_key(err: &anyhow::Error) -> bool {
    err.downcast_ref::<mongodb::error::Error>()
        .is_some_and(|e| match *e.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref we)) => we.code == DUPLICATE_KEY,
            _ => false,
        })
}

fn by_ids(ids: &[ObjectId]) -> Document {
    doc! { "_id": { "$in": ids.to_vec() } }
}

#[async_trait]
impl CourseStore for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        self.find_by_id(self.users(), doc! { "_id": id }).await
    }

    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_many(self.users(), by_ids(ids), None).await
    }

    async fn list_teachers(&self) -> Result<Vec<Teacher>, StoreError> {
        self.find_many(self.teachers(), doc! {}, Some(doc! { "createdAt": -1 }))
            .await
    }

    async fn find_teachers(&self, ids: &[ObjectId]) -> Result<Vec<Teacher>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_many(self.teachers(), by_ids(ids), None).await
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        track_db_operation("insert_one", COURSE_COLLECTION, async {
            self.courses()
                .insert_one(course)
                .await
                .context("Failed to insert course")
        })
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate(COURSE_COLLECTION)
            } else {
                StoreError::Backend(e)
            }
        })?;
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        self.find_many(self.courses(), doc! {}, Some(doc! { "createdAt": -1 }))
            .await
    }

    async fn find_course(&self, id: &ObjectId) -> Result<Option<Course>, StoreError> {
        self.find_by_id(self.courses(), doc! { "_id": id }).await
    }

    async fn find_courses(&self, ids: &[ObjectId]) -> Result<Vec<Course>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_many(self.courses(), by_ids(ids), None).await
    }

    async fn replace_course(&self, course: &Course) -> Result<(), StoreError> {
        let result = track_db_operation("replace_one", COURSE_COLLECTION, async {
            self.courses()
                .replace_one(doc! { "_id": course.id }, course)
                .await
                .context("Failed to update course")
        })
        .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_course(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = track_db_operation("delete_one", COURSE_COLLECTION, async {
            self.courses()
                .delete_one(doc! { "_id": id })
                .await
                .context("Failed to delete course")
        })
        .await?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_course_meta(&self, meta: &CourseMeta) -> Result<(), StoreError> {
        track_db_operation("insert_one", COURSE_META_COLLECTION, async {
            self.course_metas()
                .insert_one(meta)
                .await
                .context("Failed to insert course meta")
        })
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate(COURSE_META_COLLECTION)
            } else {
                StoreError::Backend(e)
            }
        })?;
        Ok(())
    }

    async fn list_course_metas(
        &self,
        published: Option<bool>,
    ) -> Result<Vec<CourseMeta>, StoreError> {
        let filter = match published {
            Some(flag) => doc! { "isPublished": flag },
            None => doc! {},
        };
        self.find_many(self.course_metas(), filter, Some(doc! { "createdAt": -1 }))
            .await
    }

    async fn find_course_meta(&self, id: &ObjectId) -> Result<Option<CourseMeta>, StoreError> {
        self.find_by_id(self.course_metas(), doc! { "_id": id }).await
    }

    async fn find_course_meta_by_course(
        &self,
        course_id: &ObjectId,
    ) -> Result<Option<CourseMeta>, StoreError> {
        self.find_by_id(self.course_metas(), doc! { "courseId": course_id })
            .await
    }

    async fn replace_course_meta(
        &self,
        meta: &CourseMeta,
        expected_version: i64,
    ) -> Result<(), StoreError> {
        // Documents written before versioning have no field; treat them as 0.
        let filter = if expected_version == 0 {
            doc! {
                "_id": meta.id,
                "$or": [ { "version": 0_i64 }, { "version": { "$exists": false } } ],
            }
        } else {
            doc! { "_id": meta.id, "version": expected_version }
        };

        let result = track_db_operation("replace_one", COURSE_META_COLLECTION, async {
            self.course_metas()
                .replace_one(filter, meta)
                .await
                .context("Failed to save course meta")
        })
        .await?;

        if result.matched_count == 0 {
            return match self.find_course_meta(&meta.id).await? {
                Some(_) => Err(StoreError::VersionConflict),
                None => Err(StoreError::NotFound),
            };
        }
        Ok(())
    }

    async fn delete_course_meta(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = track_db_operation("delete_one", COURSE_META_COLLECTION, async {
            self.course_metas()
                .delete_one(doc! { "_id": id })
                .await
                .context("Failed to delete course meta")
        })
        .await?;
        Ok(result.deleted_count > 0)
    }
}
