use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{bson_datetime_as_chrono, user::UserSummary};

pub const TEACHER_COLLECTION: &str = "teachers";

/// Teacher profile stored in MongoDB "teachers" collection (ref: users).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub year_of_experience: u32,
    pub degree_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub salary: f64,
    #[serde(default)]
    pub courses_enrolled: Vec<ObjectId>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

/// Teacher as shown inside course listings and the teacher directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSummary {
    pub id: String,
    pub year_of_experience: u32,
    pub degree_name: String,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// `null` when the referenced user no longer exists
    pub user: Option<UserSummary>,
}

impl TeacherSummary {
    pub fn from_teacher(teacher: &Teacher, user: Option<UserSummary>) -> Self {
        TeacherSummary {
            id: teacher.id.to_hex(),
            year_of_experience: teacher.year_of_experience,
            degree_name: teacher.degree_name.clone(),
            skills: teacher.skills.clone(),
            photo_url: teacher.photo_url.clone(),
            user,
        }
    }
}
