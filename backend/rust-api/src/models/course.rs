use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{bson_datetime_as_chrono, parse_object_id, teacher::TeacherSummary, trim_optional};
use super::InvalidObjectId;

pub const COURSE_COLLECTION: &str = "courses";

/// Course model stored in MongoDB "courses" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    pub price: f64,
    /// Teacher profile ids (ref: teachers)
    #[serde(default)]
    pub assigned_teachers: Vec<ObjectId>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn new(req: CreateCourseRequest, assigned_teachers: Vec<ObjectId>, now: DateTime<Utc>) -> Self {
        Course {
            id: ObjectId::new(),
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            image_link: trim_optional(req.image_link),
            price: req.price,
            assigned_teachers,
            created_at: now,
            updated_at: now,
        }
    }

    /// Shallow merge of the supplied fields.
    pub fn apply_update(
        &mut self,
        req: UpdateCourseRequest,
        assigned_teachers: Option<Vec<ObjectId>>,
        now: DateTime<Utc>,
    ) {
        if let Some(title) = req.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = req.description {
            self.description = description.trim().to_string();
        }
        if req.image_link.is_some() {
            self.image_link = trim_optional(req.image_link);
        }
        if let Some(price) = req.price {
            self.price = price;
        }
        if let Some(teachers) = assigned_teachers {
            self.assigned_teachers = teachers;
        }
        self.updated_at = now;
    }
}

/// Request для создания курса
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 2000,
        message = "Description must be between 1 and 2000 characters"
    ))]
    pub description: String,

    pub image_link: Option<String>,

    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: f64,

    /// Teacher ids (ObjectId as string)
    #[serde(default)]
    pub assigned_teachers: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(
        min = 1,
        max = 2000,
        message = "Description must be between 1 and 2000 characters"
    ))]
    pub description: Option<String>,

    pub image_link: Option<String>,

    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: Option<f64>,

    pub assigned_teachers: Option<Vec<String>>,
}

/// Every id must be well-formed; the whole list is rejected otherwise.
pub fn parse_teacher_ids(ids: &[String]) -> Result<Vec<ObjectId>, InvalidObjectId> {
    ids.iter()
        .map(|id| parse_object_id(id, "teacher IDs provided"))
        .collect()
}

/// The `title description price imageLink` projection referenced from
/// course-meta documents.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        CourseSummary {
            id: course.id.to_hex(),
            title: course.title.clone(),
            description: course.description.clone(),
            price: course.price,
            image_link: course.image_link.clone(),
        }
    }
}

/// Course response для API (с populated teachers)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    pub price: f64,
    pub assigned_teachers: Vec<TeacherSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseResponse {
    pub fn from_course(course: Course, assigned_teachers: Vec<TeacherSummary>) -> Self {
        CourseResponse {
            id: course.id.to_hex(),
            title: course.title,
            description: course.description,
            image_link: course.image_link,
            price: course.price,
            assigned_teachers,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateCourseRequest {
        CreateCourseRequest {
            title: "  Rust for the Web ".to_string(),
            description: "Build APIs".to_string(),
            image_link: Some(" ".to_string()),
            price: 999.0,
            assigned_teachers: Vec::new(),
        }
    }

    #[test]
    fn new_course_trims_fields() {
        let course = Course::new(create_request(), Vec::new(), Utc::now());
        assert_eq!(course.title, "Rust for the Web");
        assert_eq!(course.image_link, None);
        assert_eq!(course.price, 999.0);
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut req = create_request();
        req.price = -1.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn teacher_ids_must_all_be_valid() {
        let good = ObjectId::new().to_hex();
        assert_eq!(parse_teacher_ids(&[good.clone()]).unwrap().len(), 1);

        let err = parse_teacher_ids(&[good, "nope".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid teacher IDs provided");
    }

    #[test]
    fn update_only_touches_supplied_fields() {
        let mut course = Course::new(create_request(), Vec::new(), Utc::now());
        let update = UpdateCourseRequest {
            price: Some(499.0),
            ..Default::default()
        };
        course.apply_update(update, None, Utc::now());
        assert_eq!(course.price, 499.0);
        assert_eq!(course.title, "Rust for the Web");
    }
}
