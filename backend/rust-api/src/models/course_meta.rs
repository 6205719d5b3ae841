//! Course content aggregate: one document per course holding its weeks, and
//! inside each week the ordered sub-topics and assignments.
//!
//! Every mutation goes through [`CourseMeta`]; nested entities are located by
//! id inside the owned tree and never handed out as independent references.
//! `totalDuration` is stored and recomputed after each structural change,
//! while completion percentage and assignment counters are computed on read.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationError};

use super::{
    bson_datetime_as_chrono, bson_datetime_as_chrono_option, course::CourseSummary,
    parse_object_id, trim_optional, user::UserSummary, InvalidObjectId,
};

pub const COURSE_META_COLLECTION: &str = "coursemetas";

lazy_static! {
    static ref LINK_REGEX: Regex = Regex::new(r"^https?://.+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("Week not found")]
    WeekNotFound,
    #[error("Sub-topic not found")]
    SubTopicNotFound,
    #[error("Assignment not found")]
    AssignmentNotFound,
    #[error(transparent)]
    InvalidId(#[from] InvalidObjectId),
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubTopic {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default)]
    pub is_completed: bool,
    pub order: i32,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_url: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<i64>,
    #[serde(default)]
    pub is_submitted: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks_obtained: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub order: i32,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Position at creation time; never renumbered when siblings are removed.
    pub week_number: i32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sub_topics: Vec<SubTopic>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Week {
    /// Re-derives the week completion flag from its sub-topics.
    /// Returns true when the flag or timestamp changed.
    fn refresh_completion(&mut self, now: DateTime<Utc>) -> bool {
        let all_completed = self.sub_topics.iter().all(|st| st.is_completed);
        let changed = all_completed != self.is_completed;
        self.is_completed = all_completed;
        if all_completed {
            if changed || self.completed_at.is_none() {
                self.completed_at = Some(now);
                return true;
            }
        } else if self.completed_at.take().is_some() {
            return true;
        }
        changed
    }
}

/// Course meta document stored in MongoDB "coursemetas" collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseMeta {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Unique: one course meta per course
    pub course_id: ObjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub total_weeks: i32,
    /// Minutes, sum of every sub-topic duration
    #[serde(default)]
    pub total_duration: i64,
    #[serde(default)]
    pub weeks: Vec<Week>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub published_at: Option<DateTime<Utc>>,
    pub created_by: ObjectId,
    /// Optimistic concurrency counter, bumped on every successful save.
    #[serde(default)]
    pub version: i64,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

/// Upper bound for a single sub-topic duration: one year in minutes.
pub const MAX_SUBTOPIC_DURATION: i64 = 525_600;

/// Σ over weeks, Σ over sub-topics of `duration` (missing counts as 0).
pub fn total_duration(weeks: &[Week]) -> Result<i64, AggregateError> {
    sum_durations(weeks.iter())
}

fn sum_durations<'a>(weeks: impl Iterator<Item = &'a Week>) -> Result<i64, AggregateError> {
    weeks
        .flat_map(|week| week.sub_topics.iter())
        .try_fold(0i64, |total, st| total.checked_add(st.duration.unwrap_or(0)))
        .ok_or_else(|| AggregateError::Validation("Total duration is too large".to_string()))
}

/// round(100 * completed / total) over all sub-topics, 0 when there are none.
pub fn completion_percentage(weeks: &[Week]) -> u32 {
    let (total, completed) = weeks
        .iter()
        .flat_map(|week| week.sub_topics.iter())
        .fold((0u64, 0u64), |(total, completed), st| {
            (total + 1, completed + u64::from(st.is_completed))
        });
    if total == 0 {
        return 0;
    }
    // Half-up rounding in integers: (200c + t) / 2t
    ((200 * completed + total) / (2 * total)) as u32
}

pub fn total_assignments(weeks: &[Week]) -> usize {
    weeks.iter().map(|week| week.assignments.len()).sum()
}

pub fn submitted_assignments(weeks: &[Week]) -> usize {
    weeks
        .iter()
        .flat_map(|week| week.assignments.iter())
        .filter(|a| a.is_submitted)
        .count()
}

impl CourseMeta {
    pub fn new(
        course_id: ObjectId,
        created_by: ObjectId,
        req: CreateCourseMetaRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, AggregateError> {
        let weeks = build_weeks(req.weeks.unwrap_or_default(), &[], now)?;
        let total_weeks = req.total_weeks.unwrap_or(weeks.len() as i32);
        let total_duration = total_duration(&weeks)?;

        Ok(CourseMeta {
            id: ObjectId::new(),
            course_id,
            title: req.title,
            description: req.description,
            total_weeks,
            total_duration,
            weeks,
            is_published: false,
            published_at: None,
            created_by,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn completion_percentage(&self) -> u32 {
        completion_percentage(&self.weeks)
    }

    pub fn total_assignments(&self) -> usize {
        total_assignments(&self.weeks)
    }

    pub fn submitted_assignments(&self) -> usize {
        submitted_assignments(&self.weeks)
    }

    fn week_mut(&mut self, week_id: &ObjectId) -> Result<&mut Week, AggregateError> {
        self.weeks
            .iter_mut()
            .find(|week| &week.id == week_id)
            .ok_or(AggregateError::WeekNotFound)
    }

    fn week_index(&self, week_id: &ObjectId) -> Result<usize, AggregateError> {
        self.weeks
            .iter()
            .position(|week| &week.id == week_id)
            .ok_or(AggregateError::WeekNotFound)
    }

    pub fn week(&self, week_id: &ObjectId) -> Option<&Week> {
        self.weeks.iter().find(|week| &week.id == week_id)
    }

    /// Shallow merge; a supplied `weeks` array replaces the current one.
    pub fn apply_update(
        &mut self,
        update: UpdateCourseMetaRequest,
        now: DateTime<Utc>,
    ) -> Result<(), AggregateError> {
        let weeks = update
            .weeks
            .map(|inputs| -> Result<_, AggregateError> {
                let weeks = build_weeks(inputs, &self.weeks, now)?;
                let duration = total_duration(&weeks)?;
                Ok((weeks, duration))
            })
            .transpose()?;

        if let Some(title) = update.title {
            self.title = title;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if let Some(total_weeks) = update.total_weeks {
            self.total_weeks = total_weeks;
        }
        if let Some((weeks, duration)) = weeks {
            self.weeks = weeks;
            self.total_duration = duration;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Appends a week numbered `count + 1` and returns its id.
    pub fn add_week(
        &mut self,
        input: WeekInput,
        now: DateTime<Utc>,
    ) -> Result<ObjectId, AggregateError> {
        let week_number = self.weeks.len() as i32 + 1;
        let mut week = input.into_week(week_number, None, now)?;
        week.week_number = week_number;
        let week_id = week.id;
        if self.week(&week_id).is_some() {
            return Err(duplicate_id("week ID", &week_id));
        }
        let duration = sum_durations(self.weeks.iter().chain(std::iter::once(&week)))?;

        self.weeks.push(week);
        self.total_weeks = self.weeks.len() as i32;
        self.total_duration = duration;
        self.updated_at = now;
        Ok(week_id)
    }

    /// Merges the supplied fields onto the week. `subTopics` / `assignments`
    /// replace the stored arrays wholesale.
    pub fn update_week(
        &mut self,
        week_id: &ObjectId,
        input: WeekInput,
        now: DateTime<Utc>,
    ) -> Result<(), AggregateError> {
        let index = self.week_index(week_id)?;
        let mut week = self.weeks[index].clone();

        let sub_topics = input
            .sub_topics
            .map(|inputs| build_subtopics(inputs, &week.sub_topics, now))
            .transpose()?;
        let assignments = input
            .assignments
            .map(|inputs| build_assignments(inputs, &week.assignments, now))
            .transpose()?;

        if let Some(week_number) = input.week_number {
            week.week_number = week_number;
        }
        if let Some(title) = input.title {
            week.title = title;
        }
        if input.description.is_some() {
            week.description = input.description;
        }
        if let Some(sub_topics) = sub_topics {
            week.sub_topics = sub_topics;
        }
        if let Some(assignments) = assignments {
            week.assignments = assignments;
        }
        week.updated_at = now;

        let duration = sum_durations(
            self.weeks
                .iter()
                .enumerate()
                .map(|(i, w)| if i == index { &week } else { w }),
        )?;
        self.weeks[index] = week;
        self.total_duration = duration;
        self.updated_at = now;
        Ok(())
    }

    /// Removes the week; remaining weeks keep their numbers.
    pub fn delete_week(
        &mut self,
        week_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<(), AggregateError> {
        self.week_index(week_id)?;
        let duration = sum_durations(self.weeks.iter().filter(|week| &week.id != week_id))?;

        self.weeks.retain(|week| &week.id != week_id);
        self.total_weeks = self.weeks.len() as i32;
        self.total_duration = duration;
        self.updated_at = now;
        Ok(())
    }

    /// Sets a sub-topic flag and re-derives the week completion.
    /// Returns false when nothing changed.
    pub fn set_subtopic_completed(
        &mut self,
        week_id: &ObjectId,
        subtopic_id: &ObjectId,
        is_completed: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, AggregateError> {
        let week = self.week_mut(week_id)?;
        let subtopic = week
            .sub_topics
            .iter_mut()
            .find(|st| &st.id == subtopic_id)
            .ok_or(AggregateError::SubTopicNotFound)?;

        let mut changed = false;
        if subtopic.is_completed != is_completed {
            subtopic.is_completed = is_completed;
            subtopic.updated_at = now;
            changed = true;
        }
        if week.refresh_completion(now) {
            changed = true;
        }
        if changed {
            week.updated_at = now;
            self.updated_at = now;
        }
        Ok(changed)
    }

    pub fn set_assignment_submitted(
        &mut self,
        week_id: &ObjectId,
        assignment_id: &ObjectId,
        is_submitted: bool,
        submitted_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), AggregateError> {
        let week = self.week_mut(week_id)?;
        let assignment = week
            .assignments
            .iter_mut()
            .find(|a| &a.id == assignment_id)
            .ok_or(AggregateError::AssignmentNotFound)?;

        assignment.is_submitted = is_submitted;
        assignment.submitted_at = if is_submitted {
            Some(submitted_at.unwrap_or(now))
        } else {
            None
        };
        assignment.updated_at = now;
        week.updated_at = now;
        self.updated_at = now;
        Ok(())
    }

    /// One-way publish; republishing only moves `publishedAt`.
    pub fn publish(&mut self, now: DateTime<Utc>) {
        self.is_published = true;
        self.published_at = Some(now);
        self.updated_at = now;
    }
}

fn validate_link(link: &str) -> Result<(), ValidationError> {
    if link.is_empty() || LINK_REGEX.is_match(link) {
        Ok(())
    } else {
        let mut err = ValidationError::new("url");
        err.message = Some("Link must be a valid URL starting with http:// or https://".into());
        Err(err)
    }
}

fn duplicate_id(field: &str, id: &ObjectId) -> AggregateError {
    AggregateError::Validation(format!("Duplicate {}: {}", field, id.to_hex()))
}

/// Nested ids address entries inside the aggregate, so each must appear once.
fn ensure_unique_ids<'a>(
    ids: impl Iterator<Item = &'a ObjectId>,
    field: &str,
) -> Result<(), AggregateError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(*id) {
            return Err(duplicate_id(field, id));
        }
    }
    Ok(())
}

fn parse_nested_id(raw: Option<&str>, field: &str) -> Result<ObjectId, AggregateError> {
    match raw {
        Some(raw) => Ok(parse_object_id(raw, field)?),
        None => Ok(ObjectId::new()),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubTopicInput {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Sub-topic title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub video_url: Option<String>,

    #[validate(custom(function = "validate_link"))]
    pub link: Option<String>,

    #[validate(range(
        min = 0,
        max = 525_600,
        message = "Duration must be between 0 and 525600 minutes"
    ))]
    pub duration: Option<i64>,

    pub is_completed: Option<bool>,

    #[validate(range(min = 1, message = "Order must be at least 1"))]
    pub order: Option<i32>,
}

impl SubTopicInput {
    pub fn normalized(mut self) -> Self {
        self.id = trim_optional(self.id);
        self.title = self.title.trim().to_string();
        self.description = trim_optional(self.description);
        self.video_url = trim_optional(self.video_url);
        self.link = trim_optional(self.link);
        self
    }

    fn into_subtopic(
        self,
        position: usize,
        existing: &[SubTopic],
        now: DateTime<Utc>,
    ) -> Result<SubTopic, AggregateError> {
        let id = parse_nested_id(self.id.as_deref(), "sub-topic ID")?;
        let previous = existing.iter().find(|st| st.id == id);

        Ok(SubTopic {
            id,
            title: self.title,
            description: self.description,
            video_url: self.video_url,
            link: self.link,
            duration: self.duration,
            is_completed: self
                .is_completed
                .or(previous.map(|p| p.is_completed))
                .unwrap_or(false),
            order: self
                .order
                .or(previous.map(|p| p.order))
                .unwrap_or(position as i32 + 1),
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Assignment title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 1000,
        message = "Assignment description is required (max 1000 characters)"
    ))]
    pub description: String,

    pub assignment_url: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(range(min = 0, message = "Max marks must be non-negative"))]
    pub max_marks: Option<i64>,

    pub is_submitted: Option<bool>,

    pub submitted_at: Option<DateTime<Utc>>,

    #[validate(range(min = 0, message = "Marks obtained must be non-negative"))]
    pub marks_obtained: Option<i64>,

    #[validate(length(max = 500, message = "Feedback must be at most 500 characters"))]
    pub feedback: Option<String>,

    #[validate(range(min = 1, message = "Order must be at least 1"))]
    pub order: Option<i32>,
}

impl AssignmentInput {
    pub fn normalized(mut self) -> Self {
        self.id = trim_optional(self.id);
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.assignment_url = trim_optional(self.assignment_url);
        self.feedback = trim_optional(self.feedback);
        self
    }

    fn into_assignment(
        self,
        position: usize,
        existing: &[Assignment],
        now: DateTime<Utc>,
    ) -> Result<Assignment, AggregateError> {
        let id = parse_nested_id(self.id.as_deref(), "assignment ID")?;
        let previous = existing.iter().find(|a| a.id == id);

        let is_submitted = self
            .is_submitted
            .or(previous.map(|p| p.is_submitted))
            .unwrap_or(false);
        let submitted_at = if is_submitted {
            self.submitted_at
                .or(previous.and_then(|p| p.submitted_at))
                .or(Some(now))
        } else {
            None
        };

        Ok(Assignment {
            id,
            title: self.title,
            description: self.description,
            assignment_url: self.assignment_url,
            due_date: self.due_date,
            max_marks: self.max_marks,
            is_submitted,
            submitted_at,
            marks_obtained: self.marks_obtained,
            feedback: self.feedback,
            order: self
                .order
                .or(previous.map(|p| p.order))
                .unwrap_or(position as i32 + 1),
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

/// Week payload used both for new weeks and for partial week updates.
/// Completion fields are server-owned and not accepted from clients.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WeekInput {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,

    #[validate(range(min = 1, message = "Week number must be at least 1"))]
    pub week_number: Option<i32>,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Week title must be between 1 and 200 characters"
    ))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[validate(nested)]
    pub sub_topics: Option<Vec<SubTopicInput>>,

    #[validate(nested)]
    pub assignments: Option<Vec<AssignmentInput>>,
}

impl WeekInput {
    pub fn normalized(mut self) -> Self {
        self.id = trim_optional(self.id);
        self.title = self.title.map(|t| t.trim().to_string());
        self.description = trim_optional(self.description);
        self.sub_topics = self
            .sub_topics
            .map(|items| items.into_iter().map(SubTopicInput::normalized).collect());
        self.assignments = self
            .assignments
            .map(|items| items.into_iter().map(AssignmentInput::normalized).collect());
        self
    }

    fn into_week(
        self,
        default_number: i32,
        previous: Option<&Week>,
        now: DateTime<Utc>,
    ) -> Result<Week, AggregateError> {
        let title = self
            .title
            .ok_or_else(|| AggregateError::Validation("Week title is required".to_string()))?;
        let id = match previous {
            Some(week) => week.id,
            None => parse_nested_id(self.id.as_deref(), "week ID")?,
        };
        let sub_topics = build_subtopics(
            self.sub_topics.unwrap_or_default(),
            previous.map(|w| w.sub_topics.as_slice()).unwrap_or_default(),
            now,
        )?;
        let assignments = build_assignments(
            self.assignments.unwrap_or_default(),
            previous.map(|w| w.assignments.as_slice()).unwrap_or_default(),
            now,
        )?;

        Ok(Week {
            id,
            week_number: self
                .week_number
                .or(previous.map(|w| w.week_number))
                .unwrap_or(default_number),
            title,
            description: self.description,
            sub_topics,
            assignments,
            is_completed: previous.map(|w| w.is_completed).unwrap_or(false),
            completed_at: previous.and_then(|w| w.completed_at),
            created_at: previous.map(|w| w.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

fn build_subtopics(
    inputs: Vec<SubTopicInput>,
    existing: &[SubTopic],
    now: DateTime<Utc>,
) -> Result<Vec<SubTopic>, AggregateError> {
    let sub_topics: Vec<SubTopic> = inputs
        .into_iter()
        .enumerate()
        .map(|(position, input)| input.into_subtopic(position, existing, now))
        .collect::<Result<_, _>>()?;
    ensure_unique_ids(sub_topics.iter().map(|st| &st.id), "sub-topic ID")?;
    Ok(sub_topics)
}

fn build_assignments(
    inputs: Vec<AssignmentInput>,
    existing: &[Assignment],
    now: DateTime<Utc>,
) -> Result<Vec<Assignment>, AggregateError> {
    let assignments: Vec<Assignment> = inputs
        .into_iter()
        .enumerate()
        .map(|(position, input)| input.into_assignment(position, existing, now))
        .collect::<Result<_, _>>()?;
    ensure_unique_ids(assignments.iter().map(|a| &a.id), "assignment ID")?;
    Ok(assignments)
}

/// Builds a full replacement week list, reusing stored weeks matched by id.
fn build_weeks(
    inputs: Vec<WeekInput>,
    existing: &[Week],
    now: DateTime<Utc>,
) -> Result<Vec<Week>, AggregateError> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(position, input)| {
            let previous = match input.id.as_deref() {
                Some(raw) => {
                    let id = parse_object_id(raw, "week ID")?;
                    existing.iter().find(|w| w.id == id)
                }
                None => None,
            };
            input.into_week(position as i32 + 1, previous, now)
        })
        .collect::<Result<Vec<_>, _>>()
        .and_then(|weeks| {
            ensure_unique_ids(weeks.iter().map(|w| &w.id), "week ID")?;
            Ok(weeks)
        })
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseMetaRequest {
    pub course_id: String,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Total weeks must be non-negative"))]
    pub total_weeks: Option<i32>,

    #[validate(nested)]
    pub weeks: Option<Vec<WeekInput>>,
}

impl CreateCourseMetaRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = trim_optional(self.description);
        self.weeks = self
            .weeks
            .map(|weeks| weeks.into_iter().map(WeekInput::normalized).collect());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseMetaRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Total weeks must be non-negative"))]
    pub total_weeks: Option<i32>,

    #[validate(nested)]
    pub weeks: Option<Vec<WeekInput>>,
}

impl UpdateCourseMetaRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self.description = trim_optional(self.description);
        self.weeks = self
            .weeks
            .map(|weeks| weeks.into_iter().map(WeekInput::normalized).collect());
        self
    }
}

/// `{ "weekData": { ... } }` body of the week endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekDataBody {
    pub week_data: WeekInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleSubtopicRequest {
    pub is_completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssignmentRequest {
    pub is_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCourseMetaQuery {
    pub published: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTopicView {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    pub is_completed: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubTopic> for SubTopicView {
    fn from(st: SubTopic) -> Self {
        SubTopicView {
            id: st.id.to_hex(),
            title: st.title,
            description: st.description,
            video_url: st.video_url,
            link: st.link,
            duration: st.duration,
            is_completed: st.is_completed,
            order: st.order,
            created_at: st.created_at,
            updated_at: st.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<i64>,
    pub is_submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks_obtained: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Assignment> for AssignmentView {
    fn from(a: Assignment) -> Self {
        AssignmentView {
            id: a.id.to_hex(),
            title: a.title,
            description: a.description,
            assignment_url: a.assignment_url,
            due_date: a.due_date,
            max_marks: a.max_marks,
            is_submitted: a.is_submitted,
            submitted_at: a.submitted_at,
            marks_obtained: a.marks_obtained,
            feedback: a.feedback,
            order: a.order,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekView {
    pub id: String,
    pub week_number: i32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sub_topics: Vec<SubTopicView>,
    pub assignments: Vec<AssignmentView>,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Week> for WeekView {
    fn from(week: Week) -> Self {
        WeekView {
            id: week.id.to_hex(),
            week_number: week.week_number,
            title: week.title,
            description: week.description,
            sub_topics: week.sub_topics.into_iter().map(Into::into).collect(),
            assignments: week.assignments.into_iter().map(Into::into).collect(),
            is_completed: week.is_completed,
            completed_at: week.completed_at,
            created_at: week.created_at,
            updated_at: week.updated_at,
        }
    }
}

/// Course meta as returned by the API: references resolved, progress derived.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMetaResponse {
    pub id: String,
    /// Resolved course; `null` when the course was deleted
    pub course_id: Option<CourseSummary>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub total_weeks: i32,
    pub total_duration: i64,
    pub weeks: Vec<WeekView>,
    pub is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserSummary>,
    pub version: i64,
    pub completion_percentage: u32,
    pub total_assignments: usize,
    pub submitted_assignments: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseMetaResponse {
    pub fn from_meta(
        meta: CourseMeta,
        course: Option<CourseSummary>,
        created_by: Option<UserSummary>,
    ) -> Self {
        let completion_percentage = meta.completion_percentage();
        let total_assignments = meta.total_assignments();
        let submitted_assignments = meta.submitted_assignments();

        CourseMetaResponse {
            id: meta.id.to_hex(),
            course_id: course,
            title: meta.title,
            description: meta.description,
            total_weeks: meta.total_weeks,
            total_duration: meta.total_duration,
            weeks: meta.weeks.into_iter().map(Into::into).collect(),
            is_published: meta.is_published,
            published_at: meta.published_at,
            created_by,
            version: meta.version,
            completion_percentage,
            total_assignments,
            submitted_assignments,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn empty_meta() -> CourseMeta {
        let req = CreateCourseMetaRequest {
            course_id: ObjectId::new().to_hex(),
            title: "Rust Basics".to_string(),
            description: None,
            total_weeks: Some(0),
            weeks: Some(Vec::new()),
        };
        CourseMeta::new(ObjectId::new(), ObjectId::new(), req, Utc::now()).unwrap()
    }

    fn week_titled(title: &str) -> WeekInput {
        WeekInput {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn subtopic(title: &str, duration: Option<i64>) -> SubTopicInput {
        SubTopicInput {
            title: title.to_string(),
            duration,
            ..Default::default()
        }
    }

    fn assignment(title: &str) -> AssignmentInput {
        AssignmentInput {
            title: title.to_string(),
            description: "Write it".to_string(),
            max_marks: Some(100),
            ..Default::default()
        }
    }

    /// Meta with one week holding two sub-topics (10 and 20 minutes).
    fn meta_with_two_subtopics() -> (CourseMeta, ObjectId) {
        let mut meta = empty_meta();
        let week_id = meta.add_week(week_titled("Intro"), Utc::now()).unwrap();
        let patch = WeekInput {
            sub_topics: Some(vec![subtopic("Ownership", Some(10)), subtopic("Borrowing", Some(20))]),
            ..Default::default()
        };
        meta.update_week(&week_id, patch, Utc::now()).unwrap();
        (meta, week_id)
    }

    #[test]
    fn completion_percentage_is_zero_without_subtopics() {
        assert_eq!(completion_percentage(&[]), 0);
        assert_eq!(empty_meta().completion_percentage(), 0);
    }

    #[test]
    fn completion_percentage_rounds_half_up() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let patch = WeekInput {
            sub_topics: Some(vec![
                subtopic("a", None),
                subtopic("b", None),
                subtopic("c", None),
            ]),
            ..Default::default()
        };
        meta.update_week(&week_id, patch, Utc::now()).unwrap();
        let first = meta.weeks[0].sub_topics[0].id;
        meta.set_subtopic_completed(&week_id, &first, true, Utc::now())
            .unwrap();
        // 1/3 -> 33.33
        assert_eq!(meta.completion_percentage(), 33);

        let second = meta.weeks[0].sub_topics[1].id;
        meta.set_subtopic_completed(&week_id, &second, true, Utc::now())
            .unwrap();
        // 2/3 -> 66.67
        assert_eq!(meta.completion_percentage(), 67);
    }

    #[test]
    fn create_uses_week_count_when_total_weeks_absent() {
        let req = CreateCourseMetaRequest {
            course_id: ObjectId::new().to_hex(),
            title: "Rust".to_string(),
            description: None,
            total_weeks: None,
            weeks: Some(vec![
                WeekInput {
                    title: Some("One".to_string()),
                    sub_topics: Some(vec![subtopic("a", Some(15)), subtopic("b", None)]),
                    ..Default::default()
                },
                week_titled("Two"),
            ]),
        };
        let meta = CourseMeta::new(ObjectId::new(), ObjectId::new(), req, Utc::now()).unwrap();
        assert_eq!(meta.total_weeks, 2);
        assert_eq!(meta.total_duration, 15);
        assert_eq!(meta.weeks[0].week_number, 1);
        assert_eq!(meta.weeks[1].week_number, 2);
        assert_eq!(meta.weeks[0].sub_topics[1].order, 2);
    }

    #[test]
    fn add_week_assigns_sequential_number() {
        let mut meta = empty_meta();
        meta.add_week(week_titled("Intro"), Utc::now()).unwrap();
        assert_eq!(meta.total_weeks, 1);
        assert_eq!(meta.weeks[0].week_number, 1);
        assert_eq!(meta.total_duration, 0);
        assert!(!meta.weeks[0].is_completed);
    }

    #[test]
    fn add_week_ignores_client_week_number() {
        let mut meta = empty_meta();
        let mut input = week_titled("Intro");
        input.week_number = Some(7);
        meta.add_week(input, Utc::now()).unwrap();
        assert_eq!(meta.weeks[0].week_number, 1);
    }

    #[test]
    fn add_week_requires_title() {
        let mut meta = empty_meta();
        let err = meta.add_week(WeekInput::default(), Utc::now()).unwrap_err();
        assert_eq!(err, AggregateError::Validation("Week title is required".to_string()));
        assert!(meta.weeks.is_empty());
    }

    #[test]
    fn deleting_a_week_leaves_gaps_in_numbering() {
        let mut meta = empty_meta();
        let first = meta.add_week(week_titled("One"), Utc::now()).unwrap();
        meta.add_week(week_titled("Two"), Utc::now()).unwrap();
        meta.delete_week(&first, Utc::now()).unwrap();

        assert_eq!(meta.total_weeks, 1);
        assert_eq!(meta.weeks[0].week_number, 2);

        let third = meta.add_week(week_titled("Three"), Utc::now()).unwrap();
        assert_eq!(meta.week(&third).unwrap().week_number, 2);
    }

    #[test]
    fn delete_unknown_week_is_not_found() {
        let mut meta = empty_meta();
        assert_eq!(
            meta.delete_week(&ObjectId::new(), Utc::now()),
            Err(AggregateError::WeekNotFound)
        );
    }

    #[test]
    fn update_week_recomputes_duration() {
        let (meta, _) = meta_with_two_subtopics();
        assert_eq!(meta.total_duration, 30);
        assert_eq!(meta.weeks[0].sub_topics[0].order, 1);
        assert_eq!(meta.weeks[0].sub_topics[1].order, 2);
    }

    #[test]
    fn update_week_keeps_progress_of_existing_subtopics() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let first = meta.weeks[0].sub_topics[0].id;
        meta.set_subtopic_completed(&week_id, &first, true, Utc::now())
            .unwrap();

        // Client echoes the array back and appends one entry.
        let mut echoed: Vec<SubTopicInput> = meta.weeks[0]
            .sub_topics
            .iter()
            .map(|st| SubTopicInput {
                id: Some(st.id.to_hex()),
                title: st.title.clone(),
                duration: st.duration,
                ..Default::default()
            })
            .collect();
        echoed.push(subtopic("Lifetimes", Some(5)));
        let patch = WeekInput {
            sub_topics: Some(echoed),
            ..Default::default()
        };
        meta.update_week(&week_id, patch, Utc::now()).unwrap();

        let week = meta.week(&week_id).unwrap();
        assert!(week.sub_topics[0].is_completed);
        assert_eq!(week.sub_topics[0].id, first);
        assert_eq!(week.sub_topics[2].order, 3);
        assert_eq!(meta.total_duration, 35);
    }

    #[test]
    fn update_unknown_week_is_not_found() {
        let mut meta = empty_meta();
        let err = meta
            .update_week(&ObjectId::new(), week_titled("x"), Utc::now())
            .unwrap_err();
        assert_eq!(err, AggregateError::WeekNotFound);
    }

    #[test]
    fn week_completes_when_all_subtopics_complete_and_reverts() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let first = meta.weeks[0].sub_topics[0].id;
        let second = meta.weeks[0].sub_topics[1].id;

        meta.set_subtopic_completed(&week_id, &first, true, Utc::now())
            .unwrap();
        assert_eq!(meta.completion_percentage(), 50);
        assert!(!meta.weeks[0].is_completed);
        assert!(meta.weeks[0].completed_at.is_none());

        meta.set_subtopic_completed(&week_id, &second, true, Utc::now())
            .unwrap();
        assert_eq!(meta.completion_percentage(), 100);
        assert!(meta.weeks[0].is_completed);
        assert!(meta.weeks[0].completed_at.is_some());

        meta.set_subtopic_completed(&week_id, &second, false, Utc::now())
            .unwrap();
        assert!(!meta.weeks[0].is_completed);
        assert!(meta.weeks[0].completed_at.is_none());
        assert_eq!(meta.completion_percentage(), 50);
    }

    #[test]
    fn completing_twice_is_a_no_op() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let ids: Vec<ObjectId> = meta.weeks[0].sub_topics.iter().map(|st| st.id).collect();
        let first_at = Utc::now();
        for id in &ids {
            meta.set_subtopic_completed(&week_id, id, true, first_at)
                .unwrap();
        }
        let snapshot = meta.clone();

        let later = first_at + Duration::minutes(5);
        let changed = meta
            .set_subtopic_completed(&week_id, &ids[0], true, later)
            .unwrap();
        assert!(!changed);
        assert_eq!(meta, snapshot);
        assert_eq!(meta.weeks[0].completed_at, Some(first_at));
    }

    #[test]
    fn toggle_requires_every_level_to_resolve() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        assert_eq!(
            meta.set_subtopic_completed(&ObjectId::new(), &ObjectId::new(), true, Utc::now()),
            Err(AggregateError::WeekNotFound)
        );
        assert_eq!(
            meta.set_subtopic_completed(&week_id, &ObjectId::new(), true, Utc::now()),
            Err(AggregateError::SubTopicNotFound)
        );
    }

    #[test]
    fn assignment_submission_counts() {
        let mut meta = empty_meta();
        let week_id = meta
            .add_week(
                WeekInput {
                    title: Some("Intro".to_string()),
                    assignments: Some(vec![assignment("Homework 1")]),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        let assignment_id = meta.weeks[0].assignments[0].id;
        assert_eq!(meta.total_assignments(), 1);
        assert_eq!(meta.submitted_assignments(), 0);

        let supplied = Utc::now() - Duration::hours(1);
        meta.set_assignment_submitted(&week_id, &assignment_id, true, Some(supplied), Utc::now())
            .unwrap();
        assert_eq!(meta.submitted_assignments(), 1);
        assert_eq!(meta.weeks[0].assignments[0].submitted_at, Some(supplied));

        meta.set_assignment_submitted(&week_id, &assignment_id, false, None, Utc::now())
            .unwrap();
        assert_eq!(meta.submitted_assignments(), 0);
        assert_eq!(meta.weeks[0].assignments[0].submitted_at, None);

        assert_eq!(
            meta.set_assignment_submitted(&week_id, &ObjectId::new(), true, None, Utc::now()),
            Err(AggregateError::AssignmentNotFound)
        );
    }

    #[test]
    fn publish_is_one_way_and_moves_timestamp() {
        let mut meta = empty_meta();
        let first = Utc::now();
        meta.publish(first);
        let second = first + Duration::seconds(30);
        meta.publish(second);
        assert!(meta.is_published);
        assert_eq!(meta.published_at, Some(second));
    }

    #[test]
    fn whole_update_replaces_weeks_and_recomputes_duration() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let update = UpdateCourseMetaRequest {
            title: Some("Rust Advanced".to_string()),
            weeks: Some(vec![WeekInput {
                id: Some(week_id.to_hex()),
                title: Some("Intro".to_string()),
                sub_topics: Some(vec![subtopic("Only", Some(45))]),
                ..Default::default()
            }]),
            ..Default::default()
        };
        meta.apply_update(update, Utc::now()).unwrap();
        assert_eq!(meta.title, "Rust Advanced");
        assert_eq!(meta.total_duration, 45);
        assert_eq!(meta.weeks[0].id, week_id);
        assert_eq!(meta.weeks[0].week_number, 1);
        // totalWeeks is only changed when supplied
        assert_eq!(meta.total_weeks, 1);
    }

    #[test]
    fn invalid_nested_id_fails_without_mutation() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let before = meta.clone();
        let patch = WeekInput {
            sub_topics: Some(vec![SubTopicInput {
                id: Some("xyz".to_string()),
                title: "Bad".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let err = meta.update_week(&week_id, patch, Utc::now()).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidId(_)));
        assert_eq!(meta, before);
    }

    #[test]
    fn link_must_be_http_url() {
        let mut input = subtopic("Docs", None);
        input.link = Some("not-a-url".to_string());
        assert!(input.validate().is_err());

        input.link = Some("https://doc.rust-lang.org".to_string());
        assert!(input.validate().is_ok());

        input.link = Some(String::new());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn nested_validation_reaches_subtopics() {
        let week = WeekInput {
            title: Some("Intro".to_string()),
            sub_topics: Some(vec![SubTopicInput {
                title: "Docs".to_string(),
                link: Some("ftp://files".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert!(week.validate().is_err());
    }

    #[test]
    fn assignment_description_is_required() {
        let mut input = assignment("Homework");
        input.description = "   ".to_string();
        let input = input.normalized();
        assert!(input.validate().is_err());
    }

    #[test]
    fn negative_duration_is_rejected() {
        let input = subtopic("Negative", Some(-5));
        assert!(input.validate().is_err());
    }

    #[test]
    fn duration_is_bounded_to_a_year() {
        assert!(subtopic("Long", Some(MAX_SUBTOPIC_DURATION)).validate().is_ok());
        assert!(subtopic("Longer", Some(MAX_SUBTOPIC_DURATION + 1))
            .validate()
            .is_err());
        assert!(subtopic("Huge", Some(i64::MAX)).validate().is_err());
    }

    #[test]
    fn overflowing_duration_sum_is_rejected_on_create() {
        let req = CreateCourseMetaRequest {
            course_id: ObjectId::new().to_hex(),
            title: "Overflow".to_string(),
            description: None,
            total_weeks: None,
            weeks: Some(vec![WeekInput {
                title: Some("Intro".to_string()),
                sub_topics: Some(vec![subtopic("A", Some(i64::MAX)), subtopic("B", Some(1))]),
                ..Default::default()
            }]),
        };
        let err = CourseMeta::new(ObjectId::new(), ObjectId::new(), req, Utc::now()).unwrap_err();
        assert!(matches!(err, AggregateError::Validation(_)));
    }

    #[test]
    fn overflowing_duration_sum_leaves_aggregate_unchanged() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let before = meta.clone();

        let patch = WeekInput {
            sub_topics: Some(vec![subtopic("A", Some(i64::MAX)), subtopic("B", Some(1))]),
            ..Default::default()
        };
        let err = meta.update_week(&week_id, patch, Utc::now()).unwrap_err();
        assert_eq!(err, AggregateError::Validation("Total duration is too large".to_string()));
        assert_eq!(meta, before);

        let mut week = week_titled("Huge");
        week.sub_topics = Some(vec![subtopic("A", Some(i64::MAX))]);
        assert!(meta.add_week(week, Utc::now()).is_err());
        assert_eq!(meta, before);
    }

    #[test]
    fn duplicate_subtopic_ids_are_rejected() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let before = meta.clone();
        let shared = ObjectId::new().to_hex();
        let patch = WeekInput {
            sub_topics: Some(vec![
                SubTopicInput {
                    id: Some(shared.clone()),
                    ..subtopic("One", Some(5))
                },
                SubTopicInput {
                    id: Some(shared.clone()),
                    ..subtopic("Two", Some(5))
                },
            ]),
            ..Default::default()
        };

        let err = meta.update_week(&week_id, patch, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            AggregateError::Validation(format!("Duplicate sub-topic ID: {}", shared))
        );
        assert_eq!(meta, before);
    }

    #[test]
    fn duplicate_assignment_ids_are_rejected() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let shared = ObjectId::new().to_hex();
        let patch = WeekInput {
            assignments: Some(vec![
                AssignmentInput {
                    id: Some(shared.clone()),
                    ..assignment("First")
                },
                AssignmentInput {
                    id: Some(shared),
                    ..assignment("Second")
                },
            ]),
            ..Default::default()
        };

        let err = meta.update_week(&week_id, patch, Utc::now()).unwrap_err();
        assert!(matches!(err, AggregateError::Validation(msg) if msg.starts_with("Duplicate assignment ID")));
    }

    #[test]
    fn duplicate_week_ids_are_rejected() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let repeated = WeekInput {
            id: Some(week_id.to_hex()),
            ..week_titled("Intro")
        };
        let update = UpdateCourseMetaRequest {
            weeks: Some(vec![repeated.clone(), repeated.clone()]),
            ..Default::default()
        };
        assert!(meta.apply_update(update, Utc::now()).is_err());

        // A new week may not reuse an id already present in the aggregate.
        let err = meta.add_week(repeated, Utc::now()).unwrap_err();
        assert!(matches!(err, AggregateError::Validation(msg) if msg.starts_with("Duplicate week ID")));
        assert_eq!(meta.weeks.len(), 1);
    }

    #[test]
    fn response_carries_derived_fields() {
        let (mut meta, week_id) = meta_with_two_subtopics();
        let first = meta.weeks[0].sub_topics[0].id;
        meta.set_subtopic_completed(&week_id, &first, true, Utc::now())
            .unwrap();
        let response = CourseMetaResponse::from_meta(meta, None, None);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["completionPercentage"], 50);
        assert_eq!(json["totalDuration"], 30);
        assert_eq!(json["totalAssignments"], 0);
        assert!(json["courseId"].is_null());
        assert_eq!(json["weeks"][0]["subTopics"][0]["isCompleted"], true);
        assert_eq!(json["weeks"][0]["weekNumber"], 1);
    }
}
