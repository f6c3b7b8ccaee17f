use crate::domain::clock;
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id with a readable prefix, e.g. `ses-1719855600000000-42`.
pub fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Verified,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Verified => "VERIFIED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Some(Self::Scheduled),
            "COMPLETED" => Some(Self::Completed),
            "VERIFIED" => Some(Self::Verified),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// One scheduled teaching event. Verification fields stay empty until the
/// session is VERIFIED; the cancellation reason stays empty unless CANCELLED.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingSession {
    pub id: String,
    pub topic: String,
    pub planned_topics: Vec<String>,
    pub batch: String,
    pub year: u8,
    pub venue: String,
    pub trainer_id: String,
    pub trainer_name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: SessionStatus,
    pub cancellation_reason: Option<String>,
    pub actual_start_time: Option<String>,
    pub actual_end_time: Option<String>,
    pub topic_covered: Option<bool>,
    pub verified_topics: Vec<String>,
    pub is_late: Option<bool>,
}

impl TrainingSession {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "session.id")?;
        validate_non_empty(&self.topic, "session.topic")?;
        validate_non_empty(&self.batch, "session.batch")?;
        validate_non_empty(&self.venue, "session.venue")?;
        validate_date(&self.date, "session.date")?;
        validate_hhmm(&self.start_time, "session.start_time")?;
        validate_hhmm(&self.end_time, "session.end_time")?;
        if !(1..=4).contains(&self.year) {
            return Err("session.year must be between 1 and 4".to_string());
        }
        let start = clock::minute_of_day(&self.start_time);
        let end = clock::minute_of_day(&self.end_time);
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                return Err("session.end_time must be after session.start_time".to_string());
            }
        }
        Ok(())
    }

    pub fn weekday(&self) -> Option<Weekday> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .ok()
            .map(|date| date.weekday())
    }

    /// Sub-topics that verification checks off. Falls back to the main topic
    /// when the trainer declared no granular list.
    pub fn available_topics(&self) -> Vec<String> {
        if self.planned_topics.is_empty() {
            vec![self.topic.clone()]
        } else {
            self.planned_topics.clone()
        }
    }

    pub fn trainer_unassigned(&self) -> bool {
        self.trainer_name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarDayType {
    Instruction,
    Holiday,
    Exam,
}

impl CalendarDayType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instruction => "INSTRUCTION",
            Self::Holiday => "HOLIDAY",
            Self::Exam => "EXAM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INSTRUCTION" => Some(Self::Instruction),
            "HOLIDAY" => Some(Self::Holiday),
            "EXAM" => Some(Self::Exam),
            _ => None,
        }
    }
}

/// One almanac date's classification. The day-of-week name is derived from
/// the date rather than stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcademicCalendarDay {
    pub date: String,
    pub day_type: CalendarDayType,
    pub description: String,
}

impl AcademicCalendarDay {
    pub fn weekday(&self) -> Option<Weekday> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .ok()
            .map(|date| date.weekday())
    }

    pub fn day_name(&self) -> Option<&'static str> {
        self.weekday().map(weekday_name)
    }
}

/// A one-week-representative session pattern entry. The weekday slot is
/// explicit; concrete dates and ids are assigned only during expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSession {
    pub weekday: Weekday,
    pub topic: String,
    pub planned_topics: Vec<String>,
    pub batch: String,
    pub year: u8,
    pub venue: String,
    pub trainer_id: String,
    pub trainer_name: String,
    pub start_time: String,
    pub end_time: String,
}

impl TemplateSession {
    /// Materializes the template onto a concrete instruction date with a
    /// fresh id and SCHEDULED status.
    pub fn to_session(&self, date: &str) -> TrainingSession {
        TrainingSession {
            id: next_id("ses"),
            topic: self.topic.clone(),
            planned_topics: self.planned_topics.clone(),
            batch: self.batch.clone(),
            year: self.year,
            venue: self.venue.clone(),
            trainer_id: self.trainer_id.clone(),
            trainer_name: self.trainer_name.clone(),
            date: date.to_string(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            status: SessionStatus::Scheduled,
            cancellation_reason: None,
            actual_start_time: None,
            actual_end_time: None,
            topic_covered: None,
            verified_topics: Vec::new(),
            is_late: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrainerType {
    #[serde(rename = "INTERNAL")]
    Internal,
    #[serde(rename = "EXTERNAL")]
    External,
    #[serde(rename = "VENDOR")]
    Vendor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainerMapping {
    pub trainer_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub trainer_type: TrainerType,
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VenueMapping {
    pub id: String,
    pub name: String,
    pub department: String,
    pub poc: String,
    pub is_exclusive_tnp: bool,
    pub capacity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumMapping {
    pub department: String,
    pub semester: u8,
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionSlot {
    #[serde(rename = "FN")]
    Forenoon,
    #[serde(rename = "AN")]
    Afternoon,
    #[serde(rename = "FULL_DAY")]
    FullDay,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimingRule {
    pub semester: u8,
    pub session: SessionSlot,
    pub start_time: String,
    pub end_time: String,
}

impl TimingRule {
    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.start_time, "timing.start_time")?;
        validate_hhmm(&self.end_time, "timing.end_time")?;
        if !(1..=8).contains(&self.semester) {
            return Err("timing.semester must be between 1 and 8".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrainingType {
    #[serde(rename = "REGULAR")]
    Regular,
    #[serde(rename = "ADVANCED")]
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingTypeMapping {
    pub training_type: TrainingType,
    pub course: String,
    pub allowed_trainer_types: Vec<TrainerType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub roll_no: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionDetails {
    pub id: String,
    pub department: String,
    pub section: String,
    pub semester: u8,
    pub total_strength: u32,
    #[serde(default)]
    pub students: Vec<Student>,
}

/// The configuration bundle handed to the pattern generator boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetupBundle {
    pub trainers: Vec<TrainerMapping>,
    pub venues: Vec<VenueMapping>,
    pub curriculum: Vec<CurriculumMapping>,
    pub timings: Vec<TimingRule>,
    pub training_types: Vec<TrainingTypeMapping>,
    pub sections: Vec<SectionDetails>,
}

pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    if clock::minute_of_day(value).is_none() {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}

pub fn validate_date(value: &str, field_name: &str) -> Result<(), String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))?;
    Ok(())
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn sample_session() -> TrainingSession {
    TrainingSession {
        id: "ses-1".to_string(),
        topic: "Advanced Graph Algorithms".to_string(),
        planned_topics: vec![
            "BFS Implementation".to_string(),
            "DFS Recursive".to_string(),
            "Shortest Path Intro".to_string(),
        ],
        batch: "CSE-A+B".to_string(),
        year: 3,
        venue: "E-301".to_string(),
        trainer_id: "T1".to_string(),
        trainer_name: "Dr. S. Rao".to_string(),
        date: "2025-07-07".to_string(),
        start_time: "09:00".to_string(),
        end_time: "12:40".to_string(),
        status: SessionStatus::Scheduled,
        cancellation_reason: None,
        actual_start_time: None,
        actual_end_time: None,
        topic_covered: None,
        verified_topics: Vec::new(),
        is_late: None,
    }
}
