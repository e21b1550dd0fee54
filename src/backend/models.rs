//! Study record types
//!
//! Transient copies of records owned by the study backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Marks records the assistant created
pub const ASSISTANT_SOURCE: &str = "assistant";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    pub title: String,
    pub date: NaiveDate,
}

/// Body of `POST /study-sessions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStudySession {
    pub title: String,
    pub subject: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Body of `POST /practice-tasks`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPracticeTask {
    pub title: String,
    pub subject: String,
    pub due_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub source: Option<String>,
}
