//! Typed tool arguments
//!
//! The model's JSON is deserialized into these types and validated before
//! anything is written to the backend.

use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{NewPracticeTask, NewStudySession, ASSISTANT_SOURCE};
use crate::relay::ToolError;

/// Longest session or task estimate the assistant may create
pub const MAX_MINUTES: u32 = 600;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudySessionArgs {
    pub subject: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateStudySessionArgs {
    pub fn into_request(self) -> Result<NewStudySession, ToolError> {
        let title = required("title", &self.title)?;
        let subject = required("subject", &self.subject)?;
        let duration_minutes = minutes("duration_minutes", self.duration_minutes)?;
        let start_time = self.start_time.as_deref().map(parse_time).transpose()?;

        Ok(NewStudySession {
            title,
            subject,
            date: self.date,
            start_time,
            duration_minutes,
            notes: non_blank(self.notes),
            source: ASSISTANT_SOURCE.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePracticeTaskArgs {
    pub subject: String,
    pub title: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
}

impl CreatePracticeTaskArgs {
    pub fn into_request(self) -> Result<NewPracticeTask, ToolError> {
        let title = required("title", &self.title)?;
        let subject = required("subject", &self.subject)?;
        let estimated_minutes = self
            .estimated_minutes
            .map(|m| minutes("estimated_minutes", m))
            .transpose()?;

        Ok(NewPracticeTask {
            title,
            subject,
            due_date: self.due_date,
            description: non_blank(self.description),
            estimated_minutes,
            source: ASSISTANT_SOURCE.to_string(),
        })
    }
}

/// Deserialize a call's arguments object
pub fn parse_args<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolError> {
    T::deserialize(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn required(field: &str, value: &str) -> Result<String, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArguments(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}

fn minutes(field: &str, value: u32) -> Result<u32, ToolError> {
    if value == 0 || value > MAX_MINUTES {
        return Err(ToolError::InvalidArguments(format!(
            "{} must be between 1 and {}",
            field, MAX_MINUTES
        )));
    }
    Ok(value)
}

fn parse_time(value: &str) -> Result<String, ToolError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| ToolError::InvalidArguments(format!("start_time '{}' is not HH:MM", value)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
