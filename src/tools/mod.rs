//! Assistant Tools
//!
//! Functions offered to the model, and the handler that turns each call into
//! a backend record.
//!
//! - `create_study_session`: schedule a study block for a subject
//! - `create_practice_task`: add a practice task with a due date

mod args;

pub use args::{parse_args, CreatePracticeTaskArgs, CreateStudySessionArgs, MAX_MINUTES};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::backend::BackendClient;
use crate::provider::ToolDefinition;
use crate::relay::{ToolCall, ToolError, ToolHandler};

pub const CREATE_STUDY_SESSION: &str = "create_study_session";
pub const CREATE_PRACTICE_TASK: &str = "create_practice_task";

/// Tool catalogue sent with every assistant request
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            CREATE_STUDY_SESSION,
            "Schedule a study session in the student's planner.",
            json!({
                "type": "object",
                "properties": {
                    "subject": { "type": "string", "description": "Subject name, e.g. Mathematics" },
                    "title": { "type": "string", "description": "Short description of what to study" },
                    "date": { "type": "string", "description": "Day of the session, YYYY-MM-DD" },
                    "start_time": { "type": "string", "description": "Start time, HH:MM (24h)" },
                    "duration_minutes": { "type": "integer", "minimum": 1, "maximum": MAX_MINUTES },
                    "notes": { "type": "string" }
                },
                "required": ["subject", "title", "date", "duration_minutes"]
            }),
        ),
        ToolDefinition::function(
            CREATE_PRACTICE_TASK,
            "Add a practice task (exercise set, past paper, flashcards) with a due date.",
            json!({
                "type": "object",
                "properties": {
                    "subject": { "type": "string", "description": "Subject name" },
                    "title": { "type": "string", "description": "What to practise" },
                    "due_date": { "type": "string", "description": "Due date, YYYY-MM-DD" },
                    "description": { "type": "string" },
                    "estimated_minutes": { "type": "integer", "minimum": 1, "maximum": MAX_MINUTES }
                },
                "required": ["subject", "title", "due_date"]
            }),
        ),
    ]
}

/// Executes tool calls against the study backend on behalf of one user
pub struct StudyToolHandler {
    backend: Arc<BackendClient>,
    token: String,
}

impl StudyToolHandler {
    pub fn new(backend: Arc<BackendClient>, token: impl Into<String>) -> Self {
        Self {
            backend,
            token: token.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for StudyToolHandler {
    async fn handle(&self, call: &ToolCall) -> Result<Value, ToolError> {
        match call.name.as_str() {
            CREATE_STUDY_SESSION => {
                let request = parse_args::<CreateStudySessionArgs>(&call.arguments)?.into_request()?;
                let created = self
                    .backend
                    .create_study_session(&self.token, &request)
                    .await?;
                tracing::info!(session_id = %created.id, date = %created.date, "Study session created");
                Ok(serde_json::to_value(created)?)
            }
            CREATE_PRACTICE_TASK => {
                let request = parse_args::<CreatePracticeTaskArgs>(&call.arguments)?.into_request()?;
                let created = self
                    .backend
                    .create_practice_task(&self.token, &request)
                    .await?;
                tracing::info!(task_id = %created.id, due = %created.due_date, "Practice task created");
                Ok(serde_json::to_value(created)?)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
