//! Assistant Prompt Assembly
//!
//! Builds the message list sent to the provider: system prompt, an optional
//! snapshot of the student's subjects and upcoming exams, then the most recent
//! chat history.

use chrono::NaiveDate;
use std::fmt::Write;

use crate::backend::{BackendClient, Exam, Subject};
use crate::config::AssistantConfig;
use crate::provider::ChatMessage;

/// Exams listed in the context message at most
const MAX_CONTEXT_EXAMS: usize = 10;

/// What the assistant knows about the student's plan
#[derive(Debug, Clone, Default)]
pub struct StudyContext {
    pub subjects: Vec<Subject>,
    pub exams: Vec<Exam>,
}

impl StudyContext {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.exams.is_empty()
    }

    /// Render as a compact system message body
    pub fn render(&self, today: NaiveDate) -> String {
        let mut out = String::from("The student's current study plan:\n");

        if !self.subjects.is_empty() {
            let mut subjects: Vec<&Subject> = self.subjects.iter().collect();
            subjects.sort_by_key(|s| s.priority.unwrap_or(u32::MAX));
            out.push_str("Subjects (highest priority first): ");
            let names: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
            out.push_str(&names.join(", "));
            out.push('\n');
        }

        let mut upcoming: Vec<&Exam> = self.exams.iter().filter(|e| e.date >= today).collect();
        upcoming.sort_by_key(|e| e.date);

        if !upcoming.is_empty() {
            out.push_str("Upcoming exams:\n");
            for exam in upcoming.into_iter().take(MAX_CONTEXT_EXAMS) {
                let days = (exam.date - today).num_days();
                let _ = writeln!(out, "- {} on {} (in {} days)", exam.title, exam.date, days);
            }
        }

        out
    }
}

/// Fetch subjects and exams; failures leave that part empty
pub async fn load_context(backend: &BackendClient, token: &str) -> Option<StudyContext> {
    let (subjects, exams) = tokio::join!(backend.list_subjects(token), backend.list_exams(token));

    let subjects = subjects.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not load subjects for assistant context");
        Vec::new()
    });
    let exams = exams.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not load exams for assistant context");
        Vec::new()
    });

    let context = StudyContext { subjects, exams };
    (!context.is_empty()).then_some(context)
}

/// Assemble the provider conversation
pub fn build_messages(
    config: &AssistantConfig,
    history: &[ChatMessage],
    context: Option<&StudyContext>,
    today: NaiveDate,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    messages.push(ChatMessage::system(format!(
        "{}\nToday is {} ({}). Use ISO dates (YYYY-MM-DD) in tool calls.",
        config.system_prompt,
        today,
        today.format("%A")
    )));

    if let Some(context) = context {
        messages.push(ChatMessage::system(context.render(today)));
    }

    let skip = history.len().saturating_sub(config.max_history_messages);
    messages.extend(history.iter().skip(skip).cloned());

    messages
}
