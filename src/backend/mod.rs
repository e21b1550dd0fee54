//! Study Backend Integration
//!
//! The REST service that owns every study record. This crate only reads the
//! user's subjects and exams for prompt context and creates the records the
//! assistant's tool calls ask for.

mod client;
mod models;

pub use client::{BackendClient, BackendError};
pub use models::{
    Exam, NewPracticeTask, NewStudySession, PracticeTask, StudySession, Subject, ASSISTANT_SOURCE,
};
