//! Study Backend REST Client
//!
//! HTTP client for the external REST service that owns exams, subjects,
//! study sessions and practice tasks. Every request carries the end user's
//! bearer token.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use super::models::{Exam, NewPracticeTask, NewStudySession, PracticeTask, StudySession, Subject};
use crate::config::BackendConfig;

/// Study backend REST API client
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

impl BackendClient {
    /// Create a new backend client with the given configuration
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if the backend is reachable
    pub async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(classify)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Unavailable)
        }
    }

    /// List the user's subjects
    pub async fn list_subjects(&self, token: &str) -> Result<Vec<Subject>, BackendError> {
        self.get_json("/subjects", token).await
    }

    /// List the user's exams
    pub async fn list_exams(&self, token: &str) -> Result<Vec<Exam>, BackendError> {
        self.get_json("/exams", token).await
    }

    /// Create a study session
    pub async fn create_study_session(
        &self,
        token: &str,
        session: &NewStudySession,
    ) -> Result<StudySession, BackendError> {
        self.post_json("/study-sessions", token, session).await
    }

    /// Create a practice task
    pub async fn create_practice_task(
        &self,
        token: &str,
        task: &NewPracticeTask,
    ) -> Result<PracticeTask, BackendError> {
        self.post_json("/practice-tasks", token, task).await
    }

    /// Send a GET request with retry logic
    ///
    /// A 429 `Retry-After` replaces the backoff when it is longer, capped at
    /// the request timeout. The last attempt never sleeps.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, BackendError> {
        let url = self.url(path);
        let attempts = self.config.max_retries.max(1);
        let mut last_error = BackendError::Unavailable;
        let mut retry_after: Option<Duration> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                // Exponential backoff: 1s, 4s, 9s...
                let backoff = Duration::from_secs((attempt as u64).pow(2));
                let delay = retry_after
                    .take()
                    .map_or(backoff, |wait| backoff.max(wait.min(self.max_retry_wait())));
                tokio::time::sleep(delay).await;
            }

            match self.client.get(&url).bearer_auth(token).send().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    retry_after = retry_after_secs(&response).map(Duration::from_secs);
                    last_error = BackendError::RateLimited;
                }
                Ok(response) => return read_json(response).await,
                Err(e) => {
                    last_error = classify(e);
                }
            }
        }

        tracing::warn!(path, attempts, error = %last_error, "Backend read failed after retries");
        Err(last_error)
    }

    fn max_retry_wait(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms)
    }

    /// Send a POST request once
    ///
    /// Writes create records, so a retry could duplicate them.
    async fn post_json<B, T>(&self, path: &str, token: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request: RequestBuilder = self.client.post(self.url(path)).bearer_auth(token).json(body);
        let response = request.send().await.map_err(classify)?;
        read_json(response).await
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();

    if status.is_success() {
        return response.json().await.map_err(BackendError::Request);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BackendError::Unauthorized);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BackendError::RateLimited);
    }

    let text = response.text().await.unwrap_or_default();
    Err(BackendError::Api {
        status: status.as_u16(),
        message: text,
    })
}

fn classify(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::Unavailable
    } else {
        BackendError::Request(e)
    }
}

/// Errors that can occur when communicating with the study backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Study backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Not authorized")]
    Unauthorized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::models::ASSISTANT_SOURCE;
    use axum::{
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> BackendClient {
        BackendClient::new(BackendConfig {
            base_url,
            request_timeout_ms: 2000,
            max_retries: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_subjects_forwards_token() {
        let router = Router::new().route(
            "/subjects",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer user-token" {
                    return Err(AxumStatus::UNAUTHORIZED);
                }
                Ok(Json(json!([{"id": "s1", "name": "Maths", "priority": 1}])))
            }),
        );
        let backend = client(spawn(router).await);

        let subjects = backend.list_subjects("user-token").await.unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].name, "Maths");

        let err = backend.list_subjects("wrong").await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized));
    }

    #[tokio::test]
    async fn test_create_study_session_posts_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/study-sessions",
            post(move |Json(body): Json<Value>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let mut record = body;
                    record["id"] = json!("sess-1");
                    (AxumStatus::CREATED, Json(record))
                }
            }),
        );
        let backend = client(spawn(router).await);

        let session = NewStudySession {
            title: "Algebra drills".to_string(),
            subject: "Maths".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            start_time: Some("16:00".to_string()),
            duration_minutes: 45,
            notes: None,
            source: ASSISTANT_SOURCE.to_string(),
        };

        let created = backend.create_study_session("t", &session).await.unwrap();
        assert_eq!(created.id, "sess-1");
        assert_eq!(created.duration_minutes, 45);
        assert_eq!(created.source.as_deref(), Some("assistant"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_api_error_carries_status() {
        let router = Router::new().route(
            "/practice-tasks",
            post(|| async { (AxumStatus::UNPROCESSABLE_ENTITY, "due_date in the past") }),
        );
        let backend = client(spawn(router).await);

        let task = NewPracticeTask {
            title: "Past paper".to_string(),
            subject: "Physics".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            description: None,
            estimated_minutes: None,
            source: ASSISTANT_SOURCE.to_string(),
        };

        match backend.create_practice_task("t", &task).await {
            Err(BackendError::Api { status, message }) => {
                assert_eq!(status, 422);
                assert_eq!(message, "due_date in the past");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    fn rate_limited_router(limited: usize, retry_after: &'static str) -> (Router, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/subjects",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < limited {
                        return (AxumStatus::TOO_MANY_REQUESTS, [("Retry-After", retry_after)])
                            .into_response();
                    }
                    Json(json!([{"id": "s1", "name": "Maths"}])).into_response()
                }
            }),
        );
        (router, hits)
    }

    #[tokio::test]
    async fn test_rate_limited_read_is_retried() {
        let (router, hits) = rate_limited_router(1, "1");
        let backend = BackendClient::new(BackendConfig {
            base_url: spawn(router).await,
            request_timeout_ms: 2000,
            max_retries: 2,
        })
        .unwrap();

        let subjects = backend.list_subjects("t").await.unwrap();
        assert_eq!(subjects[0].name, "Maths");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_final_rate_limit_returns_promptly() {
        let (router, hits) = rate_limited_router(usize::MAX, "3");
        let backend = client(spawn(router).await);

        let started = std::time::Instant::now();
        let result = backend.list_subjects("t").await;

        assert!(matches!(result, Err(BackendError::RateLimited)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_after_is_capped() {
        let (router, _) = rate_limited_router(1, "3600");
        let backend = BackendClient::new(BackendConfig {
            base_url: spawn(router).await,
            request_timeout_ms: 500,
            max_retries: 2,
        })
        .unwrap();

        let started = std::time::Instant::now();
        assert!(backend.list_subjects("t").await.is_ok());
        // First backoff step is 1s; the header asks for an hour
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Bind and drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = client(format!("http://{}", addr));
        assert!(backend.health_check().await.is_err());
        assert!(matches!(
            backend.list_exams("t").await,
            Err(BackendError::Unavailable)
        ));
    }
}
