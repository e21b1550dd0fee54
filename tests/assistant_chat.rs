//! End-to-end tests for the assistant chat route.
//! The provider and the study backend are in-process axum servers.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use studyhub::config::Config;
use studyhub::relay::markers::APOLOGY;
use studyhub::{build_router, AppState, MarkerParser, StreamItem};
use tokio::net::TcpListener;
use tower::util::ServiceExt;

#[derive(Default)]
struct Recorder {
    provider_requests: Mutex<Vec<(Option<String>, Value)>>,
    created: Mutex<Vec<(String, Option<String>, Value)>>,
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn auth(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn sse_body(chunks: &[Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn content(text: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {"content": text}}]})
}

fn call_start(index: u32, name: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {"tool_calls": [{
        "index": index, "id": format!("call_{}", index), "type": "function",
        "function": {"name": name, "arguments": ""}
    }]}}]})
}

fn call_args(index: u32, fragment: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {"tool_calls": [{
        "index": index, "function": {"arguments": fragment}
    }]}}]})
}

async fn mock_provider(recorder: Arc<Recorder>, status: StatusCode, body: String) -> String {
    let router = Router::new()
        .route(
            "/chat/completions",
            post(
                move |State(rec): State<Arc<Recorder>>, headers: HeaderMap, Json(req): Json<Value>| {
                    let body = body.clone();
                    async move {
                        rec.provider_requests.lock().unwrap().push((auth(&headers), req));
                        (status, [("content-type", "text/event-stream")], body)
                    }
                },
            ),
        )
        .with_state(recorder);
    spawn(router).await
}

async fn mock_backend(recorder: Arc<Recorder>, fail_tasks: bool) -> String {
    async fn create(
        rec: Arc<Recorder>,
        kind: &str,
        headers: HeaderMap,
        mut body: Value,
    ) -> (StatusCode, Json<Value>) {
        let mut created = rec.created.lock().unwrap();
        body["id"] = json!(format!("{}-{}", kind, created.len() + 1));
        created.push((kind.to_string(), auth(&headers), body.clone()));
        (StatusCode::CREATED, Json(body))
    }

    let router = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route(
            "/subjects",
            get(|| async { Json(json!([{"id": "1", "name": "Mathematics", "priority": 1}])) }),
        )
        .route(
            "/exams",
            get(|| async {
                Json(json!([{"id": "e1", "subject_id": "1", "title": "Maths final", "date": "2099-06-01"}]))
            }),
        )
        .route(
            "/study-sessions",
            post(
                |State(rec): State<Arc<Recorder>>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    create(rec, "session", headers, body).await.into_response()
                },
            ),
        )
        .route(
            "/practice-tasks",
            post(
                move |State(rec): State<Arc<Recorder>>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    if fail_tasks {
                        return (StatusCode::INTERNAL_SERVER_ERROR, "database down").into_response();
                    }
                    create(rec, "task", headers, body).await.into_response()
                },
            ),
        )
        .with_state(recorder);
    spawn(router).await
}

fn app(provider_url: String, backend_url: String) -> Router {
    let mut config = Config::default();
    config.provider.base_url = provider_url;
    config.provider.api_key = Some("sk-test".to_string());
    config.provider.model = "test-model".to_string();
    config.backend.base_url = backend_url;
    config.backend.max_retries = 1;
    build_router(AppState::new(config).unwrap())
}

fn chat(message: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/assistant/chat")
        .header("Content-Type", "application/json")
        .header("Authorization", "Bearer student-token")
        .body(Body::from(
            json!({"messages": [{"role": "user", "content": message}]}).to_string(),
        ))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn parse(text: &str) -> Vec<StreamItem> {
    let mut parser = MarkerParser::new();
    let mut items = parser.push(text);
    items.extend(parser.finish());
    items
}

#[tokio::test]
async fn streams_prose_and_executes_interleaved_calls_in_order() {
    let recorder = Arc::new(Recorder::default());
    let stream = sse_body(&[
        content("Sure! "),
        content("Adding two items."),
        call_start(0, "create_study_session"),
        call_args(0, r#"{"subject":"Mathematics","title":"Alg"#),
        call_start(1, "create_practice_task"),
        call_args(1, r#"{"subject":"Mathematics","title":"Past paper","due_date":"2099-05-30"}"#),
        call_args(0, r#"ebra review","date":"2099-05-20","start_time":"16:00","duration_minutes":60}"#),
    ]);

    let provider = mock_provider(Arc::clone(&recorder), StatusCode::OK, stream).await;
    let backend = mock_backend(Arc::clone(&recorder), false).await;

    let response = app(provider, backend)
        .oneshot(chat("Plan my maths revision"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );

    let text = body_text(response).await;
    let items = parse(&text);

    assert_eq!(items[0], StreamItem::Text("Sure! Adding two items.".to_string()));
    let cards: Vec<_> = items
        .iter()
        .filter_map(|i| match i {
            StreamItem::ToolCall(card) => Some(card.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].name, "create_study_session");
    assert_eq!(cards[0].arguments["title"], json!("Algebra review"));
    assert_eq!(cards[0].result["id"], json!("session-1"));
    assert_eq!(cards[1].name, "create_practice_task");
    assert_eq!(cards[1].result["id"], json!("task-2"));

    let created = recorder.created.lock().unwrap();
    let kinds: Vec<&str> = created.iter().map(|(k, _, _)| k.as_str()).collect();
    assert_eq!(kinds, vec!["session", "task"]);
    assert_eq!(created[0].1.as_deref(), Some("Bearer student-token"));
    assert_eq!(created[0].2["source"], json!("assistant"));
    assert_eq!(created[0].2["duration_minutes"], json!(60));

    let requests = recorder.provider_requests.lock().unwrap();
    let (provider_auth, body) = &requests[0];
    assert_eq!(provider_auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], json!("test-model"));
    assert_eq!(body["stream"], json!(true));
    assert_eq!(body["tools"].as_array().unwrap().len(), 2);
    let system_context = body["messages"][1]["content"].as_str().unwrap();
    assert!(system_context.contains("Mathematics"));
    assert!(system_context.contains("Maths final"));
}

#[tokio::test]
async fn provider_error_returns_json_500_without_streaming() {
    let recorder = Arc::new(Recorder::default());
    let provider = mock_provider(
        Arc::clone(&recorder),
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"error":{"message":"quota exceeded"}}"#.to_string(),
    )
    .await;
    let backend = mock_backend(Arc::clone(&recorder), false).await;

    let response = app(provider, backend)
        .oneshot(chat("Plan my week"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"]["code"], json!("PROVIDER_ERROR"));
    assert!(body["error"]["message"].as_str().unwrap().contains("429"));
    assert!(!body["error"]["message"].as_str().unwrap().contains("quota"));
    assert!(recorder.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn backend_failure_mid_stream_appends_apology() {
    let recorder = Arc::new(Recorder::default());
    let stream = sse_body(&[
        content("On it."),
        call_start(0, "create_study_session"),
        call_args(0, r#"{"subject":"Physics","title":"Optics","date":"2099-01-10","duration_minutes":30}"#),
        call_start(1, "create_practice_task"),
        call_args(1, r#"{"subject":"Physics","title":"Lens problems","due_date":"2099-01-12"}"#),
    ]);

    let provider = mock_provider(Arc::clone(&recorder), StatusCode::OK, stream).await;
    let backend = mock_backend(Arc::clone(&recorder), true).await;

    let response = app(provider, backend)
        .oneshot(chat("Schedule physics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert!(text.starts_with("On it."));
    assert!(text.ends_with(APOLOGY));

    let cards = parse(&text)
        .into_iter()
        .filter(|i| matches!(i, StreamItem::ToolCall(_)))
        .count();
    assert_eq!(cards, 1);

    // The earlier session stays in place
    assert_eq!(recorder.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_arguments_are_skipped_silently() {
    let recorder = Arc::new(Recorder::default());
    let stream = sse_body(&[
        call_start(0, "create_study_session"),
        call_args(0, r#"{"subject":"Biology","title":"#),
        call_start(1, "create_study_session"),
        call_args(1, r#"{"subject":"Biology","title":"Cells","date":"2099-03-01","duration_minutes":25}"#),
        content("Done."),
    ]);

    let provider = mock_provider(Arc::clone(&recorder), StatusCode::OK, stream).await;
    let backend = mock_backend(Arc::clone(&recorder), false).await;

    let response = app(provider, backend)
        .oneshot(chat("Biology please"))
        .await
        .unwrap();
    let text = body_text(response).await;

    assert!(!text.contains(APOLOGY.trim()));
    let created = recorder.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].2["title"], json!("Cells"));
}
