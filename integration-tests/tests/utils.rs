#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use ship_pipeline::PlivoSettings;

pub const PHONE_NUMBER: &str = "14155550100";
pub const OLD_TUNNEL_URL: &str = "https://old-tunnel.example/answer";
pub const AUTH_ID: &str = "MATESTACCOUNT0000000";

/// How the fake bot answers.
#[derive(Clone)]
pub struct BotBehaviour {
    pub health_status: u16,
    pub health_body: Value,
    /// Delay before `/health` answers, to finish after the other checks.
    pub health_delay: Duration,
    pub answer_status: u16,
    /// `None` serves 503 like a bot without a database.
    pub logs: Option<Value>,
}

impl Default for BotBehaviour {
    fn default() -> Self {
        BotBehaviour {
            health_status: 200,
            health_body: json!({
                "status": "healthy",
                "service": "acme-corp-receptionist",
                "version": "1.0.0"
            }),
            health_delay: Duration::ZERO,
            answer_status: 200,
            logs: Some(json!({"logs": [], "count": 0})),
        }
    }
}

struct BotState {
    behaviour: BotBehaviour,
    answers: Mutex<Vec<HashMap<String, String>>>,
}

pub struct FakeBot {
    pub base_url: String,
    /// `host:port`, as a platform domain would be recorded.
    pub domain: String,
    state: Arc<BotState>,
}

impl FakeBot {
    /// Forms received on `/answer`.
    pub fn answers(&self) -> Vec<HashMap<String, String>> {
        self.state.answers.lock().unwrap().clone()
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

async fn bot_health(State(state): State<Arc<BotState>>) -> Response {
    tokio::time::sleep(state.behaviour.health_delay).await;
    (
        status(state.behaviour.health_status),
        Json(state.behaviour.health_body.clone()),
    )
        .into_response()
}

async fn bot_answer(
    State(state): State<Arc<BotState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.answers.lock().unwrap().push(form);
    if state.behaviour.answer_status >= 500 {
        return (status(state.behaviour.answer_status), "Internal Server Error").into_response();
    }
    (
        status(state.behaviour.answer_status),
        [("content-type", "application/xml")],
        "<Response><Stream bidirectional=\"true\">wss://bot/ws</Stream></Response>",
    )
        .into_response()
}

async fn bot_root() -> Json<Value> {
    Json(json!({"service": "acme-corp-receptionist", "endpoints": ["/health", "/answer", "/logs"]}))
}

async fn bot_logs(State(state): State<Arc<BotState>>) -> Response {
    match &state.behaviour.logs {
        Some(body) => Json(body.clone()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"detail": "Database not configured"})),
        )
            .into_response(),
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

pub async fn start_bot(behaviour: BotBehaviour) -> FakeBot {
    let state = Arc::new(BotState {
        behaviour,
        answers: Mutex::new(vec![]),
    });
    let app = Router::new()
        .route("/health", get(bot_health))
        .route("/answer", axum::routing::post(bot_answer))
        .route("/", get(bot_root))
        .route("/logs", get(bot_logs))
        .with_state(state.clone());
    let domain = serve(app).await;
    FakeBot {
        base_url: format!("http://{}", domain),
        domain,
        state,
    }
}

#[derive(Deserialize)]
struct NumberUpdate {
    answer_url: String,
    answer_method: String,
}

#[derive(Default)]
struct PlivoState {
    /// number -> (answer_url, answer_method)
    numbers: Mutex<BTreeMap<String, (String, String)>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

pub struct FakePlivo {
    pub api_base: String,
    state: Arc<PlivoState>,
}

impl FakePlivo {
    pub fn reads(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    pub fn answer_url(&self, number: &str) -> Option<String> {
        self.state
            .numbers
            .lock()
            .unwrap()
            .get(number)
            .map(|(url, _)| url.clone())
    }

    pub fn settings(&self) -> PlivoSettings {
        PlivoSettings {
            auth_id: Some(AUTH_ID.to_string()),
            auth_token: Some("test-token".to_string()),
            api_base: self.api_base.clone(),
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Basic "))
        .unwrap_or(false)
}

fn number_json(number: &str, entry: &(String, String)) -> Value {
    json!({
        "number": number,
        "alias": "front desk",
        "answer_url": entry.0,
        "answer_method": entry.1,
    })
}

async fn plivo_get_number(
    State(state): State<Arc<PlivoState>>,
    Path((_auth_id, number)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.reads.fetch_add(1, Ordering::SeqCst);
    match state.numbers.lock().unwrap().get(&number) {
        Some(entry) => Json(number_json(&number, entry)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response(),
    }
}

async fn plivo_update_number(
    State(state): State<Arc<PlivoState>>,
    Path((_auth_id, number)): Path<(String, String)>,
    headers: HeaderMap,
    Json(update): Json<NumberUpdate>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.writes.fetch_add(1, Ordering::SeqCst);
    state
        .numbers
        .lock()
        .unwrap()
        .insert(number, (update.answer_url, update.answer_method));
    (StatusCode::ACCEPTED, Json(json!({"message": "changed"}))).into_response()
}

async fn plivo_list_numbers(
    State(state): State<Arc<PlivoState>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.reads.fetch_add(1, Ordering::SeqCst);
    let objects: Vec<Value> = state
        .numbers
        .lock()
        .unwrap()
        .iter()
        .map(|(number, entry)| number_json(number, entry))
        .collect();
    Json(json!({"meta": {"limit": 20, "offset": 0}, "objects": objects})).into_response()
}

/// A number API holding `numbers` (number, answer URL), all bound with POST.
pub async fn start_plivo(numbers: &[(&str, &str)]) -> FakePlivo {
    let state = Arc::new(PlivoState::default());
    {
        let mut stored = state.numbers.lock().unwrap();
        for (number, url) in numbers {
            stored.insert(number.to_string(), (url.to_string(), "POST".to_string()));
        }
    }
    let app = Router::new()
        .route(
            "/v1/Account/{auth_id}/Number/{number}/",
            get(plivo_get_number).post(plivo_update_number),
        )
        .route("/v1/Account/{auth_id}/Number/", get(plivo_list_numbers))
        .with_state(state.clone());
    let addr = serve(app).await;
    FakePlivo {
        api_base: format!("http://{}/v1", addr),
        state,
    }
}

/// A workdir holding both container descriptors.
pub fn workdir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Dockerfile"),
        "FROM python:3.11-slim\nRUN apt-get update && apt-get install -y ffmpeg\nCMD [\"python\", \"main.py\"]\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("Dockerfile.livekit"),
        "FROM python:3.11-slim\nCMD [\"python\", \"livekit_agent.py\", \"start\"]\n",
    )
    .unwrap();
    dir
}
