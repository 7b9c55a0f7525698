//! N-행시 Gateway — one session served at 127.0.0.1:8000 by default.
//! Word form, user lines, Gemini generation, side-by-side comparison, history.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{Html, Response},
    routing::{get, post, put},
    Json, Router,
};
use nhaengsi_core::{
    NhaengsiConfig, PoemAuthor, PoemGenerator, SessionController, SessionError, SessionSnapshot,
    ValidationError, EXAMPLE_WORDS,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const RETRY_HINT: &str = "잠시 후 다시 시도해주세요! 🔄";

/// The lock is held for a whole action, generation included, so actions never interleave.
#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<SessionController>>,
    generator: PoemGenerator,
}

impl AppState {
    fn new(session: SessionController, generator: PoemGenerator) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            generator,
        }
    }
}

#[derive(Deserialize)]
struct WordRequest {
    word: String,
}

#[derive(Deserialize)]
struct LineRequest {
    #[serde(default)]
    text: String,
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[nhaengsi-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match NhaengsiConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("[NHAENGSI] Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(SessionController::new(), PoemGenerator::gemini(&config));
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("[NHAENGSI] Cannot bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "[NHAENGSI] Gateway v{} listening on http://{} (model {})",
        nhaengsi_core::version(),
        config.bind_addr,
        config.model
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("[NHAENGSI] Server stopped: {}", e);
        std::process::exit(1);
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(serve_form))
        .route("/api/v1/session", get(session_handler))
        .route("/api/v1/word", post(submit_word_handler))
        .route("/api/v1/lines/:index", put(edit_line_handler))
        .route("/api/v1/generate", post(generate_handler))
        .route("/api/v1/regenerate", post(regenerate_handler))
        .route("/api/v1/compare", post(compare_handler))
        .route("/api/v1/reset", post(reset_handler))
        .route(
            "/api/v1/history",
            get(history_handler).delete(clear_history_handler),
        )
        .route("/api/v1/export/:author", get(export_handler))
        .route("/api/v1/examples", get(examples_handler))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_request))
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    tracing::info!("[NHAENGSI] {} {} -> {}", method, uri, response.status());
    response
}

async fn health() -> &'static str {
    "OK"
}

/// The form page: word input, per-character lines, comparison and history.
async fn serve_form() -> Html<&'static str> {
    const INDEX: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/index.html"));
    Html(INDEX)
}

async fn session_handler(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.lock().await.snapshot())
}

async fn submit_word_handler(
    State(state): State<AppState>,
    Json(body): Json<WordRequest>,
) -> ApiResult<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session.submit_word(&body.word).map_err(validation_error)?;
    Ok(Json(session.snapshot()))
}

async fn edit_line_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(body): Json<LineRequest>,
) -> ApiResult<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session.edit_line(index, &body.text).map_err(session_error)?;
    Ok(Json(session.snapshot()))
}

async fn generate_handler(State(state): State<AppState>) -> ApiResult<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session
        .generate(&state.generator)
        .await
        .map_err(session_error)?;
    Ok(Json(session.snapshot()))
}

async fn regenerate_handler(State(state): State<AppState>) -> ApiResult<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session
        .regenerate(&state.generator)
        .await
        .map_err(session_error)?;
    Ok(Json(session.snapshot()))
}

async fn compare_handler(State(state): State<AppState>) -> ApiResult<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session.show_comparison().map_err(session_error)?;
    Ok(Json(session.snapshot()))
}

async fn reset_handler(State(state): State<AppState>) -> ApiResult<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session.reset_word().map_err(session_error)?;
    Ok(Json(session.snapshot()))
}

async fn history_handler(State(state): State<AppState>) -> Json<Value> {
    let session = state.session.lock().await;
    let view = session.history_view();
    let more = (view.hidden > 0).then(|| format!("+ {}개 더 있어요!", view.hidden));
    Json(json!({
        "total": view.total,
        "hidden": view.hidden,
        "more": more,
        "entries": view.entries,
    }))
}

async fn clear_history_handler(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session.clear_history();
    Json(session.snapshot())
}

/// Copyable text for `ai` or `user`.
async fn export_handler(
    State(state): State<AppState>,
    Path(author): Path<String>,
) -> ApiResult<Value> {
    let author = match author.as_str() {
        "ai" => PoemAuthor::Ai,
        "user" => PoemAuthor::User,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("unknown author: {}", other) })),
            ))
        }
    };
    let session = state.session.lock().await;
    let text = session.export(author).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "복사할 N행시가 없어요" })),
        )
    })?;
    Ok(Json(json!({ "text": text })))
}

async fn examples_handler() -> Json<Value> {
    Json(json!({ "words": EXAMPLE_WORDS }))
}

fn validation_error(e: ValidationError) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": e.to_string() })),
    )
}

fn session_error(e: SessionError) -> ApiError {
    let status = match &e {
        SessionError::Poem(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::CONFLICT,
    };
    (
        status,
        Json(json!({
            "error": format!("오류가 발생했어요: {} 😢", e),
            "hint": RETRY_HINT,
        })),
    )
}
