//! HTTP API v1: chat sessions for the browser page.
//!
//! Endpoints:
//!
//! - `GET    /v1/languages`              Supported output languages
//! - `POST   /v1/sessions`               Start a session
//! - `GET    /v1/sessions/{id}`          Session view (transcript, state)
//! - `DELETE /v1/sessions/{id}`          Drop a session
//! - `POST   /v1/sessions/{id}/messages` Submit one user turn
//! - `POST   /v1/sessions/{id}/reset`    Start a new chat (new id)
//! - `PUT    /v1/sessions/{id}/language` Change the output language

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use lingochat_agent::{ChatSession, SessionSettings, TranscriptEntry, TurnOutcome};
use lingochat_core::error::Error;
use lingochat_core::provider::Provider;

/// Default cap on live sessions before the least recently active is evicted.
pub const MAX_SESSIONS: usize = 1_000;

type SessionHandle = Arc<Mutex<ChatSession>>;

// ── State ─────────────────────────────────────────────────────────────────

/// Live sessions keyed by session id.
///
/// Each session sits behind its own mutex, so turns in different sessions
/// never wait on each other.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a session, evicting the least recently active one if full.
    pub async fn insert(&self, session: ChatSession) -> SessionHandle {
        let id = session.id().to_string();
        let handle = Arc::new(Mutex::new(session));
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.capacity
            && !sessions.contains_key(&id)
            && let Some(oldest) = least_recently_active(&sessions)
        {
            sessions.remove(&oldest);
            info!(session = %oldest, "Evicted idle session");
        }

        sessions.insert(id, Arc::clone(&handle));
        handle
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Run `renew` on a locked session and move it to the id it ends up with.
    ///
    /// The caller holds the session lock. `renew` only runs while `old` still
    /// maps to `handle`; if the session was deleted or re-keyed while the
    /// caller waited for the lock, nothing changes and `None` is returned.
    async fn renew<T>(
        &self,
        old: &str,
        handle: &SessionHandle,
        session: &mut ChatSession,
        renew: impl FnOnce(&mut ChatSession) -> T,
    ) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        if !sessions
            .get(old)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            debug!(session = %old, "Session moved or removed before renewal");
            return None;
        }

        let result = renew(session);
        let new = session.id().to_string();
        if new != old {
            sessions.remove(old);
            sessions.insert(new, Arc::clone(handle));
        }
        Some(result)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Sessions with a turn in flight count as active and are never picked.
fn least_recently_active(sessions: &HashMap<String, SessionHandle>) -> Option<String> {
    sessions
        .iter()
        .filter_map(|(id, handle)| {
            handle
                .try_lock()
                .ok()
                .map(|session| (id.clone(), session.last_active()))
        })
        .min_by_key(|(_, last_active)| *last_active)
        .map(|(id, _)| id)
}

/// Shared state for the v1 API.
pub struct ApiState {
    pub provider: Arc<dyn Provider>,
    pub settings: Arc<SessionSettings>,
    pub sessions: SessionRegistry,
}

impl ApiState {
    pub fn new(provider: Arc<dyn Provider>, settings: Arc<SessionSettings>, capacity: usize) -> Self {
        Self {
            provider,
            settings,
            sessions: SessionRegistry::new(capacity),
        }
    }
}

pub type SharedApiState = Arc<ApiState>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/languages", get(list_languages_handler))
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/{id}/messages", post(send_message_handler))
        .route("/sessions/{id}/reset", post(reset_session_handler))
        .route("/sessions/{id}/language", put(set_language_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SetLanguageRequest {
    language: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageListResponse {
    pub languages: Vec<String>,
    pub default: String,
}

/// Everything the page needs to render a session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub language: String,
    pub state: String,
    pub transcript: Vec<TranscriptEntryDto>,
    pub memory_messages: usize,
    pub memory_size: usize,
    pub last_active: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptEntryDto {
    pub role: String,
    pub text: String,
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub outcome: serde_json::Value,
    pub session: SessionView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn entry_dto(entry: &TranscriptEntry) -> TranscriptEntryDto {
    TranscriptEntryDto {
        role: entry.role.to_string(),
        text: entry.text.clone(),
        kind: entry.kind.as_str().to_string(),
    }
}

impl From<&ChatSession> for SessionView {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id().to_string(),
            language: session.language().to_string(),
            state: session.state().as_str().to_string(),
            transcript: session.transcript().iter().map(entry_dto).collect(),
            memory_messages: session.memory().len(),
            memory_size: session.memory().total_size(),
            last_active: session.last_active().to_rfc3339(),
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

/// Failure of an API call, mapped onto an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(String),
    Domain(Error),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::SessionNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Session not found: {id}"))
            }
            ApiError::Domain(err) => {
                let status = match err {
                    Error::Validation(_) => StatusCode::BAD_REQUEST,
                    Error::TurnInProgress => StatusCode::CONFLICT,
                    Error::Upstream(_) => StatusCode::BAD_GATEWAY,
                    Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

async fn lookup(state: &ApiState, id: &str) -> Result<SessionHandle, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::SessionNotFound(id.to_string()))
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn list_languages_handler(State(state): State<SharedApiState>) -> Json<LanguageListResponse> {
    Json(LanguageListResponse {
        languages: state.settings.languages().names().to_vec(),
        default: state.settings.default_language.to_string(),
    })
}

async fn create_session_handler(
    State(state): State<SharedApiState>,
    payload: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let session = match request.language.as_deref() {
        Some(language) => ChatSession::with_language(
            Arc::clone(&state.provider),
            Arc::clone(&state.settings),
            language,
        )?,
        None => ChatSession::new(Arc::clone(&state.provider), Arc::clone(&state.settings)),
    };

    info!(session = %session.id(), language = %session.language(), "Session created");
    let view = SessionView::from(&session);
    state.sessions.insert(session).await;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = lookup(&state, &id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionView::from(&*session)))
}

async fn delete_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id).await {
        info!(session = %id, "Session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

/// Run one turn. The turn executes on its own task holding the session lock,
/// so a client disconnect cannot cancel it halfway.
async fn send_message_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<TurnResponse>), ApiError> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle
        .try_lock_owned()
        .map_err(|_| ApiError::Domain(Error::TurnInProgress))?;

    debug!(session = %id, chars = payload.text.len(), "Turn received");

    let turn = tokio::spawn(async move {
        let outcome = session.submit(&payload.text).await;
        let view = SessionView::from(&*session);
        (outcome, view)
    });
    let (outcome, view) = turn
        .await
        .map_err(|e| ApiError::Internal(format!("turn task failed: {e}")))?;
    let outcome = outcome?;

    let status = match &outcome {
        TurnOutcome::Failed { detail, .. } => {
            warn!(session = %id, detail = %detail, "Turn failed upstream");
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::OK,
    };
    let outcome =
        serde_json::to_value(&outcome).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        status,
        Json(TurnResponse {
            outcome,
            session: view,
        }),
    ))
}

async fn reset_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle.lock().await;
    state
        .sessions
        .renew(&id, &handle, &mut *session, ChatSession::reset)
        .await
        .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
    info!(old = %id, session = %session.id(), "New chat started");
    Ok(Json(SessionView::from(&*session)))
}

async fn set_language_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<SetLanguageRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle.lock().await;
    let changed = state
        .sessions
        .renew(&id, &handle, &mut *session, |s| {
            s.set_language(&payload.language)
        })
        .await
        .ok_or_else(|| ApiError::SessionNotFound(id.clone()))??;
    if changed {
        info!(old = %id, session = %session.id(), language = %session.language(), "Language changed");
    }
    Ok(Json(SessionView::from(&*session)))
}
