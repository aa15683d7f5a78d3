//! Session-based authentication and per-role route gating.
//!
//! `POST /login` checks credentials against the configured user list and
//! issues a random bearer token; middleware resolves the token to a
//! session and enforces the role allow-list for the route group.
//! Authorization failures surface as 401/403, never silently downgraded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::Rng;

use crate::error::ApiError;
use crate::state::AppState;

/// Line-of-business roles, least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Production log entry staff.
    Log,
    /// Quality control staff.
    Quality,
    /// Managers: dashboard and exports.
    Manager,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "log" => Some(Role::Log),
            "quality" => Some(Role::Quality),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Log => "log",
            Role::Quality => "quality",
            Role::Manager => "manager",
        }
    }
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub role: Role,
}

/// In-memory token -> session map. Tokens live until logout or restart.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session and return its bearer token.
    pub fn create(&self, email: &str, role: Role) -> String {
        let token = generate_token();
        let session = Session {
            email: email.to_string(),
            role,
        };
        if let Ok(mut map) = self.inner.lock() {
            map.insert(token.clone(), session);
        }
        token
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.inner.lock().ok()?.get(token).cloned()
    }

    /// Invalidate a token. Returns true if a session was removed.
    pub fn remove(&self, token: &str) -> bool {
        self.inner
            .lock()
            .map(|mut map| map.remove(token).is_some())
            .unwrap_or(false)
    }
}

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &Request) -> Option<String> {
    let value = req.headers().get("authorization")?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}

fn unauthorized(message: &str) -> Response {
    ApiError::Unauthorized(message.to_string()).into_response()
}

/// Middleware that requires any authenticated session.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Some(t) => t,
        None => return unauthorized("Missing Authorization header"),
    };

    match state.sessions.get(&token) {
        Some(_) => next.run(req).await,
        None => unauthorized("Invalid bearer token"),
    }
}

/// Middleware that requires a manager session.
pub async fn require_manager(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Some(t) => t,
        None => return unauthorized("Missing Authorization header"),
    };

    match state.sessions.get(&token) {
        Some(session) if session.role == Role::Manager => next.run(req).await,
        Some(session) => ApiError::Forbidden(format!(
            "Role '{}' is not permitted on this endpoint",
            session.role.as_str()
        ))
        .into_response(),
        None => unauthorized("Invalid bearer token"),
    }
}
