//! Operator login and the session gate in front of every other route.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use super::AppState;
use crate::config::Config;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "auth";
const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24;

/// Single-operator credentials and the session token derived from them.
#[derive(Debug, Clone)]
pub struct SessionAuth {
    email: String,
    password_digest: [u8; 32],
    token: String,
    secure_cookies: bool,
}

impl SessionAuth {
    pub fn new(email: &str, password: &str, secret: &str, secure_cookies: bool) -> Self {
        Self {
            email: email.to_string(),
            password_digest: Sha256::digest(password.as_bytes()).into(),
            token: session_token(email, password, secret),
            secure_cookies,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.login_email,
            &config.login_password,
            &config.session_secret,
            config.secure_cookies,
        )
    }

    pub fn check_credentials(&self, email: &str, password: &str) -> bool {
        let digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        email == self.email && digest == self.password_digest
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_valid(&self, headers: &HeaderMap) -> bool {
        cookie_value(headers, SESSION_COOKIE).is_some_and(|v| v == self.token)
    }

    fn set_cookie(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, value, max_age
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Opaque session token: hex SHA-256 over the credentials and the server secret.
pub fn session_token(email: &str, password: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [email, password, secret] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// Redirect to the login page unless the request carries a valid session cookie.
pub async fn require_session(
    State(auth): State<Arc<SessionAuth>>,
    request: Request,
    next: Next,
) -> Response {
    if auth.is_valid(request.headers()) {
        next.run(request).await
    } else {
        Redirect::to("/login").into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if !state.auth.check_credentials(&req.email, &req.password) {
        warn!("Rejected login attempt for {}", req.email);
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    info!("Operator {} logged in", req.email);
    let cookie = state.auth.set_cookie(state.auth.token(), SESSION_MAX_AGE_SECS);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({"success": true})),
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = state.auth.set_cookie("", 0);
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({"success": true})),
    )
        .into_response()
}

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

const LOGIN_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Login</title></head>
<body>
<form id="login">
  <input id="email" type="email" placeholder="Email" required>
  <input id="password" type="password" placeholder="Password" required>
  <button type="submit">Log in</button>
  <p id="error"></p>
</form>
<script>
document.getElementById("login").addEventListener("submit", async (e) => {
  e.preventDefault();
  const res = await fetch("/api/login", {
    method: "POST",
    headers: {"Content-Type": "application/json"},
    body: JSON.stringify({
      email: document.getElementById("email").value,
      password: document.getElementById("password").value,
    }),
  });
  if (res.ok) { window.location = "/"; return; }
  const body = await res.json().catch(() => ({}));
  document.getElementById("error").textContent = body.error || "Login failed";
});
</script>
</body>
</html>
"#;
