use crate::{
    error::ApiError,
    events::{EventPublisher, UserRegistered, publish_best_effort},
    model::NewUser,
    security::{AuthUser, JwtKeys, VerifyTokenError},
    storage::UserStorage,
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json, Router,
    extract::{FromRef, Query, State},
    routing::{get, post},
};
use common::api::{LoginIn, MeOut, ModelId, OkOut, RegisterIn, TokenOut};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const MAX_PASSWORD_BYTES: usize = 4096;

static EMAIL_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$"));

#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<dyn UserStorage>,
    pub keys: Arc<JwtKeys>,
    pub events: Arc<dyn EventPublisher>,
    pub verify_url_base: String,
}

impl FromRef<AuthState> for Arc<JwtKeys> {
    fn from_ref(state: &AuthState) -> Self {
        state.keys.clone()
    }
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/verify", get(verify))
        .with_state(state)
}

/// Trimmed, lowercased address, or `None` when it does not look like an email.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    match EMAIL_RE.as_ref() {
        Ok(re) if re.is_match(&email) => Some(email),
        _ => None,
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::bad_request(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal("Failed to hash password", e.to_string().into()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

pub fn verify_url(base: &str, token: &str) -> String {
    format!("{}?token={}", base, token)
}

async fn register(
    State(state): State<AuthState>,
    Json(input): Json<RegisterIn>,
) -> Result<Json<MeOut>, ApiError> {
    let email = normalize_email(&input.email).ok_or_else(|| ApiError::bad_request("Invalid email"))?;
    validate_password(&input.password)?;

    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let user = state
        .users
        .insert_user(NewUser {
            email,
            password_hash: hash_password(&input.password)?,
            is_admin: false,
        })
        .await?;
    info!(user_id = user.id, "User registered");
    metrics::counter!("users_registered_total").increment(1);

    match state.keys.issue_verify_token(user.id, &user.email) {
        Ok(token) => {
            let event = UserRegistered {
                email: user.email.clone(),
                verify_url: verify_url(&state.verify_url_base, &token),
            };
            publish_best_effort(state.events.as_ref(), &event).await;
        }
        Err(e) => warn!(user_id = user.id, error = %e, "Could not issue verification token"),
    }

    Ok(Json(MeOut::from(&user)))
}

async fn login(
    State(state): State<AuthState>,
    Json(input): Json<LoginIn>,
) -> Result<Json<TokenOut>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let email = normalize_email(&input.email).ok_or_else(invalid)?;

    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&input.password, &user.password_hash) {
        return Err(invalid());
    }

    let access_token = state
        .keys
        .issue_access_token(user.id, &user.email, user.is_admin)
        .map_err(|e| ApiError::internal("Failed to issue token", e))?;
    Ok(Json(TokenOut { access_token }))
}

async fn me(State(state): State<AuthState>, user: AuthUser) -> Result<Json<MeOut>, ApiError> {
    let stored = state
        .users
        .find_user(user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(MeOut::from(&stored)))
}

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    token: Option<String>,
}

async fn verify(
    State(state): State<AuthState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<OkOut>, ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request(VerifyTokenError::Invalid.to_string()))?;
    let claims = state
        .keys
        .decode_verify_token(&token)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let user_id: ModelId = claims
        .sub
        .parse()
        .map_err(|_| ApiError::bad_request(VerifyTokenError::Invalid.to_string()))?;

    if !state.users.mark_verified(user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    info!(user_id, "Email verified");
    Ok(Json(OkOut { ok: true }))
}
