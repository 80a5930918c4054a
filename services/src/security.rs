use crate::error::{ApiError, GenericError};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use common::{api::ModelId, config::JwtConfig};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use thiserror::Error;

const VERIFY_TOKEN_TYPE: &str = "verify";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyTokenError {
    #[error("Invalid or expired token")]
    Invalid,
    #[error("Invalid token type")]
    WrongType,
}

/// HS256 signing material for access and email verification tokens.
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    verify_encoding: EncodingKey,
    verify_decoding: DecodingKey,
    issuer: Option<String>,
    audience: Option<String>,
    access_ttl_seconds: i64,
    verify_ttl_seconds: i64,
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            verify_encoding: EncodingKey::from_secret(config.verify_secret().as_bytes()),
            verify_decoding: DecodingKey::from_secret(config.verify_secret().as_bytes()),
            issuer: config.issuer.clone().filter(|s| !s.is_empty()),
            audience: config.audience.clone().filter(|s| !s.is_empty()),
            access_ttl_seconds: config.access_ttl_seconds,
            verify_ttl_seconds: config.verify_ttl_seconds,
        }
    }

    /// Keys sharing one secret with default lifetimes.
    pub fn from_secret(secret: &str) -> Self {
        Self::from_config(&JwtConfig {
            secret: secret.to_string(),
            access_ttl_seconds: 24 * 3600,
            verify_ttl_seconds: 3600,
            ..Default::default()
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }

    fn decode_with<T: DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
    ) -> Result<T, jsonwebtoken::errors::Error> {
        decode::<T>(token, key, &self.validation()).map(|data| data.claims)
    }

    pub fn issue_access_token(
        &self,
        user_id: ModelId,
        email: &str,
        is_admin: bool,
    ) -> Result<String, GenericError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            is_admin,
            iat: now,
            exp: now + self.access_ttl_seconds,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        Ok(encode(&Header::default(), &claims, &self.access_encoding)?)
    }

    pub fn decode_access_token(&self, token: &str) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        self.decode_with(token, &self.access_decoding)
    }

    pub fn issue_verify_token(&self, user_id: ModelId, email: &str) -> Result<String, GenericError> {
        let now = Utc::now().timestamp();
        let claims = VerifyClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.verify_ttl_seconds,
            typ: Some(VERIFY_TOKEN_TYPE.to_string()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        Ok(encode(&Header::default(), &claims, &self.verify_encoding)?)
    }

    pub fn decode_verify_token(&self, token: &str) -> Result<VerifyClaims, VerifyTokenError> {
        let claims: VerifyClaims = self
            .decode_with(token, &self.verify_decoding)
            .map_err(|_| VerifyTokenError::Invalid)?;

        if claims.typ.as_deref() != Some(VERIFY_TOKEN_TYPE) {
            return Err(VerifyTokenError::WrongType);
        }
        Ok(claims)
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthUser, ApiError> {
        let claims = self
            .decode_access_token(token)
            .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;
        let user_id = claims
            .sub
            .parse::<ModelId>()
            .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            is_admin: claims.is_admin,
            token: token.to_string(),
        })
    }
}

/// The caller behind a valid bearer token.
///
/// The raw token is kept so it can be forwarded to other services.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ModelId,
    pub email: String,
    pub is_admin: bool,
    pub token: String,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if !self.is_admin {
            return Err(ApiError::Forbidden("Admin only".to_string()));
        }
        Ok(())
    }
}

pub fn bearer_token(header: Option<&str>) -> Result<&str, ApiError> {
    let missing = || ApiError::Unauthorized("Missing bearer token".to_string());
    let token = header
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(missing)?
        .trim();

    if token.is_empty() {
        return Err(missing());
    }
    Ok(token)
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<JwtKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<JwtKeys>::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        keys.authenticate(bearer_token(header)?)
    }
}
