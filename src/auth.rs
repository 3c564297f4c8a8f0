use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    repository::RepositoryState,
};

/// Claims
///
/// Represents the standard payload structure expected inside a JSON Web Token
/// (JWT). These claims are signed by the auth provider's secret and validated
/// upon every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): The UUID of the user, the primary key used to fetch the
    /// user's record from the users table.
    pub sub: Uuid,
    /// Expiration Time (exp): Timestamp after which the JWT must not be accepted.
    pub exp: usize,
    /// Issued At (iat): Timestamp when the JWT was issued.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the acting viewer.
/// Handlers use it for every author-gated check, and the username for
/// redirect targets back to the viewer's own profile.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The unique identifier of the user, mapped to users.id.
    pub id: Uuid,
    /// The user's unique public handle, used in profile URLs.
    pub username: String,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any authenticated handler. This cleanly separates
/// authentication (extractor) from business logic (the handler).
///
/// The process:
/// 1. Dependency Resolution: Repository and AppConfig from the application state.
/// 2. Local Bypass: development-time access using the 'x-user-id' header.
/// 3. Token Validation: Bearer token extraction and JWT decoding.
/// 4. DB Lookup: fetching the user's record from Postgres.
///
/// Rejection: Returns StatusCode::UNAUTHORIZED (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local Development Bypass Check
        // In Env::Local, a request may authenticate by providing a known, valid
        // UUID in the 'x-user-id' header. Guarded by the Env check.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        // The UUID must still map to an actual user row so the
                        // resolved identity carries a real username.
                        if let Some(user) = repo.get_user(user_id).await {
                            return Ok(AuthUser {
                                id: user.id,
                                username: user.username,
                            });
                        }
                    }
                }
            }
        }
        // If Env is Production, or the bypass failed, execution falls through
        // to the standard JWT validation flow.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => match e.kind() {
                // Token expired: the most common failure for a valid-but-old token.
                ErrorKind::ExpiredSignature => return Err(StatusCode::UNAUTHORIZED),
                // Bad signature, malformed token, etc.
                _ => return Err(StatusCode::UNAUTHORIZED),
            },
        };

        // Database Lookup (Final Verification)
        // Prevents access if the user was deleted after the token was issued.
        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }
}

/// MaybeAuthUser
///
/// A never-rejecting variant of the AuthUser extractor for public routes whose
/// behavior depends on who is looking (post detail, profile feed). Anonymous
/// and failed authentication both resolve to `None`, so public handlers always
/// receive an explicit optional viewer identity instead of reading ambient
/// request state.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    /// The viewer's id, if any. The form the visibility predicate consumes.
    pub fn viewer_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(
            <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state)
                .await
                .ok(),
        ))
    }
}
