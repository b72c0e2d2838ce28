// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token verification for the account API.
//!
//! The web app's identity bridge signs an HS256 token whose subject is the
//! signed-in user's document id in `users`. Browsers send it as the
//! [`SESSION_COOKIE`]; scripts and tests may send it as a bearer token.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the session cookie set by the identity bridge.
pub const SESSION_COOKIE: &str = "adalert_token";

/// Lifetime of tokens minted by [`create_jwt`].
pub const SESSION_TTL_SECS: usize = 7 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user document id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Signed-in user, attached to the request for the API handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Session token from the cookie, falling back to a bearer header.
fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// User document id named by a token subject. Paths such as `users/abc`
/// are refused so a subject can never address another collection.
fn subject_user_id(sub: &str) -> Option<String> {
    let id = sub.trim();
    (!id.is_empty() && !id.contains('/')).then(|| id.to_string())
}

/// Middleware that admits only requests carrying a valid session token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = session_token(&jar, request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(&token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        StatusCode::UNAUTHORIZED
    })?;

    let user_id = subject_user_id(&token_data.claims.sub).ok_or_else(|| {
        tracing::warn!(sub = %token_data.claims.sub, "Session token subject is not a user id");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}

/// Mint a session token for a user document id.
pub fn create_jwt(user_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn test_session_cookie_wins_over_bearer_header() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "from-cookie"));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );

        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-cookie"));
        assert_eq!(
            session_token(&CookieJar::new(), &headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&CookieJar::new(), &headers), None);
    }

    #[test]
    fn test_subject_must_be_a_bare_user_id() {
        assert_eq!(subject_user_id(" admin ").as_deref(), Some("admin"));
        assert_eq!(subject_user_id("users/admin"), None);
        assert_eq!(subject_user_id("adsAccounts/acc1"), None);
        assert_eq!(subject_user_id("  "), None);
    }

    #[test]
    fn test_minted_token_names_the_user() {
        let key = b"adalert_unit_test_signing_key_32";
        let token = create_jwt("manager", key).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(key),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "manager");
        assert_eq!(data.claims.exp - data.claims.iat, SESSION_TTL_SECS);
    }
}
