//! # Sessions and Access Control
//!
//! A successful OTP check opens a session: 32 random bytes, base64url, kept
//! in memory for 30 days. Clients present the token either as the
//! `menuqr_session` cookie or as `Authorization: Bearer <token>`.
//!
//! Extractors:
//! - [`MaybeUser`]: the logged-in user, if any
//! - [`AuthUser`]: JSON endpoints; anonymous requests get 401
//! - [`PageUser`]: HTML pages; anonymous requests are sent to `/login`
//! - [`AdminUser`]: back-office; anonymous → `/login`, non-admin → 403

use super::error::ApiError;
use super::state::AppState;
use crate::random::session_token;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{DateTime, Duration, Utc};
use menuqr_core::{User, UserId};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

pub const SESSION_COOKIE: &str = "menuqr_session";

/// Session lifetime in days.
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy)]
struct Session {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// In-memory session table keyed by token.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Open a session for `user_id` and return its token.
    pub async fn create(&self, user_id: UserId, now: DateTime<Utc>) -> String {
        let token = session_token();
        let session = Session {
            user_id,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        };
        self.sessions.write().await.insert(token.clone(), session);
        debug!(user_id = %user_id, "Session opened");
        token
    }

    /// User behind `token`. Expired sessions are dropped.
    pub async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Option<UserId> {
        let session = self.sessions.read().await.get(token).copied()?;
        if now >= session.expires_at {
            self.sessions.write().await.remove(token);
            return None;
        }
        Some(session.user_id)
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now < s.expires_at);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

// =============================================================================
// COOKIES
// =============================================================================

#[must_use]
pub fn session_cookie(token: &str) -> String {
    let max_age = SESSION_TTL_DAYS * 24 * 60 * 60;
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}")
}

#[must_use]
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Value of cookie `name` from the `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Session token from the bearer header, else from the cookie.
pub fn session_token_from(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    bearer.or_else(|| cookie_value(headers, SESSION_COOKIE))
}

async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(token) = session_token_from(&parts.headers) else {
        return Ok(None);
    };
    let Some(user_id) = state.sessions.resolve(&token, Utc::now()).await else {
        return Ok(None);
    };
    Ok(state.registry.user(user_id)?)
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// The logged-in user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        current_user(parts, state).await.map(MaybeUser)
    }
}

/// A logged-in user; 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await?
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// A logged-in user for page routes; redirects to `/login` otherwise.
#[derive(Debug, Clone)]
pub struct PageUser(pub User);

impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match current_user(parts, state).await {
            Ok(Some(user)) => Ok(PageUser(user)),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}

/// An administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match current_user(parts, state).await {
            Ok(Some(user)) if user.is_admin => Ok(AdminUser(user)),
            Ok(Some(user)) => {
                debug!(user_id = %user.id, path = %parts.uri.path(), "Admin access denied");
                Err(ApiError::Forbidden.into_response())
            }
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn sessions_expire_after_ttl() {
        let store = SessionStore::default();
        let now = Utc::now();
        let user = UserId::new();
        let token = store.create(user, now).await;

        assert_eq!(store.resolve(&token, now).await, Some(user));
        assert_eq!(store.resolve(&token, now + Duration::days(29)).await, Some(user));
        assert_eq!(store.resolve(&token, now + Duration::days(30)).await, None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn revoke_and_purge() {
        let store = SessionStore::default();
        let now = Utc::now();
        let a = store.create(UserId::new(), now).await;
        store.create(UserId::new(), now - Duration::days(31)).await;

        assert_eq!(store.purge_expired(now).await, 1);
        assert!(store.revoke(&a).await);
        assert!(!store.revoke(&a).await);
        assert_eq!(store.resolve("unknown", now).await, None);
    }

    #[test]
    fn token_prefers_bearer_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; menuqr_session=from-cookie"));
        assert_eq!(session_token_from(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token_from(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc");
        assert!(cookie.starts_with("menuqr_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
