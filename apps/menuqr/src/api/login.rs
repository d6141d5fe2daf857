//! Phone login: request a code, verify it, log out.

use super::auth::{MaybeUser, clear_session_cookie, session_cookie, session_token_from};
use super::error::{ApiError, ApiResult};
use super::forms::page_with_status;
use super::state::AppState;
use crate::random::ThreadEntropy;
use axum::Form;
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use menuqr_core::otp::OTP_EXPIRY_SECS;
use menuqr_core::{CoreError, phone};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

const SEND_FAILED: &str = "Failed to send OTP. Please try again.";
const INVALID_CODE: &str = "Invalid or expired OTP code";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    #[serde(default)]
    pub otp_code: String,
}

fn login_page(headers: &HeaderMap, status: StatusCode, error: Option<&str>, phone: Option<&str>) -> Response {
    page_with_status(
        headers,
        status,
        "Login",
        "Auth/Login",
        json!({ "error": error, "phone_number": phone }),
    )
}

fn verify_page(headers: &HeaderMap, status: StatusCode, phone: &str, error: Option<&str>) -> Response {
    page_with_status(
        headers,
        status,
        "Verify",
        "Auth/Verify",
        json!({ "phone_number": phone, "error": error, "expires_in": OTP_EXPIRY_SECS }),
    )
}

pub async fn show_login(MaybeUser(user): MaybeUser, headers: HeaderMap) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    login_page(&headers, StatusCode::OK, None, None)
}

/// Create the account on first contact and send a login code.
pub async fn submit_login(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let phone_number = match phone::normalize(&form.phone_number) {
        Ok(p) => p,
        Err(CoreError::Validation(message)) => {
            return Ok(login_page(&headers, StatusCode::BAD_REQUEST, Some(&message), None));
        }
        Err(e) => return Err(e.into()),
    };

    if !state.allow_otp_request(&phone_number) {
        warn!(phone_number = %phone_number, "OTP request rate limited");
        let message = ApiError::TooManyRequests.public_message();
        return Ok(login_page(
            &headers,
            StatusCode::TOO_MANY_REQUESTS,
            Some(&message),
            Some(&phone_number),
        ));
    }

    let now = Utc::now();
    let user = state.registry.login_user(&phone_number, now)?;
    let code = state
        .registry
        .issue_otp(&user.phone_number, now, &mut ThreadEntropy)?;

    match state.messenger.send_otp(&user.phone_number, &code).await {
        Ok(()) => Ok(Redirect::to(&format!("/verify?phone={}", user.phone_number)).into_response()),
        Err(e) => {
            warn!(phone_number = %user.phone_number, error = %e, "Failed to send OTP");
            Ok(login_page(
                &headers,
                StatusCode::BAD_GATEWAY,
                Some(SEND_FAILED),
                Some(&user.phone_number),
            ))
        }
    }
}

pub async fn show_verify(
    MaybeUser(user): MaybeUser,
    Query(query): Query<VerifyQuery>,
    headers: HeaderMap,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    match query.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(phone) => verify_page(&headers, StatusCode::OK, phone, None),
        None => Redirect::to("/login").into_response(),
    }
}

/// Check the submitted code and open a session.
pub async fn submit_verify(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<VerifyQuery>,
    headers: HeaderMap,
    Form(form): Form<VerifyForm>,
) -> ApiResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let Some(phone) = query.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(Redirect::to("/login").into_response());
    };

    let code = form.otp_code.trim();
    if code.is_empty() {
        return Ok(verify_page(
            &headers,
            StatusCode::BAD_REQUEST,
            phone,
            Some("Please enter the OTP code"),
        ));
    }

    let user = match state.registry.user_by_phone(phone) {
        Ok(Some(user)) => user,
        Ok(None) | Err(CoreError::Validation(_)) => return Ok(Redirect::to("/login").into_response()),
        Err(e) => return Err(e.into()),
    };

    let now = Utc::now();
    if !state.registry.check_otp(&user.phone_number, code, now)?.is_valid() {
        return Ok(verify_page(&headers, StatusCode::UNAUTHORIZED, phone, Some(INVALID_CODE)));
    }

    let was_verified = user.is_verified;
    let user = state.registry.mark_verified(user.id)?;
    if !was_verified {
        info!(phone_number = %user.phone_number, "User verified");
    }

    let token = state.sessions.create(user.id, now).await;
    info!(user_id = %user.id, "User logged in");
    Ok(([(SET_COOKIE, session_cookie(&token))], Redirect::to("/")).into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token_from(&headers) {
        state.sessions.revoke(&token).await;
    }
    ([(SET_COOKIE, clear_session_cookie())], Redirect::to("/login")).into_response()
}
