//! Unauthenticated routes hit by diners: QR scans and restaurant pages.

use super::auth::cookie_value;
use super::error::{ApiError, ApiResult};
use super::forms::{page, page_with_status};
use super::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header::{REFERER, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use menuqr_core::{CoreError, ScanMetadata};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

/// Cookie the public page stores the browser fingerprint in.
pub const FINGERPRINT_COOKIE: &str = "user_fp";

fn header_text(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Client address as reported by the reverse proxy.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_text(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_text(headers, "x-real-ip"))
}

pub fn scan_metadata(headers: &HeaderMap) -> ScanMetadata {
    ScanMetadata {
        user_agent: header_text(headers, USER_AGENT),
        ip_address: client_ip(headers),
        referer: header_text(headers, REFERER),
    }
}

fn not_found_page(headers: &HeaderMap, message: &str) -> Response {
    page_with_status(
        headers,
        StatusCode::NOT_FOUND,
        "Not found",
        "Public/NotFound",
        json!({ "message": message }),
    )
}

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    pub fp: Option<String>,
}

/// Record a scan and send the diner on to the restaurant page.
pub async fn scan(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<ScanQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let fingerprint = query
        .fp
        .or_else(|| cookie_value(&headers, FINGERPRINT_COOKIE));

    let registry = state.registry.clone();
    let metadata = scan_metadata(&headers);
    let recorded = tokio::task::spawn_blocking(move || {
        registry.record_scan(&code, fingerprint.as_deref(), metadata, Utc::now())
    })
    .await
    .map_err(ApiError::internal)?;

    let (qr, restaurant) = match recorded {
        Ok(found) => found,
        Err(CoreError::NotFound(message)) => return Ok(not_found_page(&headers, &message)),
        Err(e) => return Err(e.into()),
    };

    match restaurant {
        Some(restaurant) => Ok(Redirect::to(&format!(
            "/restaurant/{}?qr={}",
            restaurant.slug, qr.code
        ))
        .into_response()),
        None => Ok(page(
            &headers,
            "QR code",
            "Public/QrNoRestaurant",
            json!({
                "code": qr.code,
                "qrCode": { "code": qr.code, "tableName": qr.table_name },
            }),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct FingerprintBody {
    pub qr_code: Option<String>,
    pub fingerprint: Option<String>,
}

/// Attach a fingerprint computed after the redirect to the latest scan.
pub async fn update_fingerprint(
    State(state): State<AppState>,
    Json(body): Json<FingerprintBody>,
) -> ApiResult<Json<Value>> {
    let (Some(code), Some(fingerprint)) = (body.qr_code, body.fingerprint) else {
        return Err(ApiError::bad_request("Missing parameters"));
    };
    let registry = state.registry.clone();
    tokio::task::spawn_blocking(move || registry.attach_fingerprint(&code, &fingerprint))
        .await
        .map_err(ApiError::internal)??;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct RestaurantQuery {
    pub qr: Option<String>,
}

pub async fn restaurant_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<RestaurantQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let Some(public) = state.registry.public_restaurant(&slug)? else {
        return Ok(not_found_page(&headers, "Restaurant not found"));
    };
    info!(slug = %slug, menus = public.menus.len(), "Public restaurant page viewed");
    let title = public.restaurant.name.clone();
    Ok(page(
        &headers,
        &title,
        "Public/Restaurant",
        json!({
            "restaurant": public.restaurant,
            "menus": public.menus,
            "qr": query.qr,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("197.159.1.2, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("197.159.1.2"));
    }

    #[test]
    fn metadata_reads_browser_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(REFERER, HeaderValue::from_static("https://example.com/"));
        let meta = scan_metadata(&headers);
        assert_eq!(meta.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(meta.referer.as_deref(), Some("https://example.com/"));
        assert_eq!(meta.ip_address, None);
    }
}
