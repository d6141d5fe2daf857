//! Request helpers shared by the handlers: multipart forms, page
//! negotiation, path ids and list queries.

use super::error::{ApiError, ApiResult};
use crate::pages;
use crate::uploads::Upload;
use axum::Json;
use axum::extract::Multipart;
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use menuqr_core::PageRequest;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// Largest accepted request body (menus are often scanned PDFs).
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

// =============================================================================
// MULTIPART
// =============================================================================

/// A fully buffered multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl FormData {
    /// Drain `multipart`. Empty file inputs are skipped.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;
                if bytes.is_empty() {
                    continue;
                }
                form.files.insert(
                    name,
                    Upload {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let text = field.text().await.map_err(malformed)?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// Trimmed text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files.get(name)
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::bad_request(format!("Malformed form data: {err}"))
}

// =============================================================================
// PAGES
// =============================================================================

/// Whether the client asked for JSON rather than HTML.
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

/// Island page, or its bare props for JSON clients.
pub fn page(headers: &HeaderMap, title: &str, island: &str, props: Value) -> Response {
    page_with_status(headers, StatusCode::OK, title, island, props)
}

pub fn page_with_status(
    headers: &HeaderMap,
    status: StatusCode,
    title: &str,
    island: &str,
    props: Value,
) -> Response {
    if wants_json(headers) {
        (status, Json(props)).into_response()
    } else {
        (status, pages::island(title, island, &props)).into_response()
    }
}

// =============================================================================
// IDS AND QUERIES
// =============================================================================

/// Parse a path id; malformed ids are reported like missing ones.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> ApiResult<T> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("{what} not found")))
}

/// `?page=&search=&filter=` on the admin tables.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub search: Option<String>,
    pub filter: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self, per_page: usize) -> PageRequest {
        let page = self.page.as_deref().and_then(|p| p.trim().parse::<i64>().ok());
        PageRequest::new(page, per_page)
    }

    pub fn search(&self) -> &str {
        self.search.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use menuqr_core::MenuId;

    #[test]
    fn json_is_negotiated_from_accept() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain"));
        assert!(wants_json(&headers));
    }

    #[test]
    fn bad_page_numbers_fall_back_to_first() {
        let query = ListQuery {
            page: Some("abc".into()),
            ..ListQuery::default()
        };
        assert_eq!(query.page_request(20).page, 1);
        let query = ListQuery {
            page: Some("3".into()),
            ..ListQuery::default()
        };
        assert_eq!(query.page_request(20).page, 3);
    }

    #[test]
    fn malformed_id_is_not_found() {
        let err = parse_id::<MenuId>("nope", "Menu").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Menu not found");
    }
}
