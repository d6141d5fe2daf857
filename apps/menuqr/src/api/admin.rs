//! # Back-Office
//!
//! Admin-only pages and JSON endpoints: dashboard, users, restaurants with
//! their menus and scan log, and the QR code stock.

use super::auth::AdminUser;
use super::error::{ApiError, ApiResult};
use super::forms::{FormData, ListQuery, page, parse_id};
use super::owner::{check_images, create_menu_from_form, update_menu_from_form};
use super::state::AppState;
use crate::random::ThreadEntropy;
use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;
use menuqr_core::codes::clamp_batch;
use menuqr_core::page::{ADMIN_PAGE_SIZE, SCAN_PAGE_SIZE};
use menuqr_core::views::{MenuView, RestaurantDetail, UserView};
use menuqr_core::{MenuId, NewUser, QrCodeId, QrFilter, Restaurant, RestaurantId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

fn find_restaurant(state: &AppState, raw_id: &str) -> ApiResult<Restaurant> {
    let id: RestaurantId = parse_id(raw_id, "Restaurant")?;
    state
        .registry
        .restaurant(id)?
        .ok_or_else(|| ApiError::not_found("Restaurant not found"))
}

// =============================================================================
// DASHBOARD & USERS
// =============================================================================

pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let stats = state.registry.admin_stats()?;
    Ok(page(&headers, "Admin", "Admin/Dashboard", json!({ "stats": stats })))
}

pub async fn users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let page_data = state
        .registry
        .list_users(query.search.as_deref(), query.page_request(ADMIN_PAGE_SIZE))?;
    let restaurants = state.registry.restaurant_options()?;
    Ok(page(
        &headers,
        "Users",
        "Admin/Users",
        json!({
            "users": page_data.items,
            "currentPage": page_data.page,
            "totalPages": page_data.total_pages,
            "search": query.search(),
            "total": page_data.total,
            "restaurants": restaurants,
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserBody {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub restaurant_id: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<Json<Value>> {
    let input = NewUser {
        phone_number: body.phone_number,
        first_name: body.first_name,
        last_name: body.last_name,
        is_admin: body.is_admin,
        restaurant_id: body.restaurant_id.and_then(|id| id.parse().ok()),
    };
    let user = state.registry.admin_create_user(input, Utc::now())?;
    info!(admin_id = %admin.id, user_id = %user.id, "Admin created user");
    Ok(Json(json!({ "success": true, "user": UserView::from(&user) })))
}

// =============================================================================
// RESTAURANTS
// =============================================================================

pub async fn restaurants(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let page_data = state
        .registry
        .list_restaurants(query.search.as_deref(), query.page_request(ADMIN_PAGE_SIZE))?;
    Ok(page(
        &headers,
        "Restaurants",
        "Admin/Restaurants",
        json!({
            "restaurants": page_data.items,
            "currentPage": page_data.page,
            "totalPages": page_data.total_pages,
            "search": query.search(),
            "total": page_data.total,
        }),
    ))
}

/// Store logo/background uploads and point the restaurant at them.
async fn apply_admin_photos(
    state: &AppState,
    restaurant: Restaurant,
    form: &FormData,
) -> ApiResult<Restaurant> {
    let photo = match form.file("logo") {
        Some(upload) => Some(state.uploads.save_admin_photo(upload).await?),
        None => None,
    };
    let background = match form.file("background") {
        Some(upload) => Some(state.uploads.save_admin_photo(upload).await?),
        None => None,
    };
    if photo.is_none() && background.is_none() {
        return Ok(restaurant);
    }
    let (updated, replaced) = state
        .registry
        .set_photos(restaurant.id, photo, background, Utc::now())?;
    state.uploads.remove_all(replaced).await;
    Ok(updated)
}

pub async fn create_restaurant(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let form = FormData::read(multipart).await?;
    let name = form
        .text("name")
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;
    check_images(&form, &["logo", "background"])?;

    let restaurant = state
        .registry
        .create_restaurant(name, form.text("description"), Utc::now())?;
    let restaurant = apply_admin_photos(&state, restaurant, &form).await?;
    Ok(Json(json!({
        "success": true,
        "restaurant": { "id": restaurant.id, "name": restaurant.name, "slug": restaurant.slug },
    })))
}

pub async fn restaurant_detail(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let restaurant = find_restaurant(&state, &id)?;
    Ok(Json(json!({
        "success": true,
        "restaurant": RestaurantDetail::from(&restaurant),
    })))
}

pub async fn update_restaurant(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let restaurant = find_restaurant(&state, &id)?;
    let form = FormData::read(multipart).await?;
    let name = form
        .text("name")
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;
    check_images(&form, &["logo", "background"])?;

    let restaurant =
        state
            .registry
            .update_restaurant(restaurant.id, name, form.text("description"), Utc::now())?;
    let restaurant = apply_admin_photos(&state, restaurant, &form).await?;
    Ok(Json(json!({
        "success": true,
        "restaurant": RestaurantDetail::from(&restaurant),
    })))
}

// ===== RESTAURANT MENUS =====

pub async fn restaurant_menus(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let restaurant = find_restaurant(&state, &id)?;
    let menus: Vec<MenuView> = state
        .registry
        .menus_for(restaurant.id)?
        .iter()
        .map(MenuView::from)
        .collect();
    Ok(Json(json!({ "success": true, "menus": menus })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PositionOrder {
    pub order: Vec<String>,
}

/// List position becomes display order.
pub async fn reorder_restaurant_menus(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<PositionOrder>,
) -> ApiResult<Json<Value>> {
    let restaurant = find_restaurant(&state, &id)?;
    let ids = body
        .order
        .iter()
        .map(|raw| {
            raw.parse::<MenuId>()
                .map_err(|_| ApiError::bad_request("Invalid menu id"))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    state
        .registry
        .reorder_menus_by_position(restaurant.id, &ids, Utc::now())?;
    Ok(Json(json!({ "success": true })))
}

pub async fn create_restaurant_menu(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let restaurant = find_restaurant(&state, &id)?;
    let form = FormData::read(multipart).await?;
    let menu = create_menu_from_form(&state, &restaurant, &form).await?;
    Ok(Json(json!({ "success": true, "menu": menu })))
}

pub async fn update_restaurant_menu(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path((id, menu_id)): Path<(String, String)>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let restaurant = find_restaurant(&state, &id)?;
    let menu_id: MenuId = parse_id(&menu_id, "Menu")?;
    let form = FormData::read(multipart).await?;
    let menu = update_menu_from_form(&state, &restaurant, menu_id, &form).await?;
    Ok(Json(json!({ "success": true, "menu": menu })))
}

pub async fn delete_restaurant_menu(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path((id, menu_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let restaurant = find_restaurant(&state, &id)?;
    let menu_id: MenuId = parse_id(&menu_id, "Menu")?;
    let file_path = state.registry.delete_menu(restaurant.id, menu_id)?;
    state.uploads.remove(&file_path).await;
    Ok(Json(json!({ "success": true })))
}

/// Scan log of every code assigned to the restaurant, 50 per page.
pub async fn restaurant_scans(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let restaurant = find_restaurant(&state, &id)?;
    let scans = state
        .registry
        .restaurant_scans(restaurant.id, query.page_request(SCAN_PAGE_SIZE))?;
    Ok(Json(json!({
        "success": true,
        "scans": scans.items,
        "total": scans.total,
        "page": scans.page,
        "perPage": scans.per_page,
        "totalPages": scans.total_pages,
    })))
}

// =============================================================================
// QR CODES
// =============================================================================

pub async fn qr_codes(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let filter = QrFilter::parse(query.filter.as_deref());
    let page_data = state.registry.list_qr_codes(
        query.search.as_deref(),
        filter,
        query.page_request(ADMIN_PAGE_SIZE),
    )?;
    let restaurants = state.registry.restaurant_options()?;
    Ok(page(
        &headers,
        "QR codes",
        "Admin/QrCodes",
        json!({
            "qrCodes": page_data.items,
            "restaurants": restaurants,
            "currentPage": page_data.page,
            "totalPages": page_data.total_pages,
            "search": query.search(),
            "filter": filter.as_str(),
            "total": page_data.total,
            "baseUrl": &*state.base_url,
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateBody {
    pub count: Option<i64>,
}

pub async fn generate_qr_codes(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<GenerateBody>,
) -> ApiResult<Json<Value>> {
    let count = clamp_batch(body.count);
    let codes = state
        .registry
        .generate_qr_codes(count, Utc::now(), &mut ThreadEntropy)?;
    info!(admin_id = %admin.id, generated = codes.len(), "QR codes generated");
    Ok(Json(json!({ "success": true, "generated": codes.len() })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignBody {
    pub restaurant_id: Option<String>,
    pub table_name: Option<String>,
}

pub async fn assign_qr_code(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<AssignBody>,
) -> ApiResult<Json<Value>> {
    let qr_id: QrCodeId = parse_id(&id, "QR code")?;
    let restaurant_id = match body
        .restaurant_id
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
    {
        Some(raw) => Some(parse_id::<RestaurantId>(raw, "Restaurant")?),
        None => None,
    };
    state.registry.assign_qr_code(
        qr_id,
        restaurant_id,
        body.table_name.as_deref(),
        Utc::now(),
    )?;
    Ok(Json(json!({ "success": true })))
}

pub async fn unassign_qr_code(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let qr_id: QrCodeId = parse_id(&id, "QR code")?;
    state.registry.unassign_qr_code(qr_id, Utc::now())?;
    Ok(Json(json!({ "success": true })))
}
