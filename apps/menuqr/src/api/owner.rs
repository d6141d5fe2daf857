//! Restaurant owner pages and endpoints: dashboard, onboarding, menus,
//! settings, notifications.

use super::auth::{AuthUser, MaybeUser, PageUser};
use super::error::{ApiError, ApiResult};
use super::forms::{FormData, page, parse_id};
use super::state::AppState;
use crate::uploads::Upload;
use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use menuqr_core::views::{MenuView, NotificationView, RestaurantDetail, UserView};
use menuqr_core::{MenuId, MenuKind, OnboardingStep, Restaurant, User};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

/// Redirect owners who have not finished onboarding.
fn onboarded(user: User) -> Result<User, Response> {
    if user.has_completed_onboarding() {
        Ok(user)
    } else {
        Err(Redirect::to("/onboarding").into_response())
    }
}

/// The restaurant of the requesting owner.
fn own_restaurant(state: &AppState, user: &User) -> ApiResult<Restaurant> {
    user.restaurant_id
        .map(|id| state.registry.restaurant(id))
        .transpose()?
        .flatten()
        .ok_or_else(|| ApiError::not_found("Restaurant not found"))
}

// =============================================================================
// PAGES
// =============================================================================

pub async fn home(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let user = match onboarded(user) {
        Ok(u) => u,
        Err(redirect) => return Ok(redirect),
    };
    let restaurant = own_restaurant(&state, &user)?;
    Ok(page(
        &headers,
        "Home",
        "Home/Index",
        json!({
            "user": UserView::from(&user),
            "restaurant": RestaurantDetail::from(&restaurant),
        }),
    ))
}

pub async fn menu_page(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let user = match onboarded(user) {
        Ok(u) => u,
        Err(redirect) => return Ok(redirect),
    };
    let restaurant = own_restaurant(&state, &user)?;
    let menus: Vec<MenuView> = state
        .registry
        .menus_for(restaurant.id)?
        .iter()
        .map(MenuView::from)
        .collect();
    Ok(page(
        &headers,
        "Menus",
        "Menu/Index",
        json!({
            "user": UserView::from(&user),
            "restaurant": RestaurantDetail::from(&restaurant),
            "menus": menus,
        }),
    ))
}

pub async fn qr_codes_page(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let user = match onboarded(user) {
        Ok(u) => u,
        Err(redirect) => return Ok(redirect),
    };
    let restaurant = own_restaurant(&state, &user)?;
    let today = Utc::now().date_naive();
    let qr_codes = state.registry.restaurant_qr_codes(restaurant.id, today)?;
    Ok(page(
        &headers,
        "QR codes",
        "QrCodes/Index",
        json!({ "qrCodes": qr_codes, "baseUrl": &*state.base_url }),
    ))
}

pub async fn settings_page(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let user = match onboarded(user) {
        Ok(u) => u,
        Err(redirect) => return Ok(redirect),
    };
    let restaurant = own_restaurant(&state, &user)?;
    Ok(page(
        &headers,
        "Settings",
        "Settings/Index",
        json!({ "restaurant": RestaurantDetail::from(&restaurant) }),
    ))
}

/// Lists notifications newest first and marks them read.
pub async fn notifications_page(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let user = match onboarded(user) {
        Ok(u) => u,
        Err(redirect) => return Ok(redirect),
    };
    let notifications: Vec<NotificationView> = state
        .registry
        .notifications_for(user.id, Utc::now())?
        .iter()
        .map(NotificationView::from)
        .collect();
    Ok(page(
        &headers,
        "Notifications",
        "Notifications/Index",
        json!({ "notifications": notifications }),
    ))
}

/// Unread count for the badge; anonymous visitors get zero.
pub async fn notifications_count(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> ApiResult<Json<Value>> {
    let count = match user {
        Some(user) => state.registry.unread_count(user.id)?,
        None => 0,
    };
    Ok(Json(json!({ "count": count })))
}

// =============================================================================
// ONBOARDING
// =============================================================================

pub async fn onboarding_page(PageUser(user): PageUser, headers: HeaderMap) -> Response {
    let step = OnboardingStep::assess(&user);
    if step == OnboardingStep::Completed {
        return Redirect::to("/").into_response();
    }
    page(
        &headers,
        "Welcome",
        "Onboarding/Index",
        json!({ "current_step": step.number(), "user": UserView::from(&user) }),
    )
}

#[derive(Debug, Deserialize)]
pub struct StepOne {
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Deserialize)]
pub struct StepTwo {
    #[serde(default)]
    pub restaurant_name: String,
}

pub async fn onboarding_step_one(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<StepOne>,
) -> ApiResult<Json<Value>> {
    state.registry.onboarding_first_name(user.id, &body.first_name)?;
    Ok(Json(json!({
        "success": true,
        "message": "First name saved",
        "next_step": 2,
    })))
}

pub async fn onboarding_step_two(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<StepTwo>,
) -> ApiResult<Json<Value>> {
    state
        .registry
        .onboarding_restaurant(user.id, &body.restaurant_name, Utc::now())?;
    Ok(Json(json!({
        "success": true,
        "message": "Onboarding completed",
        "redirect": "/",
    })))
}

// =============================================================================
// MENUS
// =============================================================================

/// Reject a file that does not match the menu kind.
pub(super) fn check_menu_file(kind: MenuKind, upload: &Upload) -> ApiResult<()> {
    if kind.accepts(&upload.mime()) {
        Ok(())
    } else {
        Err(ApiError::bad_request(kind.rejection_message()))
    }
}

/// Validate a new-menu form, store its file and record the menu.
pub(super) async fn create_menu_from_form(
    state: &AppState,
    restaurant: &Restaurant,
    form: &FormData,
) -> ApiResult<MenuView> {
    let (Some(name), Some(kind)) = (form.text("name"), form.text("type")) else {
        return Err(ApiError::bad_request("Name and type are required"));
    };
    let kind: MenuKind = kind.parse()?;
    let upload = form
        .file("file")
        .ok_or_else(|| ApiError::bad_request("File is required"))?;
    check_menu_file(kind, upload)?;

    let path = state.uploads.save_menu(restaurant.id, upload).await?;
    match state
        .registry
        .create_menu(restaurant.id, name, kind, path.clone(), Utc::now())
    {
        Ok(menu) => Ok(MenuView::from(&menu)),
        Err(e) => {
            state.uploads.remove(&path).await;
            Err(e.into())
        }
    }
}

/// Rename a menu and optionally replace its file.
pub(super) async fn update_menu_from_form(
    state: &AppState,
    restaurant: &Restaurant,
    menu_id: MenuId,
    form: &FormData,
) -> ApiResult<MenuView> {
    let menu = state.registry.menu(restaurant.id, menu_id)?;
    let name = form
        .text("name")
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;

    let new_path = match form.file("file") {
        Some(upload) => {
            check_menu_file(menu.kind, upload)?;
            Some(state.uploads.save_menu(restaurant.id, upload).await?)
        }
        None => None,
    };

    match state
        .registry
        .update_menu(restaurant.id, menu_id, name, new_path.clone(), Utc::now())
    {
        Ok((menu, replaced)) => {
            if let Some(old) = replaced {
                state.uploads.remove(&old).await;
            }
            Ok(MenuView::from(&menu))
        }
        Err(e) => {
            if let Some(path) = new_path {
                state.uploads.remove(&path).await;
            }
            Err(e.into())
        }
    }
}

pub async fn create_menu(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let restaurant = own_restaurant(&state, &user)?;
    let form = FormData::read(multipart).await?;
    let menu = create_menu_from_form(&state, &restaurant, &form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Menu created",
        "menu": menu,
    })))
}

pub async fn list_menus(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let restaurant = own_restaurant(&state, &user)?;
    let menus: Vec<MenuView> = state
        .registry
        .menus_for(restaurant.id)?
        .iter()
        .map(MenuView::from)
        .collect();
    Ok(Json(json!({ "success": true, "menus": menus })))
}

pub async fn update_menu(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let restaurant = own_restaurant(&state, &user)?;
    let menu_id: MenuId = parse_id(&id, "Menu")?;
    let form = FormData::read(multipart).await?;
    let menu = update_menu_from_form(&state, &restaurant, menu_id, &form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Menu updated",
        "menu": menu,
    })))
}

pub async fn delete_menu(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let restaurant = own_restaurant(&state, &user)?;
    let menu_id: MenuId = parse_id(&id, "Menu")?;
    let file_path = state.registry.delete_menu(restaurant.id, menu_id)?;
    state.uploads.remove(&file_path).await;
    Ok(Json(json!({ "success": true, "message": "Menu deleted" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuOrder {
    pub id: String,
    pub display_order: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    #[serde(default)]
    pub menus: Vec<MenuOrder>,
}

pub async fn reorder_menus(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ReorderBody>,
) -> ApiResult<Json<Value>> {
    let restaurant = own_restaurant(&state, &user)?;
    let order = body
        .menus
        .iter()
        .map(|m| {
            m.id.parse::<MenuId>()
                .map(|id| (id, m.display_order))
                .map_err(|_| ApiError::bad_request("Invalid menu id"))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    state
        .registry
        .reorder_menus(restaurant.id, &order, Utc::now())?;
    Ok(Json(json!({ "success": true, "message": "Menu order updated" })))
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Both photo fields must hold images.
pub(super) fn check_images(form: &FormData, fields: &[&str]) -> ApiResult<()> {
    for field in fields {
        if let Some(upload) = form.file(field) {
            if !upload.is_image() {
                return Err(ApiError::bad_request("The file must be an image"));
            }
        }
    }
    Ok(())
}

pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let restaurant = own_restaurant(&state, &user)?;
    let form = FormData::read(multipart).await?;
    let name = form
        .text("name")
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;
    check_images(&form, &["photo", "background"])?;

    let now = Utc::now();
    let mut restaurant =
        state
            .registry
            .update_restaurant(restaurant.id, name, form.text("description"), now)?;

    let photo = match form.file("photo") {
        Some(upload) => Some(state.uploads.save_restaurant_photo(restaurant.id, upload).await?),
        None => None,
    };
    let background = match form.file("background") {
        Some(upload) => Some(state.uploads.save_restaurant_photo(restaurant.id, upload).await?),
        None => None,
    };
    if photo.is_some() || background.is_some() {
        let (updated, replaced) = state
            .registry
            .set_photos(restaurant.id, photo, background, now)?;
        state.uploads.remove_all(replaced).await;
        restaurant = updated;
    }

    info!(user_id = %user.id, restaurant_id = %restaurant.id, "Settings updated");
    Ok(Json(json!({
        "success": true,
        "restaurant": RestaurantDetail::from(&restaurant),
    })))
}
