//! # HTTP Server
//!
//! axum router over a shared [`AppState`]. Page routes answer with an
//! island shell (or the bare props when the client accepts JSON); the rest
//! are JSON endpoints returning `{"success": ...}` bodies.

pub mod admin;
pub mod auth;
pub mod error;
pub mod forms;
pub mod login;
pub mod owner;
pub mod public;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use crate::config::ServerConfig;
use crate::uploads::UploadStore;
use crate::whatsapp::Messenger;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use menuqr_core::{OtpCache, Registry, Store};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Interval between sweeps of expired sessions and login codes.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Every route except the static uploads directory.
pub fn routes() -> Router<AppState> {
    let owner = Router::new()
        .route("/", get(owner::home))
        .route("/menu", get(owner::menu_page))
        .route("/qr-codes", get(owner::qr_codes_page))
        .route("/settings", get(owner::settings_page))
        .route("/settings/update", post(owner::update_settings))
        .route("/notifications", get(owner::notifications_page))
        .route("/notifications/count", get(owner::notifications_count))
        .route("/onboarding", get(owner::onboarding_page))
        .route("/onboarding/step-1", post(owner::onboarding_step_one))
        .route("/onboarding/step-2", post(owner::onboarding_step_two))
        .route("/menu/create", post(owner::create_menu))
        .route("/menu/list", get(owner::list_menus))
        .route("/menu/update/{id}", post(owner::update_menu))
        .route("/menu/delete/{id}", post(owner::delete_menu))
        .route("/menu/reorder", post(owner::reorder_menus));

    let admin = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/users", get(admin::users))
        .route("/admin/users/create", post(admin::create_user))
        .route("/admin/restaurants", get(admin::restaurants))
        .route("/admin/restaurants/create", post(admin::create_restaurant))
        .route(
            "/admin/restaurants/{id}",
            get(admin::restaurant_detail).post(admin::update_restaurant),
        )
        .route("/admin/restaurants/{id}/menus", get(admin::restaurant_menus))
        .route(
            "/admin/restaurants/{id}/menus/reorder",
            post(admin::reorder_restaurant_menus),
        )
        .route(
            "/admin/restaurants/{id}/menus/create",
            post(admin::create_restaurant_menu),
        )
        .route(
            "/admin/restaurants/{id}/menus/{menu_id}",
            post(admin::update_restaurant_menu).delete(admin::delete_restaurant_menu),
        )
        .route("/admin/restaurants/{id}/scans", get(admin::restaurant_scans))
        .route("/admin/qrcodes", get(admin::qr_codes))
        .route("/admin/qrcodes/generate", post(admin::generate_qr_codes))
        .route("/admin/qrcodes/{id}/assign", post(admin::assign_qr_code))
        .route("/admin/qrcodes/{id}/unassign", post(admin::unassign_qr_code));

    Router::new()
        .route("/health", get(health))
        .route("/login", get(login::show_login).post(login::submit_login))
        .route("/verify", get(login::show_verify).post(login::submit_verify))
        .route("/logout", get(login::logout))
        .route("/q/{code}", get(public::scan))
        .route("/api/scan/update-fingerprint", post(public::update_fingerprint))
        .route("/restaurant/{slug}", get(public::restaurant_page))
        .merge(owner)
        .merge(admin)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true)
            .max_age(Duration::from_secs(60 * 60)),
    )
}

/// Full application: routes, uploads, tracing and optional CORS.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let uploads = ServeDir::new(state.uploads.root());
    let router = routes()
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(forms::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());
    let router = match cors_layer(cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.with_state(state)
}

/// Periodically drop expired sessions and login codes.
fn spawn_sweeper(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let now = chrono::Utc::now();
            let sessions = state.sessions.purge_expired(now).await;
            let limited_phones = state.prune_otp_limiter();
            debug!(limited_phones, "OTP rate limiter pruned");
            match state.registry.purge_expired_otps(now) {
                Ok(codes) if codes > 0 || sessions > 0 => {
                    info!(sessions, codes, "Expired sessions and codes purged");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "OTP purge failed"),
            }
        }
    });
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig, store: Box<dyn Store>) -> std::io::Result<()> {
    let test_numbers = config.test_numbers();
    if !test_numbers.is_empty() {
        info!(count = test_numbers.len(), "Test phone numbers enabled");
    }
    let registry = Arc::new(Registry::new(store, OtpCache::new(test_numbers)));
    let messenger = Messenger::from_config(&config.whatsapp);
    tokio::fs::create_dir_all(&config.uploads_dir).await?;
    let uploads = UploadStore::new(&config.uploads_dir);

    let state = AppState::new(
        registry,
        messenger,
        uploads,
        config.otp_per_minute,
        &config.base_url,
    );
    spawn_sweeper(state.clone());
    let app = create_router(state, &config.cors_origins);

    let listener = TcpListener::bind(&config.bind).await?;
    info!(
        bind = %config.bind,
        uploads = %config.uploads_dir.display(),
        "Server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
