//! Childminder Agency Compliance Backend
//!
//! A REST backend with SQLite persistence for the agency's registration and
//! background-check workflows: the public application form, token-addressed
//! satellite forms, and the admin back office.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod lookup;
mod models;
mod notify;
mod status;
mod validation;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use lookup::{AuthorityLookup, PostcodesIoClient};
use notify::{LogNotifier, Notifier};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    pub lookup: Arc<dyn AuthorityLookup>,
    pub notifier: Arc<dyn Notifier>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Agency Compliance Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (AGENCY_API_PSK). Admin API is unauthenticated!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let lookup = Arc::new(PostcodesIoClient::new(config.postcode_api_url.clone()));

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
        lookup,
        notifier: Arc::new(LogNotifier),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // Admin API routes, behind the PSK
    let admin_routes = Router::new()
        // Applications
        .route("/applications", get(api::list_applications))
        .route("/applications/{id}", get(api::get_application))
        .route("/applications/{id}", put(api::update_application))
        .route("/applications/{id}/reject", post(api::reject_application))
        .route("/applications/{id}/approve", post(api::approve_application))
        // Jurisdiction checks and verification requests
        .route(
            "/applications/{id}/authority-groups",
            get(api::authority_groups),
        )
        .route(
            "/applications/{id}/authority-checks",
            post(api::send_authority_check),
        )
        .route("/applications/{id}/ofsted-check", post(api::send_ofsted_check))
        .route(
            "/applications/{id}/reference-requests",
            post(api::send_reference_requests),
        )
        // Employees
        .route("/employees", get(api::list_employees))
        .route("/employees/{id}", get(api::get_employee))
        // Compliance people
        .route("/people", get(api::list_people))
        .route("/people", post(api::create_person))
        .route("/people/{id}", get(api::get_person))
        .route("/people/{id}", delete(api::delete_person))
        .route("/people/{id}/dbs", put(api::update_person_dbs))
        .route("/people/{id}/status", get(api::person_status))
        .route("/people/{id}/dbs-request", post(api::send_dbs_request))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Public routes: the application form and token-addressed satellite forms
    let public_routes = Router::new()
        .route("/apply", post(api::submit_application))
        .route(
            "/apply/sections/{index}/validate",
            post(api::validate_application_section),
        )
        .route("/forms/{token}", get(api::get_form))
        .route("/forms/{token}/draft", get(api::get_draft))
        .route("/forms/{token}/draft", put(api::save_draft))
        .route("/forms/{token}/submit", post(api::submit_form));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", admin_routes.merge(public_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
