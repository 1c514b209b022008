pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rbac;
pub mod routes;
pub mod services;
pub mod session;
pub mod smtp;
pub mod telemetry;
pub mod templates;
pub mod validation;

use axum::{extract::FromRef, routing::get, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::services::event_stream::Notifier;
use crate::session::SessionKey;
use crate::smtp::Mailer;
use crate::templates::Templates;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub notifier: Arc<Notifier>,
    pub mailer: Arc<dyn Mailer>,
    pub templates: Arc<Templates>,
    pub session_key: SessionKey,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        config: Config,
        mailer: Arc<dyn Mailer>,
        session_key: SessionKey,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            pool,
            config: Arc::new(config),
            notifier: Arc::new(Notifier::new()),
            mailer,
            templates: Arc::new(Templates::new()?),
            session_key,
        })
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for SessionKey {
    fn from_ref(state: &AppState) -> Self {
        state.session_key.clone()
    }
}

impl FromRef<AppState> for Arc<Notifier> {
    fn from_ref(state: &AppState) -> Self {
        state.notifier.clone()
    }
}

/// Full application router: pages, realtime endpoints, health check and static assets.
pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(routes::routes())
        .nest_service("/static", static_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
