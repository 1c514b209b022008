use anyhow::{Context, Result};

use ward_status::{config::Config, db, session::SessionKey, smtp, telemetry, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("opening database {}", config.database_url))?;
    db::run_migrations(&pool).await?;
    db::seed_hospital(&pool, &config.hospital_address, &config.hospital_phone).await?;

    let mailer = smtp::mailer_from_config(&config)?;

    let session_key = match &config.session_secret {
        Some(secret) => SessionKey::new(secret.as_bytes().to_vec(), config.session_max_age_secs),
        None => {
            tracing::warn!("SESSION_SECRET not set, sessions are lost on restart");
            SessionKey::random(config.session_max_age_secs)
        }
    };

    let addr = config.bind_addr();
    let state = AppState::new(pool, config, mailer, session_key)?;
    let app = ward_status::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("shut down");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix, so in-flight requests can drain.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("ctrl-c handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("interrupt received, shutting down"),
        _ = terminate => tracing::info!("terminate received, shutting down"),
    }
}
