use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use persistence::db;
use persistence::repositories::SettingRepository;
use tinylist_api::app;
use tinylist_api::config::Config;
use tinylist_api::middleware::logging;
use tinylist_api::services::email::{Mailer, SmtpConfig, SmtpMailer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration (aborts on empty admin password)
    let config = Config::load()?;

    // Initialize logging
    logging::init_logging(&config.logging);

    info!("Starting TinyList v{}", env!("CARGO_PKG_VERSION"));

    // Open the store
    let pool = db::create_pool(&db::DatabaseConfig {
        path: config.database.path.clone(),
        max_connections: config.database.max_connections,
    })
    .await?;

    // Run migrations
    info!("Running database migrations...");
    db::run_migrations(&pool).await?;
    info!("Migrations completed");

    // SMTP settings live in the store so the admin can reconfigure the
    // transport at runtime.
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new());
    load_smtp_settings(&SettingRepository::new(pool.clone()), mailer.as_ref()).await;

    // Build application
    let app = app::create_app(config.clone(), pool, mailer);

    // Start server
    let addr = config.socket_addr();
    info!("Server listening on {}", addr);
    info!(
        "Basic Auth enabled for /api/private (user: {})",
        config.auth.username
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Loads persisted SMTP settings and configures the mailer.
async fn load_smtp_settings(settings: &SettingRepository, mailer: &dyn Mailer) {
    let stored = match settings.get_all().await {
        Ok(stored) => stored,
        Err(err) => {
            warn!(error = %err, "failed to load settings from database");
            return;
        }
    };

    let host = stored.get("smtp_host").cloned().unwrap_or_default();
    if host.is_empty() {
        info!("SMTP not configured - configure via the admin settings endpoint");
        return;
    }

    let port = stored
        .get("smtp_port")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(587);
    let tls = stored.get("smtp_tls").map(|raw| raw == "true").unwrap_or(false);

    mailer.configure(SmtpConfig {
        host,
        port,
        username: stored.get("smtp_username").cloned().unwrap_or_default(),
        password: stored.get("smtp_password").cloned().unwrap_or_default(),
        from_email: stored.get("smtp_from_email").cloned().unwrap_or_default(),
        from_name: stored.get("smtp_from_name").cloned().unwrap_or_default(),
        tls,
    });

    info!("SMTP settings loaded from database");
}

/// Resolves on SIGINT or SIGTERM. In-flight requests are drained (bounded
/// by the request timeout layer); in-flight campaigns are abandoned.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutting down server...");
}
