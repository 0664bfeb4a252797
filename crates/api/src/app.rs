use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use persistence::repositories::{CampaignRepository, SettingRepository, SubscriberRepository};

use crate::config::Config;
use crate::middleware::require_auth;
use crate::routes::{
    campaigns, health, settings, stats, subscribe, subscribers, unsubscribe, verify,
};
use crate::services::email::Mailer;
use crate::worker::CampaignWorker;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub subscribers: SubscriberRepository,
    pub campaigns: CampaignRepository,
    pub settings: SettingRepository,
    pub mailer: Arc<dyn Mailer>,
    pub worker: CampaignWorker,
}

pub fn create_app(config: Config, pool: SqlitePool, mailer: Arc<dyn Mailer>) -> Router {
    let config = Arc::new(config);

    let subscribers = SubscriberRepository::new(pool.clone());
    let campaigns = CampaignRepository::new(pool.clone());
    let setting_repo = SettingRepository::new(pool);

    let worker = CampaignWorker::new(
        campaigns.clone(),
        subscribers.clone(),
        mailer.clone(),
        config.sending.clone(),
        &config.server.public_url,
    );

    let state = AppState {
        config: config.clone(),
        subscribers,
        campaigns,
        settings: setting_repo,
        mailer,
        worker,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/subscribe", post(subscribe::subscribe))
        .route("/api/verify/{token}", get(verify::verify))
        .route("/api/unsubscribe/{token}", get(unsubscribe::unsubscribe));

    // Private routes (Basic Auth)
    let private_routes = Router::new()
        .route(
            "/api/private/subscribers",
            get(subscribers::list_subscribers).post(subscribers::create_subscriber),
        )
        .route(
            "/api/private/subscribers/{id}",
            get(subscribers::get_subscriber).delete(subscribers::delete_subscriber),
        )
        .route(
            "/api/private/subscribers/{id}/send-verification",
            post(subscribers::send_verification),
        )
        .route(
            "/api/private/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/api/private/campaigns/{id}",
            get(campaigns::get_campaign)
                .put(campaigns::update_campaign)
                .delete(campaigns::delete_campaign),
        )
        .route("/api/private/campaigns/{id}/send", post(campaigns::send_campaign))
        .route(
            "/api/private/campaigns/{id}/cancel",
            post(campaigns::cancel_campaign),
        )
        .route("/api/private/campaigns/{id}/journal", get(campaigns::get_journal))
        .route(
            "/api/private/settings/smtp",
            get(settings::get_smtp_settings).put(settings::update_smtp_settings),
        )
        .route(
            "/api/private/settings/smtp/test",
            post(settings::test_smtp_settings),
        )
        .route("/api/private/stats", get(stats::get_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(private_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
