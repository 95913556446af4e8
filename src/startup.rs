//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{
    EventProcessor, EventProcessorImpl, HmacSignatureVerifier, SessionService, SessionServiceImpl,
    SignatureVerifier,
};
use crate::config::Settings;
use crate::domain::{UserRepository, UserSessionRepository, WebhookEventRepository};
use crate::infrastructure::database;
use crate::infrastructure::database::PgUnitOfWork;
use crate::infrastructure::repositories::{
    PgUserRepository, PgUserSessionRepository, PgWebhookEventRepository,
};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};

/// How many stuck events the maintenance sweep reports per pass.
const STUCK_EVENT_REPORT_LIMIT: i64 = 10;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub settings: Arc<Settings>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub processor: Arc<dyn EventProcessor>,
    pub events: Arc<dyn WebhookEventRepository>,
    pub users: Arc<dyn UserRepository>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        if !settings.webhook.has_signing_secret() {
            tracing::warn!(
                "Webhook signing secret is not configured; every delivery will be rejected"
            );
        }

        // Wire repositories and services
        let events = Arc::new(PgWebhookEventRepository::new(db.clone()));
        let uow = Arc::new(PgUnitOfWork::new(db.clone()));
        let sessions = Arc::new(PgUserSessionRepository::new(db.clone()));
        let users = Arc::new(PgUserRepository::new(db.clone()));

        let verifier = Arc::new(HmacSignatureVerifier::new(&settings.webhook));
        let processor = Arc::new(EventProcessorImpl::new(events.clone(), uow));

        // Periodic retention sweep and stuck-event report
        let session_service =
            SessionServiceImpl::new(sessions, settings.session.retention_days);
        spawn_maintenance_task(
            session_service,
            events.clone(),
            settings.session.cleanup_interval_secs,
        );

        handlers::health::init_server_start();

        // Create app state
        let state = AppState {
            db,
            settings: Arc::new(settings.clone()),
            verifier,
            processor,
            events,
            users,
        };

        // Build router with middleware
        let router = routes::create_router(state.clone())
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        // Bind to address
        let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Spawn the background maintenance loop.
///
/// Each tick removes sessions past the retention window and logs a
/// warning when failed events are sitting in the ledger awaiting retry.
fn spawn_maintenance_task<S, R>(service: SessionServiceImpl<S>, events: Arc<R>, interval_secs: u64)
where
    S: UserSessionRepository + 'static,
    R: WebhookEventRepository + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match service.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Expired sessions removed"),
                Err(e) => tracing::warn!(error = %e, "Session retention sweep failed"),
            }

            match events.find_failed(STUCK_EVENT_REPORT_LIMIT).await {
                Ok(failed) if !failed.is_empty() => {
                    tracing::warn!(
                        count = failed.len(),
                        oldest = %failed[0].id,
                        "Failed webhook events are awaiting retry"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Failed event scan errored"),
            }
        }
    });
}
