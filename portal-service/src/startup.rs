use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::PortalConfig;
use crate::handlers::{
    admin::{admin_me, analytics, course_details, export_students, list_enrollments, list_students},
    app::{health_check, index, not_found},
    metrics::metrics,
    onboarding::{onboarding_status, submit_onboarding},
    user::dashboard_handler,
};
use crate::middleware::{access_gate_middleware, admin_middleware};
use crate::services::{HttpIdentityProvider, IdentityProvider, MongoProfileStore, ProfileStore};
use crate::workers::CompactionJob;
use crate::{AppState, GateSettings};

pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin", get(admin_me))
        .route("/admin/students", get(list_students))
        .route("/admin/students/export", get(export_students))
        .route("/admin/enrollments", get(list_enrollments))
        .route("/admin/courses/:course_id", get(course_details))
        .route("/admin/analytics", get(analytics))
        .route_layer(from_fn_with_state(state.clone(), admin_middleware));

    // Everything here, the fallback included, sits behind the access gate.
    let gated = Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard_handler))
        .route(
            "/onboarding",
            get(onboarding_status).post(submit_onboarding),
        )
        .merge(admin)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), access_gate_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .merge(gated)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    shutdown_token: CancellationToken,
    compaction: Option<CompactionJob>,
}

impl Application {
    pub async fn build(config: PortalConfig) -> anyhow::Result<Self> {
        let store = MongoProfileStore::connect(&config.mongodb.uri, &config.mongodb.database).await?;
        store.initialize_indexes().await?;
        let profiles: Arc<dyn ProfileStore> = Arc::new(store);

        let identity: Arc<dyn IdentityProvider> =
            Arc::new(HttpIdentityProvider::new(&config.identity)?);

        let state = AppState::new(identity, profiles, GateSettings::from_config(&config));

        if state.gate.admin_emails.is_empty() {
            tracing::info!("ADMIN_EMAILS is empty, admin access comes from role metadata only");
        }

        let shutdown_token = CancellationToken::new();
        let compaction = config.reconciliation.compaction_interval.map(|interval| {
            CompactionJob::new(
                state.profiles.clone(),
                state.reconciler.clone(),
                interval,
                shutdown_token.child_token(),
            )
        });

        let router = build_router(state);

        let address = config.common.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
            shutdown_token,
            compaction,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let compaction = self.compaction.map(CompactionJob::start);

        tracing::info!(port = self.port, "Starting portal-service");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.shutdown_token.cancel();
        if let Some(handle) = compaction {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Compaction job ended abnormally");
            }
        }

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
