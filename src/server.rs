//!
//! taskhub HTTP server
//! -------------------
//! Axum-based HTTP/JSON API for the task tracking service.
//!
//! Responsibilities:
//! - Bearer-token authentication backed by the `identity` token vault.
//! - Auth, user administration, task and seed route groups.
//! - Per-address fixed-window throttling on the whole API surface plus a
//!   tighter budget on login attempts.
//! - Background maintenance ticker sweeping expired revocations and lapsed
//!   throttle windows.

pub mod auth;
pub mod rate_limit;
pub mod seed;
pub mod tasks;
pub mod users;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::email::{NoopSink, Notification, NotificationSink, SmtpSink};
use crate::error::{self, AppError};
use crate::identity::{self, TokenVault};
use crate::model::User;
use crate::store::tasks::MemTaskStore;
use crate::store::users::MemUserStore;
use crate::store::{TaskStore, UserStore};

use rate_limit::RateLimiter;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub vault: Arc<TokenVault>,
    pub mailer: Arc<dyn NotificationSink>,
    pub login_limiter: Arc<RateLimiter>,
    pub api_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        vault: TokenVault,
        mailer: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            users,
            tasks,
            vault: Arc::new(vault),
            mailer,
            login_limiter: Arc::new(RateLimiter::login()),
            api_limiter: Arc::new(RateLimiter::api()),
        }
    }

    /// State over the bundled in-memory stores with email disabled.
    pub fn in_memory(secret: &str, ttl: Duration) -> Self {
        Self::new(
            Arc::new(MemUserStore::new()),
            Arc::new(MemTaskStore::new()),
            TokenVault::new(secret, ttl),
            Arc::new(NoopSink),
        )
    }

    /// Resolve the request's bearer token to a live principal.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<(User, String), AppError> {
        identity::authenticate(&self.vault, self.users.as_ref(), headers)
    }

    /// Fire-and-forget notification send. The request never waits on SMTP;
    /// a failed send is logged and dropped.
    pub fn notify(&self, notification: Notification) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            let to = notification.recipient().to_string();
            if let Err(e) = mailer.send(notification).await {
                warn!(to = %to, "failed to send notification email: {e}");
            }
        });
    }
}

async fn health() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (axum::http::StatusCode::OK, Json(json!({"status": "success", "message": "Server is running"})))
}

/// Whole-API throttle. Applied to every route group; the health endpoint
/// stays outside the budget.
async fn api_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if state.api_limiter.check(&addr.ip().to_string()) {
        next.run(req).await
    } else {
        AppError::rate_limited("Too many requests from this IP, please try again after 15 minutes")
            .into_response()
    }
}

/// Mount all routes over the given state.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/tasks", tasks::router())
        .nest("/seed", seed::router())
        .layer(middleware::from_fn_with_state(state.clone(), api_limit));
    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
}

/// Start the HTTP server: build state from config, spawn the maintenance
/// sweeper and serve until the process is stopped.
pub async fn run(config: Config) -> anyhow::Result<()> {
    error::set_dev_mode(config.dev_mode);

    let mailer: Arc<dyn NotificationSink> = match &config.email {
        Some(email) => match SmtpSink::new(email) {
            Ok(sink) => {
                info!(host = %email.host, "outbound email enabled");
                Arc::new(sink)
            }
            Err(e) => {
                warn!("email configuration rejected, notifications disabled: {e}");
                Arc::new(NoopSink)
            }
        },
        None => {
            info!("no EMAIL_HOST/EMAIL_FROM configured, notifications disabled");
            Arc::new(NoopSink)
        }
    };

    let state = AppState::new(
        Arc::new(MemUserStore::new()),
        Arc::new(MemTaskStore::new()),
        TokenVault::new(config.jwt_secret.as_bytes(), config.token_ttl),
        mailer,
    );

    // Background maintenance sweeper
    {
        let state = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                let revoked = state.vault.sweep();
                let windows = state.login_limiter.sweep() + state.api_limiter.sweep();
                if revoked > 0 || windows > 0 {
                    debug!(revoked = revoked, windows = windows, "maintenance_sweep");
                }
            }
        });
    }

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
