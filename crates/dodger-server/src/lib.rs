pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod rate_limit;
pub mod score_store;
pub mod state;

use std::any::Any;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use error::AppError;
use rate_limit::RetryAfter;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let timeout = Duration::from_secs(config.limits.request_timeout_secs);
    let state = AppState::new(config);

    let api_routes = Router::new()
        .route("/game/score", post(api::submit_score))
        .route("/leaderboard/scores", get(api::leaderboard_scores))
        .route("/leaderboard/games", get(api::leaderboard_games))
        .route("/player/{fid}/rank", get(api::player_rank))
        .route("/player/{fid}/scores", get(api::player_scores))
        .route("/user", post(api::create_user))
        .route("/user/{fid}", get(api::get_user))
        .route("/health", get(health::health_check))
        .fallback(api::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ip_rate_limit_layer,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(request_timeout(timeout))
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state.clone());

    (app, state)
}

/// A handler panic becomes a JSON 500 instead of a dropped connection.
fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    AppError::Internal("Internal server error".to_string()).into_response()
}

/// Requests still running after `timeout` are answered with 408.
fn request_timeout(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Background task that periodically drops idle rate-limit buckets and
/// expired submission cooldowns.
pub fn spawn_cleanup_task(state: AppState) {
    let interval = Duration::from_secs(state.config.limits.cleanup_interval_secs);
    let stale = Duration::from_secs(state.config.limits.stale_entry_secs);
    let cooldown = Duration::from_secs(state.config.limits.score_cooldown_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.api_limiter.cleanup(stale).await;
            state.cooldown.cleanup(cooldown).await;
            let buckets = state.api_limiter.tracked().await;
            let cooldowns = state.cooldown.tracked().await;
            tracing::trace!(buckets, cooldowns, "rate-limit tables pruned");
        }
    });
}

/// Per-IP allowance in front of the API. Refusals carry `Retry-After`.
/// Requests without a peer address (no connect info) pass through.
async fn ip_rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    if let Some(ip) = ip
        && let Err(RetryAfter(secs)) = state.api_limiter.admit(ip).await
    {
        tracing::warn!(%ip, retry_after = secs, "API rate limit exceeded");
        let mut response =
            AppError::RateLimited("Too many requests, please slow down.".to_string())
                .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        return response;
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::LimitsConfig;

    #[tokio::test]
    async fn cleanup_task_prunes_rate_limit_tables() {
        let state = AppState::new(ServerConfig {
            limits: LimitsConfig {
                cleanup_interval_secs: 1,
                stale_entry_secs: 0,
                score_cooldown_secs: 0,
                ..LimitsConfig::default()
            },
            ..ServerConfig::default()
        });
        let ip = "10.1.2.3".parse().unwrap();
        assert!(state.api_limiter.admit(ip).await.is_ok());
        assert!(state.cooldown.try_acquire(7).await);
        assert_eq!(state.api_limiter.tracked().await, 1);
        assert_eq!(state.cooldown.tracked().await, 1);

        spawn_cleanup_task(state.clone());
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(state.api_limiter.tracked().await, 0);
        assert_eq!(state.cooldown.tracked().await, 0);
    }

    #[tokio::test]
    async fn slow_request_times_out_with_408() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    "done"
                }),
            )
            .layer(request_timeout(Duration::from_millis(20)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let resp = reqwest::get(format!("http://{addr}/slow")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 408);
    }

    #[tokio::test]
    async fn handler_panic_becomes_json_500() {
        async fn boom() -> &'static str {
            panic!("store invariant broken")
        }
        let app = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(panic_response));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let resp = reqwest::get(format!("http://{addr}/boom")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 500);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Internal server error");
    }
}
