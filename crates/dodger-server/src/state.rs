use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::rate_limit::{ApiRateLimiter, SubmissionCooldown};
use crate::score_store::ScoreStore;

pub type SharedScoreStore = Arc<RwLock<ScoreStore>>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedScoreStore,
    pub cooldown: Arc<SubmissionCooldown>,
    pub api_limiter: Arc<ApiRateLimiter>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let limits = &config.limits;
        Self {
            store: Arc::new(RwLock::new(ScoreStore::new())),
            cooldown: Arc::new(SubmissionCooldown::new(Duration::from_secs(
                limits.score_cooldown_secs,
            ))),
            api_limiter: Arc::new(ApiRateLimiter::new(
                limits.api_rate_limit_burst,
                limits.api_rate_limit_per_sec,
            )),
            config: Arc::new(config),
        }
    }
}
