use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;

use dodger_core::test_helpers::fresh_submission;
use dodger_server::build_app;
use dodger_server::config::{LimitsConfig, ServerConfig};

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Default limits, with an API bucket large enough not to interfere.
    pub async fn new() -> Self {
        Self::from_config(Self::roomy_config()).await
    }

    /// Start a test server whose per-player score cooldown is `secs`.
    pub async fn with_score_cooldown(secs: u64) -> Self {
        let mut config = Self::roomy_config();
        config.limits.score_cooldown_secs = secs;
        Self::from_config(config).await
    }

    /// Start a test server whose per-IP bucket holds `burst` requests and
    /// never refills.
    pub async fn with_api_burst(burst: usize) -> Self {
        let config = ServerConfig {
            limits: LimitsConfig {
                api_rate_limit_burst: burst,
                api_rate_limit_per_sec: f64::MIN_POSITIVE,
                ..LimitsConfig::default()
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    fn roomy_config() -> ServerConfig {
        ServerConfig {
            limits: LimitsConfig {
                api_rate_limit_burst: 1000,
                api_rate_limit_per_sec: 1000.0,
                ..LimitsConfig::default()
            },
            ..ServerConfig::default()
        }
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            client: reqwest::Client::new(),
            _shutdown: handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// GET `path`, returning the status and JSON body.
    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// POST `body` to `path`, returning the status and JSON body.
    pub async fn post_json(&self, path: &str, body: &Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// Submit a freshly stamped score and return the status and body.
    pub async fn submit(&self, fid: u64, score: u64, time_alive: f64, level: u32) -> (u16, Value) {
        self.post_json(
            "/api/game/score",
            &fresh_submission(fid, score, time_alive, level),
        )
        .await
    }
}
