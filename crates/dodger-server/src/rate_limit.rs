use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Longest wait advertised in `Retry-After`.
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Request allowance left for one client address.
struct Allowance {
    tokens: f64,
    last_seen: Instant,
}

/// A client ran out of API allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAfter(pub u64);

/// Per-IP request budget for the `/api` surface: `burst` requests up front,
/// refilled at `per_sec`.
pub struct ApiRateLimiter {
    allowances: Mutex<HashMap<IpAddr, Allowance>>,
    burst: f64,
    per_sec: f64,
}

impl ApiRateLimiter {
    pub fn new(burst: usize, per_sec: f64) -> Self {
        Self {
            allowances: Mutex::new(HashMap::new()),
            burst: burst as f64,
            per_sec,
        }
    }

    /// Spend one request from `ip`'s allowance. When it is empty, returns
    /// the whole seconds until the next request would be admitted.
    pub async fn admit(&self, ip: IpAddr) -> Result<(), RetryAfter> {
        let mut allowances = self.allowances.lock().await;
        let now = Instant::now();
        let allowance = allowances.entry(ip).or_insert(Allowance {
            tokens: self.burst,
            last_seen: now,
        });

        let idle = now.duration_since(allowance.last_seen).as_secs_f64();
        allowance.tokens = (allowance.tokens + idle * self.per_sec).min(self.burst);
        allowance.last_seen = now;

        if allowance.tokens >= 1.0 {
            allowance.tokens -= 1.0;
            return Ok(());
        }
        let wait = (1.0 - allowance.tokens) / self.per_sec;
        let secs = if wait.is_finite() {
            (wait.ceil() as u64).clamp(1, MAX_RETRY_AFTER_SECS)
        } else {
            MAX_RETRY_AFTER_SECS
        };
        Err(RetryAfter(secs))
    }

    /// Forget addresses idle for at least `max_idle`.
    pub async fn cleanup(&self, max_idle: Duration) {
        let mut allowances = self.allowances.lock().await;
        let now = Instant::now();
        allowances.retain(|_, a| now.duration_since(a.last_seen) < max_idle);
    }

    pub async fn tracked(&self) -> usize {
        self.allowances.lock().await.len()
    }
}

/// Minimum gap between accepted score submissions from one player.
pub struct SubmissionCooldown {
    last_accepted: Mutex<HashMap<u64, Instant>>,
    cooldown: Duration,
}

impl SubmissionCooldown {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_accepted: Mutex::new(HashMap::new()),
            cooldown,
        }
    }

    /// Claim a submission slot for `fid`. Check and record happen under one
    /// lock, so two racing submissions cannot both pass.
    pub async fn try_acquire(&self, fid: u64) -> bool {
        let mut last = self.last_accepted.lock().await;
        let now = Instant::now();
        if let Some(prev) = last.get(&fid)
            && now.duration_since(*prev) < self.cooldown
        {
            return false;
        }
        last.insert(fid, now);
        true
    }

    /// Drop entries older than `max_age`.
    pub async fn cleanup(&self, max_age: Duration) {
        let mut last = self.last_accepted.lock().await;
        let now = Instant::now();
        last.retain(|_, at| now.duration_since(*at) < max_age);
    }

    pub async fn tracked(&self) -> usize {
        self.last_accepted.lock().await.len()
    }
}
