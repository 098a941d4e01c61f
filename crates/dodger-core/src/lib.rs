pub mod leaderboard;
pub mod powerup;
pub mod score;
pub mod time;
pub mod validation;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use serde_json::{Value, json};

    use crate::time::unix_millis_now;

    /// Build a raw score submission body with an explicit run timestamp.
    pub fn submission_json(
        fid: u64,
        score: u64,
        time_alive: f64,
        level: u32,
        timestamp_ms: i64,
    ) -> Value {
        json!({
            "fid": fid,
            "score": score,
            "gameData": {
                "timeAlive": time_alive,
                "level": level,
                "timestamp": timestamp_ms,
            },
        })
    }

    /// Build a raw score submission body stamped with the current time.
    pub fn fresh_submission(fid: u64, score: u64, time_alive: f64, level: u32) -> Value {
        submission_json(fid, score, time_alive, level, unix_millis_now())
    }
}
