use serde::{Deserialize, Serialize};

/// Name shown in share text and health responses.
pub const GAME_NAME: &str = "Space Dodger";

/// Per-run details attached to a score submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    /// Seconds survived.
    pub time_alive: f64,
    pub level: u32,
    pub coins_earned: u64,
    /// Epoch milliseconds when the run ended.
    pub timestamp: i64,
}

/// Body of `POST /api/game/score` as produced by a well-behaved client.
///
/// The server never trusts this shape; it validates the raw JSON instead
/// (see [`crate::validation`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub fid: u64,
    pub score: u64,
    pub game_data: GameData,
}

/// Response body for an accepted score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreAccepted {
    pub success: bool,
    pub score: u64,
    pub share_text: String,
    pub share_url: String,
}

/// Format an integer with `,` thousands separators.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Text a player can post after a score is accepted.
pub fn share_text(score: u64) -> String {
    format!(
        "🚀 Just scored {} points in {GAME_NAME}! Think you can beat it?",
        format_thousands(score)
    )
}
