use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window a score leaderboard is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    #[default]
    All,
}

impl Timeframe {
    /// Parse a query value; anything unrecognized means `All`.
    pub fn parse_or_all(raw: Option<&str>) -> Self {
        match raw {
            Some("daily") => Self::Daily,
            Some("weekly") => Self::Weekly,
            _ => Self::All,
        }
    }

    /// Oldest creation time that still counts, or `None` for no cutoff.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Daily => Some(now - Duration::hours(24)),
            Self::Weekly => Some(now - Duration::days(7)),
            Self::All => None,
        }
    }
}

/// One ranked row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub fid: u64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfp_url: Option<String>,
    pub score: u64,
    pub level: u32,
    pub games_played: u32,
    pub rank: u32,
}

/// Lifetime aggregates for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub fid: u64,
    pub total_games_played: u32,
    pub total_score: u64,
    pub highest_score: u64,
    pub total_time_alive: f64,
    pub best_survival_time: f64,
    pub max_level: u32,
    pub total_coins_earned: u64,
    pub last_played_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerStats {
    pub fn empty(fid: u64, now: DateTime<Utc>) -> Self {
        Self {
            fid,
            total_games_played: 0,
            total_score: 0,
            highest_score: 0,
            total_time_alive: 0.0,
            best_survival_time: 0.0,
            max_level: 0,
            total_coins_earned: 0,
            last_played_at: None,
            updated_at: now,
        }
    }
}
