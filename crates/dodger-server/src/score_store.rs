//! In-memory users, scores, and per-player aggregates.
//!
//! Single-process only. Every method takes the caller's clock so results
//! are reproducible in tests.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use dodger_core::leaderboard::{LeaderboardEntry, PlayerStats, Timeframe};

/// A registered player.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip)]
    pub auth_token: String,
    pub farcaster_fid: Option<u64>,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sanitized profile fields for [`ScoreStore::upsert_user`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub fid: u64,
    pub username: String,
    pub auth_token: String,
    pub display_name: String,
    pub pfp_url: Option<String>,
}

/// Returned by [`ScoreStore::upsert_user`] when another FID owns the username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameTaken(pub String);

/// One stored game result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameScore {
    pub id: u64,
    pub farcaster_fid: u64,
    pub score: u64,
    pub time_alive: f64,
    pub level: u32,
    pub coins_earned: u64,
    /// Client-supplied game data plus request metadata.
    pub game_data: Value,
    pub created_at: DateTime<Utc>,
}

/// A validated result ready to store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub fid: u64,
    pub score: u64,
    pub time_alive: f64,
    pub level: u32,
    pub coins_earned: u64,
    pub game_data: Value,
}

#[derive(Debug, Default)]
pub struct ScoreStore {
    users: Vec<User>,
    fid_to_user: HashMap<u64, usize>,
    scores: Vec<GameScore>,
    /// Kept in first-played order; the games leaderboard breaks ties by it.
    stats: Vec<PlayerStats>,
    stats_index: HashMap<u64, usize>,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_by_fid(&self, fid: u64) -> Option<&User> {
        self.fid_to_user.get(&fid).and_then(|&i| self.users.get(i))
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Return the user linked to `new.fid`, creating one if needed. A
    /// username already held by another FID is refused and the holder's
    /// record is left untouched.
    pub fn upsert_user(
        &mut self,
        new: NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, UsernameTaken> {
        if let Some(user) = self.user_by_fid(new.fid) {
            return Ok(user.clone());
        }
        if let Some(holder) = self.user_by_username(&new.username) {
            tracing::debug!(
                fid = new.fid,
                holder = ?holder.farcaster_fid,
                "username already linked"
            );
            return Err(UsernameTaken(new.username));
        }

        let user = User {
            id: self.users.len() as u64 + 1,
            username: new.username,
            auth_token: new.auth_token,
            farcaster_fid: Some(new.fid),
            display_name: Some(new.display_name),
            pfp_url: new.pfp_url,
            created_at: now,
        };
        self.fid_to_user.insert(new.fid, self.users.len());
        self.users.push(user.clone());
        tracing::debug!(fid = new.fid, user_id = user.id, "user linked");
        Ok(user)
    }

    /// Store a result and fold it into the player's aggregates.
    pub fn save_score(&mut self, new: NewScore, now: DateTime<Utc>) -> GameScore {
        let score = GameScore {
            id: self.scores.len() as u64 + 1,
            farcaster_fid: new.fid,
            score: new.score,
            time_alive: new.time_alive,
            level: new.level,
            coins_earned: new.coins_earned,
            game_data: new.game_data,
            created_at: now,
        };
        self.scores.push(score.clone());
        self.record_game(&score, now);
        score
    }

    fn record_game(&mut self, score: &GameScore, now: DateTime<Utc>) {
        let index = match self.stats_index.get(&score.farcaster_fid) {
            Some(&i) => i,
            None => {
                self.stats
                    .push(PlayerStats::empty(score.farcaster_fid, now));
                let i = self.stats.len() - 1;
                self.stats_index.insert(score.farcaster_fid, i);
                i
            },
        };
        let stats = &mut self.stats[index];
        stats.total_games_played += 1;
        stats.total_score += score.score;
        stats.highest_score = stats.highest_score.max(score.score);
        stats.total_time_alive += score.time_alive;
        stats.best_survival_time = stats.best_survival_time.max(score.time_alive);
        stats.max_level = stats.max_level.max(score.level);
        stats.total_coins_earned += score.coins_earned;
        stats.last_played_at = Some(now);
        stats.updated_at = now;
    }

    /// Newest first.
    pub fn player_scores(&self, fid: u64, limit: usize) -> Vec<GameScore> {
        let mut scores: Vec<GameScore> = self
            .scores
            .iter()
            .filter(|s| s.farcaster_fid == fid)
            .cloned()
            .collect();
        scores.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        scores.truncate(limit);
        scores
    }

    pub fn player_stats(&self, fid: u64) -> Option<&PlayerStats> {
        self.stats_index.get(&fid).and_then(|&i| self.stats.get(i))
    }

    fn entry_for(&self, fid: u64, score: u64, level: u32, games_played: u32) -> LeaderboardEntry {
        let user = self.user_by_fid(fid);
        LeaderboardEntry {
            fid,
            username: user
                .map(|u| u.username.clone())
                .unwrap_or_else(|| format!("Player {fid}")),
            display_name: user.and_then(|u| u.display_name.clone()),
            pfp_url: user.and_then(|u| u.pfp_url.clone()),
            score,
            level,
            games_played,
            rank: 0,
        }
    }

    /// Each player's best score within `timeframe`, highest first. Ties keep
    /// the order players first appear in the window.
    pub fn top_by_score(
        &self,
        limit: usize,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Vec<LeaderboardEntry> {
        let cutoff = timeframe.cutoff(now);
        let mut order: Vec<u64> = Vec::new();
        let mut best: HashMap<u64, &GameScore> = HashMap::new();
        for score in &self.scores {
            if let Some(cutoff) = cutoff
                && score.created_at < cutoff
            {
                continue;
            }
            match best.get(&score.farcaster_fid) {
                Some(existing) if existing.score >= score.score => {},
                Some(_) => {
                    best.insert(score.farcaster_fid, score);
                },
                None => {
                    order.push(score.farcaster_fid);
                    best.insert(score.farcaster_fid, score);
                },
            }
        }

        let mut entries: Vec<LeaderboardEntry> = order
            .iter()
            .filter_map(|fid| best.get(fid))
            .map(|s| {
                let games = self
                    .player_stats(s.farcaster_fid)
                    .map_or(1, |st| st.total_games_played);
                self.entry_for(s.farcaster_fid, s.score, s.level, games)
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i as u32 + 1;
        }
        entries.truncate(limit);
        entries
    }

    /// Players by games played, most first.
    pub fn top_by_games(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut stats: Vec<&PlayerStats> = self.stats.iter().collect();
        stats.sort_by(|a, b| b.total_games_played.cmp(&a.total_games_played));
        stats
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, st)| {
                let mut entry =
                    self.entry_for(st.fid, st.highest_score, st.max_level, st.total_games_played);
                entry.rank = i as u32 + 1;
                entry
            })
            .collect()
    }

    /// All-time rank among the best `window` players, if ranked.
    pub fn player_rank(&self, fid: u64, window: usize, now: DateTime<Utc>) -> Option<u32> {
        self.top_by_score(window, Timeframe::All, now)
            .into_iter()
            .find(|e| e.fid == fid)
            .map(|e| e.rank)
    }

    pub fn score_count(&self) -> usize {
        self.scores.len()
    }

    pub fn player_count(&self) -> usize {
        self.stats.len()
    }
}
