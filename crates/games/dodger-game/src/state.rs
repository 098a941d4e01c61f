use std::collections::VecDeque;
use std::fmt;

use dodger_core::powerup::ActivePowerUps;
use dodger_core::score::{GameData, ScoreSubmission};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ScoringConfig;
use crate::entities::PowerUpKind;
use crate::storage::{KeyValueStore, get_number, keys, set_number};

/// Top-level session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Ready,
    Playing,
    Ended,
}

/// Why a state transition was refused. Refusals leave state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Points were negative, NaN, or infinite.
    InvalidPoints,
    /// Coin amount was negative, NaN, infinite, or zero.
    InvalidAmount,
    /// Frame delta was negative, NaN, or above the accepted maximum.
    InvalidDeltaTime,
    /// The transition needs an active session.
    NotPlaying,
    /// `start` outside the ready phase.
    NotReady,
    /// Too many score events in the trailing window.
    RateLimited,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPoints => f.write_str("invalid score points"),
            Self::InvalidAmount => f.write_str("invalid coin amount"),
            Self::InvalidDeltaTime => f.write_str("invalid delta time"),
            Self::NotPlaying => f.write_str("session is not playing"),
            Self::NotReady => f.write_str("session is not ready"),
            Self::RateLimited => f.write_str("score rate limit exceeded"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Final numbers of a finished session, published for profile and
/// achievement tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
    pub score: f64,
    pub time_alive: f64,
    pub difficulty_level: u32,
    pub coins_earned: u64,
}

impl SessionEnded {
    /// Body for `POST /api/game/score`.
    pub fn to_submission(&self, fid: u64, timestamp_ms: i64) -> ScoreSubmission {
        ScoreSubmission {
            fid,
            score: self.score.max(0.0).floor() as u64,
            game_data: GameData {
                time_alive: self.time_alive,
                level: self.difficulty_level,
                coins_earned: self.coins_earned,
                timestamp: timestamp_ms,
            },
        }
    }
}

/// Authoritative record of one play session.
///
/// Every transition validates against a snapshot of the current fields
/// before mutating, so a refused call never leaves partial updates behind.
/// Times passed in (`now_ms`) come from the host clock in milliseconds.
pub struct GameState {
    rules: ScoringConfig,
    store: Box<dyn KeyValueStore>,
    phase: Phase,
    paused: bool,
    score: f64,
    lives: u32,
    time_alive: f64,
    difficulty_level: u32,
    high_score: f64,
    coins_earned: u64,
    total_coins_earned: u64,
    power_ups: ActivePowerUps<PowerUpKind>,
    has_shield: bool,
    session_start_ms: f64,
    score_events: VecDeque<f64>,
    last_score_ms: Option<f64>,
    finalized: bool,
    ended_events: Vec<SessionEnded>,
}

impl GameState {
    pub fn new(rules: ScoringConfig, store: Box<dyn KeyValueStore>) -> Self {
        let mut state = Self {
            lives: rules.starting_lives,
            rules,
            store,
            phase: Phase::Ready,
            paused: false,
            score: 0.0,
            time_alive: 0.0,
            difficulty_level: 1,
            high_score: 0.0,
            coins_earned: 0,
            total_coins_earned: 0,
            power_ups: ActivePowerUps::new(),
            has_shield: false,
            session_start_ms: 0.0,
            score_events: VecDeque::new(),
            last_score_ms: None,
            finalized: false,
            ended_events: Vec::new(),
        };
        state.load_persisted();
        state
    }

    fn load_persisted(&mut self) {
        self.high_score = get_number(self.store.as_ref(), keys::HIGH_SCORE, 0.0).max(0.0);
        self.total_coins_earned =
            get_number(self.store.as_ref(), keys::TOTAL_COINS_EARNED, 0.0).max(0.0) as u64;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn time_alive(&self) -> f64 {
        self.time_alive
    }

    pub fn difficulty_level(&self) -> u32 {
        self.difficulty_level
    }

    pub fn high_score(&self) -> f64 {
        self.high_score
    }

    pub fn coins_earned(&self) -> u64 {
        self.coins_earned
    }

    pub fn total_coins_earned(&self) -> u64 {
        self.total_coins_earned
    }

    pub fn has_shield(&self) -> bool {
        self.has_shield
    }

    pub fn active_power_ups(&self) -> &ActivePowerUps<PowerUpKind> {
        &self.power_ups
    }

    pub fn is_power_up_active(&self, kind: PowerUpKind) -> bool {
        match kind {
            PowerUpKind::Shield => self.has_shield,
            _ => self.power_ups.is_active(kind),
        }
    }

    pub fn last_score_ms(&self) -> Option<f64> {
        self.last_score_ms
    }

    pub fn rules(&self) -> &ScoringConfig {
        &self.rules
    }

    /// Begin a session. Persisted totals are re-read so another session
    /// sharing the store is reflected.
    pub fn start(&mut self, now_ms: f64) -> Result<(), Rejection> {
        if self.phase != Phase::Ready {
            debug!(phase = ?self.phase, "start ignored outside ready phase");
            return Err(Rejection::NotReady);
        }
        self.load_persisted();
        self.phase = Phase::Playing;
        self.paused = false;
        self.session_start_ms = now_ms;
        self.score_events.clear();
        self.last_score_ms = None;
        self.finalized = false;
        debug!(high_score = self.high_score, "session started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), Rejection> {
        self.require_playing()?;
        self.paused = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), Rejection> {
        self.require_playing()?;
        self.paused = false;
        Ok(())
    }

    /// Flip the pause flag. Returns the new value.
    pub fn toggle_pause(&mut self) -> Result<bool, Rejection> {
        self.require_playing()?;
        self.paused = !self.paused;
        Ok(self.paused)
    }

    fn require_playing(&self) -> Result<(), Rejection> {
        if self.phase == Phase::Playing {
            Ok(())
        } else {
            Err(Rejection::NotPlaying)
        }
    }

    /// Award points. Returns the points actually added after clamping and
    /// the score-boost multiplier.
    ///
    /// The proposed total is capped at `max_points_per_sec` times session
    /// wall time and the increment at `max_single_award`, both before the
    /// multiplier. Existing score is never reduced.
    pub fn add_score(&mut self, points: f64, now_ms: f64) -> Result<f64, Rejection> {
        if !points.is_finite() || points < 0.0 {
            warn!(points, "invalid score points");
            return Err(Rejection::InvalidPoints);
        }
        if self.phase != Phase::Playing {
            warn!("score attempted while not playing");
            return Err(Rejection::NotPlaying);
        }

        let window = self.rules.score_window_ms;
        let recent = self
            .score_events
            .iter()
            .filter(|&&t| now_ms - t < window)
            .count();
        if recent >= self.rules.max_score_events_per_window {
            warn!(recent, "score rate limit exceeded");
            return Err(Rejection::RateLimited);
        }

        let game_time = ((now_ms - self.session_start_ms) / 1000.0).max(0.0);
        let max_reasonable = game_time * self.rules.max_points_per_sec;
        let mut points = points;
        if self.score + points > max_reasonable {
            warn!(
                game_time,
                current = self.score,
                adding = points,
                max_reasonable,
                "unreasonable score, capping increment"
            );
            points = (max_reasonable - self.score).max(0.0);
        }
        if points > self.rules.max_single_award {
            debug!(points, "single award capped");
            points = self.rules.max_single_award;
        }

        let multiplier = if self.power_ups.is_active(PowerUpKind::ScoreBoost) {
            self.rules.score_boost_multiplier
        } else {
            1.0
        };
        let final_points = points * multiplier;
        let coins = (final_points / self.rules.points_per_coin).floor() as u64;

        self.score_events.retain(|&t| now_ms - t < window);
        self.score_events.push_back(now_ms);
        self.score += final_points;
        self.coins_earned += coins;
        self.last_score_ms = Some(now_ms);
        Ok(final_points)
    }

    /// Lose one life. At zero the phase is forced to `Ended` without
    /// persisting anything; call [`GameState::finalize`] to persist and
    /// publish the result.
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.phase = Phase::Ended;
            debug!(score = self.score, "out of lives");
        }
        self.lives
    }

    /// Advance survival time by `dt` seconds. Silently ignored while not
    /// playing or paused.
    pub fn update_time(&mut self, dt: f64) -> Result<(), Rejection> {
        if !dt.is_finite() || dt < 0.0 || dt > self.rules.max_frame_delta_secs {
            warn!(dt, "invalid delta time");
            return Err(Rejection::InvalidDeltaTime);
        }
        if self.phase != Phase::Playing || self.paused {
            return Ok(());
        }
        self.time_alive += dt;
        Ok(())
    }

    /// Recompute the level from survival time. Never lowers it.
    pub fn update_difficulty(&mut self) -> u32 {
        let level = (self.time_alive / self.rules.secs_per_level).floor() as u32 + 1;
        self.difficulty_level = self.difficulty_level.max(level);
        self.difficulty_level
    }

    /// Count down timed power-ups and drop expired ones.
    pub fn update_power_ups(&mut self, dt: f32) {
        self.power_ups.tick(dt);
    }

    /// Apply a collected power-up. Shield is banked as a flag; timed kinds
    /// replace any running instance of the same kind with a fresh one.
    pub fn activate_power_up(&mut self, kind: PowerUpKind) -> Result<(), Rejection> {
        if self.phase != Phase::Playing {
            warn!(?kind, "power-up activated while not playing");
            return Err(Rejection::NotPlaying);
        }
        match kind {
            PowerUpKind::Shield => self.has_shield = true,
            _ => {
                self.power_ups.activate(kind);
            },
        }
        Ok(())
    }

    pub fn remove_shield(&mut self) {
        self.has_shield = false;
    }

    /// End an active session: persist and publish the result, then move to
    /// `Ended`.
    pub fn end(&mut self) -> Result<SessionEnded, Rejection> {
        self.require_playing()?;
        self.phase = Phase::Ended;
        Ok(self.persist_and_publish())
    }

    /// Persist and publish a session that ended by running out of lives.
    /// Returns `None` if not ended or already finalized.
    pub fn finalize(&mut self) -> Option<SessionEnded> {
        if self.phase != Phase::Ended || self.finalized {
            return None;
        }
        Some(self.persist_and_publish())
    }

    fn persist_and_publish(&mut self) -> SessionEnded {
        let new_high = self.score.max(self.high_score);
        if new_high > self.high_score {
            if let Err(e) = set_number(self.store.as_mut(), keys::HIGH_SCORE, new_high) {
                warn!("Failed to persist high score: {e}");
            }
            self.high_score = new_high;
        }

        self.total_coins_earned += self.coins_earned;
        if let Err(e) = set_number(
            self.store.as_mut(),
            keys::TOTAL_COINS_EARNED,
            self.total_coins_earned as f64,
        ) {
            warn!("Failed to persist coin total: {e}");
        }

        self.finalized = true;
        let event = SessionEnded {
            score: self.score,
            time_alive: self.time_alive,
            difficulty_level: self.difficulty_level,
            coins_earned: self.coins_earned,
        };
        debug!(?event, "session ended");
        self.ended_events.push(event.clone());
        event
    }

    /// Reset everything session-scoped and return to `Ready`. Persisted
    /// totals are untouched.
    pub fn restart(&mut self) {
        self.phase = Phase::Ready;
        self.paused = false;
        self.score = 0.0;
        self.lives = self.rules.starting_lives;
        self.time_alive = 0.0;
        self.difficulty_level = 1;
        self.coins_earned = 0;
        self.power_ups.clear();
        self.has_shield = false;
        self.session_start_ms = 0.0;
        self.score_events.clear();
        self.last_score_ms = None;
        self.finalized = false;
    }

    /// Credit coins to the current session, rounded down.
    pub fn earn_coins(&mut self, amount: f64) -> Result<(), Rejection> {
        if !amount.is_finite() || amount < 0.0 {
            warn!(amount, "invalid coin amount");
            return Err(Rejection::InvalidAmount);
        }
        self.coins_earned += amount.floor() as u64;
        Ok(())
    }

    /// Lifetime coins minus coins already spent.
    pub fn available_coins(&self) -> u64 {
        let spent = get_number(self.store.as_ref(), keys::SPENT_COINS, 0.0).max(0.0) as u64;
        self.total_coins_earned.saturating_sub(spent)
    }

    /// Spend from the lifetime balance. Returns false if the amount is zero
    /// or more than is available.
    pub fn spend_coins(&mut self, amount: u64) -> bool {
        if amount == 0 || self.available_coins() < amount {
            return false;
        }
        let spent = get_number(self.store.as_ref(), keys::SPENT_COINS, 0.0).max(0.0) as u64;
        match set_number(
            self.store.as_mut(),
            keys::SPENT_COINS,
            (spent + amount) as f64,
        ) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist spent coins: {e}");
                false
            },
        }
    }

    /// Take published session results.
    pub fn drain_ended_events(&mut self) -> Vec<SessionEnded> {
        std::mem::take(&mut self.ended_events)
    }
}
