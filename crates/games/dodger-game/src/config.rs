use serde::{Deserialize, Serialize};

/// Player ship handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipConfig {
    pub width: f32,
    pub height: f32,
    /// Horizontal speed (px/s) set while a move key is held.
    pub move_speed: f32,
    /// Velocity multiplier applied once per tick.
    pub friction: f32,
    /// Collision immunity granted after losing a life (seconds).
    pub hit_invincibility_secs: f32,
    /// Distance from the bottom of the surface to the ship's top edge.
    pub bottom_offset: f32,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            width: 40.0,
            height: 30.0,
            move_speed: 400.0,
            friction: 0.9,
            hit_invincibility_secs: 1.0,
            bottom_offset: 80.0,
        }
    }
}

/// Obstacle spawning and fall speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub base_spawn_interval_ms: f64,
    pub min_spawn_interval_ms: f64,
    /// Interval reduction per difficulty level above 1.
    pub spawn_interval_step_ms: f64,
    pub base_speed: f32,
    pub speed_per_level: f32,
    pub max_speed: f32,
    pub min_size: f32,
    pub max_size: f32,
    /// Spin rate is drawn from `[-max_spin, max_spin)` rad/s.
    pub max_spin: f32,
    /// Horizontal inset from either edge for spawn positions.
    pub spawn_margin: f32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            base_spawn_interval_ms: 2000.0,
            min_spawn_interval_ms: 300.0,
            spawn_interval_step_ms: 150.0,
            base_speed: 100.0,
            speed_per_level: 20.0,
            max_speed: 400.0,
            min_size: 20.0,
            max_size: 50.0,
            max_spin: 2.0,
            spawn_margin: 30.0,
        }
    }
}

/// Collectible power-ups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpConfig {
    pub spawn_interval_ms: f64,
    /// Difficulty level at which power-ups start appearing.
    pub min_level: u32,
    pub size: f32,
    pub fall_speed: f32,
    pub spawn_y: f32,
    pub spawn_margin: f32,
    /// Bob phase advance (rad/s).
    pub bob_rate: f32,
    /// Vertical bob amplitude when drawn (px).
    pub bob_amplitude: f32,
    /// Points requested on pickup (subject to the per-award cap).
    pub pickup_bonus: f64,
    /// Fall-speed multiplier for obstacles while slow time is active.
    pub slow_time_factor: f32,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            spawn_interval_ms: 15_000.0,
            min_level: 3,
            size: 25.0,
            fall_speed: 150.0,
            spawn_y: -20.0,
            spawn_margin: 20.0,
            bob_rate: 3.0,
            bob_amplitude: 3.0,
            pickup_bonus: 100.0,
            slow_time_factor: 0.5,
        }
    }
}

/// Score bookkeeping and anti-cheat bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub starting_lives: u32,
    pub max_score_events_per_window: usize,
    pub score_window_ms: f64,
    /// Ceiling on total score per second of session wall time.
    pub max_points_per_sec: f64,
    /// Ceiling on a single award, applied before the multiplier.
    pub max_single_award: f64,
    pub score_boost_multiplier: f64,
    pub points_per_coin: f64,
    /// Survival seconds per difficulty level.
    pub secs_per_level: f64,
    /// Continuous award rate while alive.
    pub survival_points_per_sec: f64,
    /// Largest frame delta accepted as survival time.
    pub max_frame_delta_secs: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            starting_lives: 3,
            max_score_events_per_window: 100,
            score_window_ms: 1000.0,
            max_points_per_sec: 50.0,
            max_single_award: 50.0,
            score_boost_multiplier: 2.0,
            points_per_coin: 100.0,
            secs_per_level: 10.0,
            survival_points_per_sec: 10.0,
            max_frame_delta_secs: 1.0,
        }
    }
}

/// Playfield housekeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Entities are dropped once their top edge is this far below the surface.
    pub despawn_margin: f32,
    pub star_count: usize,
    /// Radius of the shield ring drawn around the ship.
    pub shield_radius: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            despawn_margin: 50.0,
            star_count: 200,
            shield_radius: 35.0,
        }
    }
}

/// Data-driven configuration for the dodging game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DodgerConfig {
    pub ship: ShipConfig,
    pub obstacles: ObstacleConfig,
    pub power_ups: PowerUpConfig,
    pub scoring: ScoringConfig,
    pub world: WorldConfig,
}

impl DodgerConfig {
    /// Load config from the file named by `DODGER_GAME_CONFIG`, falling back to
    /// `config/dodger.toml`, then to defaults.
    pub fn load() -> Self {
        let path = std::env::var("DODGER_GAME_CONFIG")
            .unwrap_or_else(|_| "config/dodger.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<DodgerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "Loaded game configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    DodgerConfig::default()
                },
            },
            Err(_) => DodgerConfig::default(),
        }
    }
}
