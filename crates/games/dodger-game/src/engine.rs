use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::collision::first_hit;
use crate::config::DodgerConfig;
use crate::entities::{Entity, OUTLINE_POINTS, Obstacle, PowerUp, PowerUpKind, Rect, Ship};
use crate::input::{Action, InputState, KeyBindings};
use crate::render::{Color, Surface};
use crate::sound::{SoundEffect, SoundQueue};
use crate::starfield::Starfield;
use crate::state::{GameState, Phase};

/// Whether the host should schedule another frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Continue,
    Stopped,
}

/// Frame-driven simulation of one game.
///
/// The host owns the clock: it calls [`Engine::frame`] once per display
/// frame with a millisecond timestamp, and keeps calling while the result is
/// [`FrameStatus::Continue`]. Tests can drive [`Engine::step`] directly with
/// explicit deltas.
pub struct Engine<S: Surface> {
    config: DodgerConfig,
    surface: S,
    state: GameState,
    rng: StdRng,
    bindings: KeyBindings,
    input: InputState,
    sounds: SoundQueue,
    ship: Ship,
    obstacles: Vec<Obstacle>,
    power_ups: Vec<PowerUp>,
    stars: Starfield,
    running: bool,
    destroyed: bool,
    last_frame_ms: f64,
    last_obstacle_spawn_ms: Option<f64>,
    last_power_up_spawn_ms: Option<f64>,
    survival_carry: f64,
}

impl<S: Surface> Engine<S> {
    pub fn new(surface: S, state: GameState, config: DodgerConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (width, height) = (surface.width(), surface.height());
        let stars = Starfield::new(config.world.star_count, width, height, &mut rng);
        let (x, y) = Self::ship_home(&config, width, height);
        let ship = Ship::new(x, y, config.ship.width, config.ship.height);
        Self {
            config,
            surface,
            state,
            rng,
            bindings: KeyBindings::default(),
            input: InputState::default(),
            sounds: SoundQueue::default(),
            ship,
            obstacles: Vec::new(),
            power_ups: Vec::new(),
            stars,
            running: false,
            destroyed: false,
            last_frame_ms: 0.0,
            last_obstacle_spawn_ms: None,
            last_power_up_spawn_ms: None,
            survival_carry: 0.0,
        }
    }

    fn ship_home(config: &DodgerConfig, width: f32, height: f32) -> (f32, f32) {
        (
            (width - config.ship.width) / 2.0,
            height - config.ship.bottom_offset,
        )
    }

    /// Begin the frame loop. `now_ms` becomes the delta-time baseline.
    /// No-op while running or after [`Engine::destroy`].
    pub fn start(&mut self, now_ms: f64) {
        if self.destroyed {
            warn!("start called on a destroyed engine");
            return;
        }
        if self.running {
            return;
        }
        self.running = true;
        self.last_frame_ms = now_ms;
        info!("Engine started");
    }

    /// Stop the frame loop. Further frames are refused until restarted.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("Engine stopped");
        }
    }

    /// Stop for good and drop held input. Later input and `start` calls are
    /// ignored.
    pub fn destroy(&mut self) {
        self.stop();
        self.destroyed = true;
        self.input.clear();
        self.sounds.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Run one display frame. The delta is the time since the previous frame
    /// (or since `start`).
    pub fn frame(&mut self, now_ms: f64) -> FrameStatus {
        if !self.running {
            return FrameStatus::Stopped;
        }
        let dt = ((now_ms - self.last_frame_ms) / 1000.0) as f32;
        self.last_frame_ms = now_ms;

        if self.state.phase() != Phase::Playing || self.state.is_paused() {
            return FrameStatus::Continue;
        }
        self.step(dt, now_ms);
        self.render();
        FrameStatus::Continue
    }

    /// Advance the simulation by `dt` seconds without rendering.
    pub fn step(&mut self, dt: f32, now_ms: f64) {
        if self.state.phase() != Phase::Playing || self.state.is_paused() {
            return;
        }
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "frame skipped, invalid delta time");
            return;
        }
        let (width, height) = (self.surface.width(), self.surface.height());

        // A stalled frame (e.g. a backgrounded tab) earns no survival time and
        // moves entities by at most one maximum-length frame.
        let counted = self.state.update_time(dt as f64).is_ok();
        let dt = dt.min(self.state.rules().max_frame_delta_secs as f32);
        self.state.update_difficulty();
        self.state.update_power_ups(dt);

        self.apply_input();
        self.ship.update(dt, width, self.config.ship.friction);

        self.spawn_obstacle(now_ms, width);
        self.spawn_power_up(now_ms, width);

        let obstacle_dt = if self.state.is_power_up_active(PowerUpKind::SlowTime) {
            dt * self.config.power_ups.slow_time_factor
        } else {
            dt
        };
        for obstacle in &mut self.obstacles {
            obstacle.update(obstacle_dt);
        }
        let (fall, bob) = (
            self.config.power_ups.fall_speed,
            self.config.power_ups.bob_rate,
        );
        for power_up in &mut self.power_ups {
            power_up.update(dt, fall, bob);
        }

        self.resolve_obstacle_hit();
        self.resolve_power_up_pickup(now_ms);
        self.sweep(height);

        self.stars.update(dt, width, height, &mut self.rng);
        if counted {
            self.award_survival(dt, now_ms);
        }
    }

    fn apply_input(&mut self) {
        let speed = self.config.ship.move_speed;
        if self.input.is_held(Action::MoveLeft, &self.bindings) {
            self.ship.move_left(speed);
        }
        if self.input.is_held(Action::MoveRight, &self.bindings) {
            self.ship.move_right(speed);
        }
    }

    /// Current obstacle spawn interval in milliseconds.
    pub fn obstacle_interval_ms(&self) -> f64 {
        let cfg = &self.config.obstacles;
        let level = self.state.difficulty_level().saturating_sub(1) as f64;
        (cfg.base_spawn_interval_ms - level * cfg.spawn_interval_step_ms)
            .max(cfg.min_spawn_interval_ms)
    }

    /// Fall speed for obstacles spawned at the current level.
    pub fn obstacle_speed(&self) -> f32 {
        let cfg = &self.config.obstacles;
        let level = self.state.difficulty_level().saturating_sub(1) as f32;
        (cfg.base_speed + level * cfg.speed_per_level).min(cfg.max_speed)
    }

    fn spawn_obstacle(&mut self, now_ms: f64, width: f32) {
        if let Some(last) = self.last_obstacle_spawn_ms
            && now_ms - last <= self.obstacle_interval_ms()
        {
            return;
        }
        let speed = self.obstacle_speed();
        let cfg = &self.config.obstacles;
        let size = cfg.min_size + self.rng.random::<f32>() * (cfg.max_size - cfg.min_size).max(0.0);
        let span = (width - 2.0 * cfg.spawn_margin).max(0.0);
        let x = self.rng.random::<f32>() * span + cfg.spawn_margin;
        let spin = (self.rng.random::<f32>() - 0.5) * 2.0 * cfg.max_spin;
        let mut outline = [1.0; OUTLINE_POINTS];
        for factor in &mut outline {
            *factor = 0.8 + self.rng.random::<f32>() * 0.4;
        }
        self.obstacles.push(
            Obstacle::new(x, -size, size, speed)
                .with_spin(spin)
                .with_outline(outline),
        );
        self.last_obstacle_spawn_ms = Some(now_ms);
    }

    fn spawn_power_up(&mut self, now_ms: f64, width: f32) {
        let cfg = &self.config.power_ups;
        if self.state.difficulty_level() < cfg.min_level {
            return;
        }
        if let Some(last) = self.last_power_up_spawn_ms
            && now_ms - last <= cfg.spawn_interval_ms
        {
            return;
        }
        let span = (width - 2.0 * cfg.spawn_margin).max(0.0);
        let x = self.rng.random::<f32>() * span + cfg.spawn_margin;
        let kind = PowerUpKind::ALL[self.rng.random_range(0..PowerUpKind::ALL.len())];
        let mut power_up = PowerUp::new(x, cfg.spawn_y, cfg.size, kind);
        power_up.bob_phase = self.rng.random::<f32>() * std::f32::consts::TAU;
        debug!(?kind, x, "power-up spawned");
        self.power_ups.push(power_up);
        self.last_power_up_spawn_ms = Some(now_ms);
    }

    /// Resolve at most one obstacle hit, first in spawn order. An invincible
    /// ship passes through obstacles without consuming them.
    fn resolve_obstacle_hit(&mut self) {
        if self.ship.is_invincible() {
            return;
        }
        let Some(index) = first_hit(&self.ship.bounds(), &self.obstacles) else {
            return;
        };
        self.obstacles[index].consumed = true;

        if self.state.has_shield() {
            self.state.remove_shield();
            self.sounds.push(SoundEffect::Success);
            debug!("shield absorbed a hit");
            return;
        }

        let lives = self.state.lose_life();
        self.sounds.push(SoundEffect::Hit);
        self.ship.set_invincible(self.config.ship.hit_invincibility_secs);
        debug!(lives, "ship hit");
        if self.state.phase() == Phase::Ended
            && let Some(result) = self.state.finalize()
        {
            info!(score = result.score, level = result.difficulty_level, "Game over");
        }
    }

    fn resolve_power_up_pickup(&mut self, now_ms: f64) {
        let Some(index) = first_hit(&self.ship.bounds(), &self.power_ups) else {
            return;
        };
        let kind = self.power_ups[index].kind;
        self.power_ups[index].consumed = true;
        if self.state.activate_power_up(kind).is_ok() {
            self.sounds.push(SoundEffect::Success);
            let _ = self
                .state
                .add_score(self.config.power_ups.pickup_bonus, now_ms);
        }
    }

    /// Drop consumed entities and those past the bottom edge.
    fn sweep(&mut self, height: f32) {
        let limit = height + self.config.world.despawn_margin;
        self.obstacles.retain(|o| !o.consumed && o.y < limit);
        self.power_ups.retain(|p| !p.consumed && p.y < limit);
    }

    /// Survival points accrue fractionally and are awarded in whole points.
    fn award_survival(&mut self, dt: f32, now_ms: f64) {
        if self.state.phase() != Phase::Playing {
            return;
        }
        self.survival_carry += dt as f64 * self.state.rules().survival_points_per_sec;
        let whole = self.survival_carry.floor();
        if whole >= 1.0 {
            self.survival_carry -= whole;
            let _ = self.state.add_score(whole, now_ms);
        }
    }

    /// Draw the current frame onto the surface.
    pub fn render(&mut self) {
        let (width, height) = (self.surface.width(), self.surface.height());
        self.surface.clear(Color::BACKGROUND);
        self.stars.render(&mut self.surface);
        self.ship.render(&mut self.surface);
        for obstacle in &self.obstacles {
            obstacle.render(&mut self.surface);
        }
        for power_up in &self.power_ups {
            power_up.render(&mut self.surface, self.config.power_ups.bob_amplitude);
        }

        if self.state.has_shield() {
            let (cx, cy) = self.ship.bounds().center();
            self.surface.stroke_circle(
                cx,
                cy,
                self.config.world.shield_radius,
                3.0,
                Color::SHIELD,
            );
        }
        if self.state.is_power_up_active(PowerUpKind::SlowTime) {
            self.surface.fill_rect(
                Rect::new(0.0, 0.0, width, height),
                Color::SLOW_TIME_TINT,
            );
        }
    }

    /// Feed a key press (`KeyboardEvent.code`). Movement keys are sampled
    /// each step; pause and start act immediately.
    pub fn key_down(&mut self, code: &str, now_ms: f64) {
        if self.destroyed {
            return;
        }
        let first_press = self.input.on_key_down(code);
        if !first_press {
            return;
        }
        match self.bindings.action_for(code) {
            Some(Action::TogglePause) => {
                if let Ok(paused) = self.state.toggle_pause() {
                    debug!(paused, "pause toggled");
                }
            },
            Some(Action::Start) => {
                if self.state.phase() == Phase::Ready && self.state.start(now_ms).is_ok() {
                    self.start(now_ms);
                }
            },
            Some(Action::MoveLeft | Action::MoveRight) | None => {},
        }
    }

    pub fn key_up(&mut self, code: &str) {
        if self.destroyed {
            return;
        }
        self.input.on_key_up(code);
    }

    /// Return to the ready phase with a fresh playfield. The ship is moved
    /// home rather than rebuilt.
    pub fn restart(&mut self) {
        self.state.restart();
        let (x, y) = Self::ship_home(&self.config, self.surface.width(), self.surface.height());
        self.ship.reset(x, y);
        self.obstacles.clear();
        self.power_ups.clear();
        self.last_obstacle_spawn_ms = None;
        self.last_power_up_spawn_ms = None;
        self.survival_carry = 0.0;
        self.sounds.clear();
    }

    pub fn drain_sounds(&mut self) -> Vec<SoundEffect> {
        self.sounds.drain()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn ship(&self) -> &Ship {
        &self.ship
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn power_ups(&self) -> &[PowerUp] {
        &self.power_ups
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.bindings
    }

    pub fn config(&self) -> &DodgerConfig {
        &self.config
    }
}
