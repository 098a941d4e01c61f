use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::render::{Color, Surface};

/// Axis-aligned rectangle in surface pixels. `(x, y)` is the top-left corner
/// and y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Anything that takes part in collision checks.
pub trait Entity {
    fn bounds(&self) -> Rect;

    /// Consumed entities are skipped by collision checks and swept at the end
    /// of the tick.
    fn is_consumed(&self) -> bool {
        false
    }
}

/// Collectible effect carried by a falling power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    /// Absorbs the next obstacle hit. Does not expire.
    Shield,
    /// Halves obstacle fall speed for 5 seconds.
    SlowTime,
    /// Doubles awarded points for 10 seconds.
    ScoreBoost,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [Self::Shield, Self::SlowTime, Self::ScoreBoost];

    pub fn color(&self) -> Color {
        match self {
            Self::Shield => Color::SHIELD,
            Self::SlowTime => Color::SLOW_TIME,
            Self::ScoreBoost => Color::SCORE_BOOST,
        }
    }

    /// Single-glyph label drawn on the pickup.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Shield => "🛡",
            Self::SlowTime => "⏰",
            Self::ScoreBoost => "⭐",
        }
    }
}

impl dodger_core::powerup::PowerUpKind for PowerUpKind {
    fn duration(&self) -> Option<f32> {
        match self {
            Self::Shield => None,
            Self::SlowTime => Some(5.0),
            Self::ScoreBoost => Some(10.0),
        }
    }
}

/// The player's ship. Moves horizontally only.
#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Horizontal velocity in px/s.
    pub velocity: f32,
    /// Seconds of collision immunity left.
    pub invincible_for: f32,
}

impl Ship {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            velocity: 0.0,
            invincible_for: 0.0,
        }
    }

    pub fn move_left(&mut self, speed: f32) {
        self.velocity = -speed;
    }

    pub fn move_right(&mut self, speed: f32) {
        self.velocity = speed;
    }

    /// Integrate velocity, clamp to `[0, surface_width - width]`, apply
    /// friction, and count down invincibility.
    pub fn update(&mut self, dt: f32, surface_width: f32, friction: f32) {
        self.x += self.velocity * dt;
        let max_x = (surface_width - self.width).max(0.0);
        self.x = self.x.clamp(0.0, max_x);
        self.velocity *= friction;

        if self.invincible_for > 0.0 {
            self.invincible_for = (self.invincible_for - dt).max(0.0);
        }
    }

    pub fn set_invincible(&mut self, secs: f32) {
        self.invincible_for = secs;
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_for > 0.0
    }

    /// Place the ship and clear any motion or immunity.
    pub fn reset(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.velocity = 0.0;
        self.invincible_for = 0.0;
    }

    /// Whether the flashing ship is drawn this frame. Alternates every
    /// tenth of a second while invincible.
    pub fn is_visible(&self) -> bool {
        !self.is_invincible() || (self.invincible_for * 10.0) as u32 % 2 == 0
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        if !self.is_visible() {
            return;
        }
        let hull = if self.is_invincible() {
            Color::SHIP_HIT
        } else {
            Color::SHIP
        };
        let (cx, _) = self.bounds().center();
        surface.fill_polygon(
            &[
                (cx, self.y),
                (self.x, self.bottom()),
                (self.x + self.width * 0.3, self.bottom() - 5.0),
                (self.x + self.width * 0.7, self.bottom() - 5.0),
                (self.right(), self.bottom()),
            ],
            hull,
        );
        surface.fill_rect(
            Rect::new(cx - 3.0, self.y + 5.0, 6.0, self.height * 0.5),
            Color::SHIP_DETAIL,
        );
    }

    fn right(&self) -> f32 {
        self.x + self.width
    }

    fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

impl Entity for Ship {
    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Number of vertices in an obstacle's jagged outline.
pub const OUTLINE_POINTS: usize = 8;

/// A falling, spinning rock.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    /// Edge length of the square collision box.
    pub size: f32,
    /// Fall speed in px/s.
    pub speed: f32,
    pub rotation: f32,
    /// Spin rate in rad/s.
    pub spin: f32,
    /// Per-vertex radius factors, fixed at spawn so the shape does not
    /// shimmer between frames.
    pub outline: [f32; OUTLINE_POINTS],
    pub consumed: bool,
}

impl Obstacle {
    pub fn new(x: f32, y: f32, size: f32, speed: f32) -> Self {
        Self {
            x,
            y,
            size,
            speed,
            rotation: 0.0,
            spin: 0.0,
            outline: [1.0; OUTLINE_POINTS],
            consumed: false,
        }
    }

    pub fn with_spin(mut self, spin: f32) -> Self {
        self.spin = spin;
        self
    }

    pub fn with_outline(mut self, outline: [f32; OUTLINE_POINTS]) -> Self {
        self.outline = outline;
        self
    }

    pub fn update(&mut self, dt: f32) {
        self.y += self.speed * dt;
        self.rotation += self.spin * dt;
    }

    /// Outline vertices in surface coordinates.
    pub fn outline_points(&self) -> Vec<(f32, f32)> {
        let (cx, cy) = self.bounds().center();
        let radius = self.size / 2.0;
        self.outline
            .iter()
            .enumerate()
            .map(|(i, factor)| {
                let angle = self.rotation + i as f32 / OUTLINE_POINTS as f32 * TAU;
                let r = radius * factor;
                (cx + angle.cos() * r, cy + angle.sin() * r)
            })
            .collect()
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        let points = self.outline_points();
        surface.fill_polygon(&points, Color::ROCK);
        surface.stroke_polygon(&points, 2.0, Color::ROCK_OUTLINE);
    }
}

impl Entity for Obstacle {
    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }

    fn is_consumed(&self) -> bool {
        self.consumed
    }
}

/// A falling collectible.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub kind: PowerUpKind,
    /// Phase of the cosmetic vertical bob (radians).
    pub bob_phase: f32,
    pub consumed: bool,
}

impl PowerUp {
    pub fn new(x: f32, y: f32, size: f32, kind: PowerUpKind) -> Self {
        Self {
            x,
            y,
            size,
            kind,
            bob_phase: 0.0,
            consumed: false,
        }
    }

    pub fn update(&mut self, dt: f32, fall_speed: f32, bob_rate: f32) {
        self.y += fall_speed * dt;
        self.bob_phase = (self.bob_phase + dt * bob_rate) % TAU;
    }

    pub fn render(&self, surface: &mut dyn Surface, bob_amplitude: f32) {
        let offset = self.bob_phase.sin() * bob_amplitude;
        let body = Rect::new(self.x, self.y + offset, self.size, self.size);
        surface.fill_round_rect(body, 5.0, self.kind.color());
        let (cx, cy) = body.center();
        surface.fill_text(self.kind.symbol(), cx, cy, Color::BLACK);
    }
}

impl Entity for PowerUp {
    /// The bob is cosmetic; collisions use the unshifted box.
    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }

    fn is_consumed(&self) -> bool {
        self.consumed
    }
}
