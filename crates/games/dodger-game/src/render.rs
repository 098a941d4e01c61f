use crate::entities::Rect;

/// RGBA color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const BACKGROUND: Color = Color::rgb(0x00, 0x00, 0x11);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const SHIP: Color = Color::rgb(0x4e, 0xcd, 0xc4);
    pub const SHIP_HIT: Color = Color::rgb(0xff, 0x6b, 0x6b);
    pub const SHIP_DETAIL: Color = Color::rgb(0x45, 0xb7, 0xaa);
    pub const ROCK: Color = Color::rgb(0x8b, 0x45, 0x13);
    pub const ROCK_OUTLINE: Color = Color::rgb(0x65, 0x43, 0x21);
    pub const SHIELD: Color = Color::rgb(0x00, 0xff, 0xff);
    pub const SLOW_TIME: Color = Color::rgb(0xff, 0xff, 0x00);
    pub const SCORE_BOOST: Color = Color::rgb(0x00, 0xff, 0x00);
    pub const SLOW_TIME_TINT: Color = Color::rgba(0xff, 0xff, 0x00, 0.1);

    /// CSS `rgba()` form, for canvas-backed hosts.
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// A 2D drawing target. Coordinates are surface pixels with y pointing down.
///
/// The engine reads `width`/`height` every tick, so a host that resizes its
/// canvas only needs to report the new size here.
pub trait Surface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn fill_round_rect(&mut self, rect: Rect, radius: f32, color: Color);
    fn fill_polygon(&mut self, points: &[(f32, f32)], color: Color);
    fn stroke_polygon(&mut self, points: &[(f32, f32)], line_width: f32, color: Color);
    fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, line_width: f32, color: Color);
    /// Draw text centered on `(cx, cy)`.
    fn fill_text(&mut self, text: &str, cx: f32, cy: f32, color: Color);
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Rect {
        rect: Rect,
        color: Color,
    },
    RoundRect {
        rect: Rect,
        radius: f32,
        color: Color,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        color: Color,
    },
    PolygonOutline {
        points: Vec<(f32, f32)>,
        line_width: f32,
        color: Color,
    },
    CircleOutline {
        cx: f32,
        cy: f32,
        radius: f32,
        line_width: f32,
        color: Color,
    },
    Text {
        text: String,
        cx: f32,
        cy: f32,
        color: Color,
    },
}

/// Surface that records draw calls for a host to replay.
///
/// `clear` starts a new frame, so the list always holds the most recently
/// rendered frame. A paused engine does not render, which leaves the last
/// frame in place.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayList {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Surface for DisplayList {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self, color: Color) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::Rect { rect, color });
    }

    fn fill_round_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        self.commands.push(DrawCommand::RoundRect {
            rect,
            radius,
            color,
        });
    }

    fn fill_polygon(&mut self, points: &[(f32, f32)], color: Color) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
        });
    }

    fn stroke_polygon(&mut self, points: &[(f32, f32)], line_width: f32, color: Color) {
        self.commands.push(DrawCommand::PolygonOutline {
            points: points.to_vec(),
            line_width,
            color,
        });
    }

    fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, line_width: f32, color: Color) {
        self.commands.push(DrawCommand::CircleOutline {
            cx,
            cy,
            radius,
            line_width,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, cx: f32, cy: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            cx,
            cy,
            color,
        });
    }
}
