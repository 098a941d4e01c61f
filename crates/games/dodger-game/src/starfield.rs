use rand::Rng;

use crate::entities::Rect;
use crate::render::{Color, Surface};

/// Background star. Purely cosmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    pub x: f32,
    pub y: f32,
    /// Pixels per 1/60 s.
    pub speed: f32,
    pub size: f32,
}

/// Scrolling star backdrop, simulated independently of gameplay entities.
#[derive(Debug, Clone, Default)]
pub struct Starfield {
    stars: Vec<Star>,
}

impl Starfield {
    pub fn new(count: usize, width: f32, height: f32, rng: &mut impl Rng) -> Self {
        let stars = (0..count)
            .map(|_| Star {
                x: rng.random::<f32>() * width,
                y: rng.random::<f32>() * height,
                speed: rng.random::<f32>() * 2.0 + 0.5,
                size: rng.random::<f32>() * 2.0 + 1.0,
            })
            .collect();
        Self { stars }
    }

    /// Drift stars downward; a star leaving the bottom wraps to the top at a
    /// new random column.
    pub fn update(&mut self, dt: f32, width: f32, height: f32, rng: &mut impl Rng) {
        for star in &mut self.stars {
            star.y += star.speed * dt * 60.0;
            if star.y > height {
                star.y = 0.0;
                star.x = rng.random::<f32>() * width;
            }
        }
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        for star in &self.stars {
            surface.fill_rect(Rect::new(star.x, star.y, star.size, star.size), Color::WHITE);
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn stars_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut field = Starfield::new(200, 800.0, 600.0, &mut rng);
        assert_eq!(field.len(), 200);
        for _ in 0..600 {
            field.update(1.0 / 60.0, 800.0, 600.0, &mut rng);
        }
        for star in field.stars() {
            assert!((0.0..=800.0).contains(&star.x));
            assert!(star.y <= 600.0 + 2.5);
            assert!((0.5..2.5).contains(&star.speed));
            assert!((1.0..3.0).contains(&star.size));
        }
    }

    #[test]
    fn star_wraps_to_top() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut field = Starfield {
            stars: vec![Star {
                x: 10.0,
                y: 599.0,
                speed: 2.0,
                size: 1.0,
            }],
        };
        field.update(1.0 / 60.0, 800.0, 600.0, &mut rng);
        assert_eq!(field.stars()[0].y, 0.0);
    }
}
