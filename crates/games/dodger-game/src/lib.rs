pub mod collision;
pub mod config;
pub mod engine;
pub mod entities;
pub mod input;
pub mod render;
pub mod sound;
pub mod starfield;
pub mod state;
pub mod storage;

pub use config::DodgerConfig;
pub use engine::{Engine, FrameStatus};
pub use entities::PowerUpKind;
pub use render::{DisplayList, Surface};
pub use state::{GameState, Phase, Rejection, SessionEnded};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};

/// Build an engine on a recording surface backed by an in-memory store.
pub fn headless_engine(
    config: DodgerConfig,
    width: f32,
    height: f32,
    seed: u64,
) -> Engine<DisplayList> {
    let state = GameState::new(config.scoring.clone(), Box::new(MemoryStore::new()));
    Engine::new(DisplayList::new(width, height), state, config, seed)
}

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use super::*;

    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Headless engine already in the playing phase with its loop running.
    pub fn playing_engine(config: DodgerConfig, seed: u64) -> Engine<DisplayList> {
        let mut engine = headless_engine(config, 800.0, 600.0, seed);
        // Space moves ready -> playing and starts the loop.
        engine.key_down("Space", 0.0);
        engine.key_up("Space");
        engine
    }

    /// Drive `frames` display frames at 60 Hz from `start_ms`. Returns the
    /// timestamp of the last frame, stopping early if the loop stops.
    pub fn run_frames(engine: &mut Engine<DisplayList>, start_ms: f64, frames: usize) -> f64 {
        let mut now = start_ms;
        for _ in 0..frames {
            now += FRAME_MS;
            if engine.frame(now) == FrameStatus::Stopped {
                break;
            }
        }
        now
    }
}
