/// Sound cues emitted by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Ship lost a life.
    Hit,
    /// Power-up collected or shield absorbed a hit.
    Success,
}

/// Synthesized tone a host can play for an effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_secs: f32,
}

impl SoundEffect {
    pub fn tone(&self) -> Tone {
        match self {
            Self::Hit => Tone {
                frequency_hz: 180.0,
                duration_secs: 0.15,
            },
            Self::Success => Tone {
                frequency_hz: 520.0,
                duration_secs: 0.3,
            },
        }
    }
}

/// Effects queued during a tick, drained by the host.
#[derive(Debug, Default)]
pub struct SoundQueue {
    effects: Vec<SoundEffect>,
}

impl SoundQueue {
    pub fn push(&mut self, effect: SoundEffect) {
        self.effects.push(effect);
    }

    pub fn drain(&mut self) -> Vec<SoundEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
