use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Trait for game-specific power-up kind enums.
pub trait PowerUpKind: Clone + Copy + PartialEq + Serialize + DeserializeOwned {
    /// Seconds the effect stays active once collected. `None` marks a banked
    /// effect that is held until something consumes it instead of timing out.
    fn duration(&self) -> Option<f32>;
}

/// A timed power-up effect, generic over the kind enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ActivePowerUp<K: PowerUpKind> {
    pub kind: K,
    pub remaining: f32,
}

impl<K: PowerUpKind> ActivePowerUp<K> {
    /// Returns `None` for banked kinds, which never get a timer.
    pub fn new(kind: K) -> Option<Self> {
        kind.duration().map(|remaining| Self { kind, remaining })
    }

    pub fn tick(&mut self, dt: f32) {
        self.remaining -= dt;
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// The timed effects currently running for one player.
///
/// Holds at most one entry per kind: activating a kind that is already
/// running drops the old entry and appends a fresh one with a full timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ActivePowerUps<K: PowerUpKind> {
    entries: Vec<ActivePowerUp<K>>,
}

impl<K: PowerUpKind> Default for ActivePowerUps<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PowerUpKind> ActivePowerUps<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the timer for `kind`. Returns false for banked kinds.
    pub fn activate(&mut self, kind: K) -> bool {
        let Some(fresh) = ActivePowerUp::new(kind) else {
            return false;
        };
        self.entries.retain(|p| p.kind != kind);
        self.entries.push(fresh);
        true
    }

    /// Advance every timer by `dt` and drop the ones that ran out.
    pub fn tick(&mut self, dt: f32) {
        for p in &mut self.entries {
            p.tick(dt);
        }
        let before = self.entries.len();
        self.entries.retain(|p| !p.is_expired());
        let expired = before - self.entries.len();
        if expired > 0 {
            tracing::trace!(expired, "power-up timers ran out");
        }
    }

    pub fn is_active(&self, kind: K) -> bool {
        self.entries.iter().any(|p| p.kind == kind)
    }

    pub fn remaining(&self, kind: K) -> Option<f32> {
        self.entries
            .iter()
            .find(|p| p.kind == kind)
            .map(|p| p.remaining)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivePowerUp<K>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    enum Kind {
        Haste,
        Ward,
        Banked,
    }

    impl PowerUpKind for Kind {
        fn duration(&self) -> Option<f32> {
            match self {
                Kind::Haste => Some(3.0),
                Kind::Ward => Some(8.0),
                Kind::Banked => None,
            }
        }
    }

    #[test]
    fn timed_power_up_expires() {
        let mut pu = ActivePowerUp::new(Kind::Haste).unwrap();
        assert!(!pu.is_expired());
        pu.tick(3.0);
        assert!(pu.is_expired());
    }

    #[test]
    fn banked_kind_has_no_timer() {
        assert!(ActivePowerUp::new(Kind::Banked).is_none());
        let mut set = ActivePowerUps::new();
        assert!(!set.activate(Kind::Banked));
        assert!(set.is_empty());
    }

    #[test]
    fn reactivation_refreshes_instead_of_stacking() {
        let mut set = ActivePowerUps::new();
        set.activate(Kind::Ward);
        set.tick(5.0);
        assert_eq!(set.remaining(Kind::Ward), Some(3.0));

        set.activate(Kind::Ward);
        assert_eq!(set.len(), 1);
        assert_eq!(set.remaining(Kind::Ward), Some(8.0));
    }

    #[test]
    fn tick_drops_expired_entries_only() {
        let mut set = ActivePowerUps::new();
        set.activate(Kind::Haste);
        set.activate(Kind::Ward);
        set.tick(4.0);
        assert!(!set.is_active(Kind::Haste));
        assert!(set.is_active(Kind::Ward));
        assert_eq!(set.len(), 1);
    }
}
