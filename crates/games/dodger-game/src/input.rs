use std::collections::{HashMap, HashSet};

/// What a key does in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveLeft,
    MoveRight,
    TogglePause,
    /// Begin a session from the ready screen.
    Start,
}

/// Mapping from `KeyboardEvent.code` values to actions.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<String, Action>,
}

impl KeyBindings {
    pub fn bind(&mut self, code: impl Into<String>, action: Action) {
        self.bindings.insert(code.into(), action);
    }

    pub fn unbind(&mut self, code: &str) {
        self.bindings.remove(code);
    }

    pub fn action_for(&self, code: &str) -> Option<Action> {
        self.bindings.get(code).copied()
    }

    fn codes_for(&self, action: Action) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .filter(move |(_, a)| **a == action)
            .map(|(code, _)| code.as_str())
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = Self {
            bindings: HashMap::new(),
        };
        bindings.bind("ArrowLeft", Action::MoveLeft);
        bindings.bind("KeyA", Action::MoveLeft);
        bindings.bind("ArrowRight", Action::MoveRight);
        bindings.bind("KeyD", Action::MoveRight);
        bindings.bind("Escape", Action::TogglePause);
        bindings.bind("Space", Action::Start);
        bindings
    }
}

/// Keys currently held, by code.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys_down: HashSet<String>,
}

impl InputState {
    /// Record a key press. Returns false for auto-repeat of a held key.
    pub fn on_key_down(&mut self, code: &str) -> bool {
        self.keys_down.insert(code.to_string())
    }

    pub fn on_key_up(&mut self, code: &str) {
        self.keys_down.remove(code);
    }

    pub fn is_key_down(&self, code: &str) -> bool {
        self.keys_down.contains(code)
    }

    /// Whether any key bound to `action` is held.
    pub fn is_held(&self, action: Action, bindings: &KeyBindings) -> bool {
        bindings.codes_for(action).any(|code| self.is_key_down(code))
    }

    pub fn clear(&mut self) {
        self.keys_down.clear();
    }
}
