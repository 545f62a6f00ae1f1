/// Keyboard input tracker.
///
/// Tracks which keys are currently held down and turns the changes into
/// per-player press/release actions:
///   - A key going from "not held" to "held" is a press
///   - A held key that is released (or times out) is a release
///   - Meta keys (pause, save, load, continue, quit) are edge-triggered
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// ```text
///   key                      player           control
///   ─────────────────────    ───────────────  ───────
///   Left / Right             Fire Knight      move
///   Up                       Fire Knight      jump
///   Right Shift, /           Fire Knight      attack
///   A / D                    Water Priestess  move
///   W                        Water Priestess  jump
///   Left Shift, F            Water Priestess  attack
/// ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode,
};

use crate::domain::actor::PlayerId;
use crate::sim::control::Control;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// One edge of a player control.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Press(PlayerId, Control),
    Release(PlayerId, Control),
}

/// Session-level commands.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Meta {
    Quit,
    Pause,
    Save,
    Load,
    Continue,
}

/// Player binding of a key, if any. Letters match either case.
pub fn key_binding(code: KeyCode) -> Option<(PlayerId, Control)> {
    use PlayerId::{Fire, Water};
    let bound = match code {
        KeyCode::Left => (Fire, Control::Left),
        KeyCode::Right => (Fire, Control::Right),
        KeyCode::Up => (Fire, Control::Jump),
        KeyCode::Char('/') => (Fire, Control::Attack),
        KeyCode::Modifier(ModifierKeyCode::RightShift) => (Fire, Control::Attack),
        KeyCode::Modifier(ModifierKeyCode::LeftShift) => (Water, Control::Attack),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'a' => (Water, Control::Left),
            'd' => (Water, Control::Right),
            'w' => (Water, Control::Jump),
            'f' => (Water, Control::Attack),
            _ => return None,
        },
        _ => return None,
    };
    Some(bound)
}

/// Meta command of a key press, if any.
pub fn meta_binding(key: &KeyEvent) -> Option<Meta> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => Some(Meta::Quit),
        KeyCode::Enter => Some(Meta::Continue),
        KeyCode::Char(c) => match (ctrl, c.to_ascii_lowercase()) {
            (true, 'c') => Some(Meta::Quit),
            (true, 's') => Some(Meta::Save),
            (true, 'l') => Some(Meta::Load),
            (false, 'p') => Some(Meta::Pause),
            _ => None,
        },
        _ => None,
    }
}

/// Keys are tracked by binding, so `a` and `A` are the same key.
fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each bound key.
    last_active: HashMap<KeyCode, Instant>,

    /// Player actions produced by the most recent drain_events() call.
    actions: Vec<Action>,

    /// Meta commands pressed during the most recent drain_events() call.
    metas: Vec<Meta>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            actions: Vec::with_capacity(8),
            metas: Vec::with_capacity(4),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.actions.clear();
        self.metas.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.handle_key(key, Instant::now());
            }
        }

        self.expire(Instant::now());
    }

    /// Feed one key event.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind != KeyEventKind::Release {
            if let Some(meta) = meta_binding(&key) {
                self.metas.push(meta);
                return;
            }
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return;
        }
        let code = normalize(key.code);
        let Some((id, control)) = key_binding(code) else {
            return;
        };

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                if self.last_active.remove(&code).is_some() {
                    self.actions.push(Action::Release(id, control));
                }
            }
            KeyEventKind::Release => {
                // Ignore release when enhancement not confirmed;
                // rely on timeout-based expiry instead
            }
            _ => {
                if self.last_active.insert(code, now).is_none() {
                    self.actions.push(Action::Press(id, control));
                }
            }
        }
    }

    /// Release keys that have timed out (fallback for terminals without Release).
    pub fn expire(&mut self, now: Instant) {
        if self.honor_release {
            return;
        }
        let expired: Vec<KeyCode> = self
            .last_active
            .iter()
            .filter(|(_, t)| now.duration_since(**t) >= HOLD_TIMEOUT)
            .map(|(code, _)| *code)
            .collect();
        for code in expired {
            self.last_active.remove(&code);
            if let Some((id, control)) = key_binding(code) {
                self.actions.push(Action::Release(id, control));
            }
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn metas(&self) -> &[Meta] {
        &self.metas
    }

    /// Is this key currently held down?
    #[cfg(test)]
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.contains_key(&normalize(code))
    }
}
