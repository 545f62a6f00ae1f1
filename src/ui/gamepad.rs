/// Gamepad input tracker using gilrs.
///
/// The first pad seen drives the Fire Knight, the second the Water
/// Priestess. A pad that disconnects frees its seat and releases
/// everything it was holding.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move
///   A                     →  Jump
///   X / B / R1            →  Attack
///   Select                →  Pause
///   Start                 →  Continue

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::actor::PlayerId;
use crate::sim::control::Control;
use super::input::{Action, Meta};

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    jump: Vec<Btn>,
    attack: Vec<Btn>,
    pause: Vec<Btn>,
    confirm: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump:    vec![Btn::A],
            attack:  vec![Btn::X, Btn::B, Btn::R1],
            pause:   vec![Btn::Select],
            confirm: vec![Btn::Start],
        }
    }
}

/// Raw state of one pad.
#[derive(Clone, Copy, Debug, Default)]
struct PadState {
    buttons: [bool; 10],
    /// Buttons that went down since the last update.
    just_pressed: [bool; 10],
    dpad_left: bool,
    dpad_right: bool,
    stick_x: f32,
}

impl PadState {
    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize])
    }

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.just_pressed[b as usize])
    }

    fn controls(&self, map: &ActionMap) -> Held {
        Held {
            left: self.dpad_left || self.stick_x < -STICK_DEADZONE,
            right: self.dpad_right || self.stick_x > STICK_DEADZONE,
            jump: self.any_held(&map.jump),
            attack: self.any_held(&map.attack),
        }
    }
}

/// Which controls a pad holds, after mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Held {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub attack: bool,
}

impl Held {
    /// Press/release actions that turn `self` into `next` for `id`.
    pub fn diff(&self, next: &Held, id: PlayerId) -> Vec<Action> {
        let pairs = [
            (self.left, next.left, Control::Left),
            (self.right, next.right, Control::Right),
            (self.jump, next.jump, Control::Jump),
            (self.attack, next.attack, Control::Attack),
        ];
        pairs
            .into_iter()
            .filter_map(|(was, now, control)| match (was, now) {
                (false, true) => Some(Action::Press(id, control)),
                (true, false) => Some(Action::Release(id, control)),
                _ => None,
            })
            .collect()
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Pad occupying each player seat.
    #[cfg(feature = "gamepad")]
    seats: [Option<GamepadId>; 2],

    pads: [PadState; 2],
    held: [Held; 2],

    actions: Vec<Action>,
    metas: Vec<Meta>,

    // Action mapping
    action_map: ActionMap,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs_opt = match Gilrs::new() {
            Ok(g) => {
                tracing::debug!(pads = g.gamepads().count(), "gamepad support ready");
                Some(g)
            }
            Err(e) => {
                tracing::warn!(error = %e, "gamepad support unavailable");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            #[cfg(feature = "gamepad")]
            seats: [None; 2],
            pads: [PadState::default(); 2],
            held: [Held::default(); 2],
            actions: Vec::with_capacity(8),
            metas: Vec::with_capacity(2),
            action_map: ActionMap::default(),
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        let j = parse_list(&cfg.jump);
        if !j.is_empty() { map.jump = j; }
        let a = parse_list(&cfg.attack);
        if !a.is_empty() { map.attack = a; }
        let p = parse_list(&cfg.pause);
        if !p.is_empty() { map.pause = p; }
        let c = parse_list(&cfg.confirm);
        if !c.is_empty() { map.confirm = c; }
    }

    pub fn update(&mut self) {
        for pad in &mut self.pads {
            pad.just_pressed = [false; 10];
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();

        self.actions.clear();
        self.metas.clear();
        for id in PlayerId::BOTH {
            let i = id.index();
            let pad = &self.pads[i];
            if pad.any_just_pressed(&self.action_map.pause) {
                self.metas.push(Meta::Pause);
            }
            if pad.any_just_pressed(&self.action_map.confirm) {
                self.metas.push(Meta::Continue);
            }
            let next = pad.controls(&self.action_map);
            self.actions.extend(self.held[i].diff(&next, id));
            self.held[i] = next;
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn metas(&self) -> &[Meta] {
        &self.metas
    }

    #[cfg(feature = "gamepad")]
    fn seat_of(&mut self, pad: GamepadId) -> Option<usize> {
        if let Some(i) = self.seats.iter().position(|s| *s == Some(pad)) {
            return Some(i);
        }
        let free = self.seats.iter().position(|s| s.is_none())?;
        self.seats[free] = Some(pad);
        tracing::info!(seat = free, player = PlayerId::BOTH[free].label(), "gamepad assigned");
        Some(free)
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let events: Vec<_> = match &mut self.gilrs {
            Some(g) => std::iter::from_fn(|| g.next_event()).collect(),
            None => return,
        };

        for event in events {
            if let EventType::Disconnected = event.event {
                if let Some(i) = self.seats.iter().position(|s| *s == Some(event.id)) {
                    self.seats[i] = None;
                    self.pads[i] = PadState::default();
                    tracing::info!(seat = i, player = PlayerId::BOTH[i].label(), "gamepad disconnected");
                }
                continue;
            }
            let Some(seat) = self.seat_of(event.id) else {
                continue;
            };
            let pad = &mut self.pads[seat];
            match event.event {
                EventType::ButtonPressed(btn, _) => set_button(pad, btn, true),
                EventType::ButtonReleased(btn, _) => set_button(pad, btn, false),
                EventType::AxisChanged(Axis::LeftStickX, value, _) => pad.stick_x = value,
                _ => {}
            }
        }
    }
}

#[cfg(feature = "gamepad")]
fn set_button(pad: &mut PadState, gilrs_btn: Button, held: bool) {
    // D-pad handled separately (not in Btn enum)
    match gilrs_btn {
        Button::DPadLeft  => { pad.dpad_left = held; return; }
        Button::DPadRight => { pad.dpad_right = held; return; }
        _ => {}
    }

    if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
        let idx = btn as usize;
        pad.buttons[idx] = held;
        if held {
            pad.just_pressed[idx] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_diff_yields_edges() {
        let before = Held { left: true, jump: true, ..Held::default() };
        let after = Held { right: true, jump: true, ..Held::default() };
        assert_eq!(
            before.diff(&after, PlayerId::Water),
            vec![
                Action::Release(PlayerId::Water, Control::Left),
                Action::Press(PlayerId::Water, Control::Right),
            ]
        );
        assert!(after.diff(&after, PlayerId::Water).is_empty());
    }

    #[test]
    fn stick_respects_deadzone() {
        let map = ActionMap::default();
        let mut pad = PadState { stick_x: 0.2, ..PadState::default() };
        assert_eq!(pad.controls(&map), Held::default());
        pad.stick_x = -0.8;
        assert!(pad.controls(&map).left);
        pad.buttons[Btn::R1 as usize] = true;
        assert!(pad.controls(&map).attack);
    }

    #[test]
    fn button_names_parse_loosely() {
        assert_eq!(Btn::from_name("south"), Some(Btn::A));
        assert_eq!(Btn::from_name("RB"), Some(Btn::R1));
        assert_eq!(Btn::from_name("back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("turbo"), None);
    }
}
