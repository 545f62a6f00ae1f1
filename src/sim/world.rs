/// WorldState: the complete state of a running session.
///
/// ## Level session
///
/// Everything level-specific (layers, rules, physics bindings, map size)
/// is rebuilt by `level::setup_level` on start, on level transition and on
/// load. Session scalars (score, leftmost x, flags, sound latches) survive
/// level changes.
///
/// ## Camera / Viewport
///
/// World coordinates are continuous with y pointing up:
///   - `camera` — viewport into the world (bottom-left offset + size)
///   - The renderer sets `camera.width` from the terminal each frame and
///     maps world x to a column with `(x - camera.x) / TILE`
///   - The camera follows the midpoint of the two actors until they drift
///     too far apart, then holds still and fences them in instead

use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::{CameraConfig, GameConfig, PhysicsConfig};
use crate::domain::actor::{Actor, PlayerId};
use crate::domain::anim::AnimationSet;
use crate::domain::layer::LayerSet;
use crate::domain::physics::Platformer;
use crate::domain::rules::LevelRules;
use super::level::LevelLibrary;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum GameState {
    Running,
    Paused,
}

/// Camera: a viewport into the world.
///
/// `(x, y)` is the world coordinate of the bottom-left visible point.
/// `y` is always 0: levels never scroll vertically.
#[derive(Clone, Debug)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

impl Camera {
    pub fn new(width: f32) -> Self {
        Camera { x: 0.0, y: 0.0, width }
    }

    /// Largest legal offset for a map of `map_width`.
    #[inline]
    pub fn max_x(&self, map_width: f32) -> f32 {
        (map_width - self.width).max(0.0)
    }

    /// Follow the midpoint of both actors while they are close enough to
    /// share the screen; otherwise hold position and keep both inside it.
    pub fn follow_pair(&mut self, actors: &mut [Actor; 2], map_width: f32, buffer: f32) {
        let distance = (actors[0].x - actors[1].x).abs();
        if distance < self.width - buffer {
            let midpoint = (actors[0].x + actors[1].x) / 2.0;
            self.x = (midpoint - self.width / 2.0).clamp(0.0, self.max_x(map_width));
        } else {
            let (left, right) = (self.x, self.x + self.width);
            for actor in actors.iter_mut() {
                if actor.left() < left {
                    actor.set_left(left);
                }
                if actor.right() > right {
                    actor.set_right(right);
                }
            }
        }
        self.y = 0.0;
    }
}

/// Held movement keys for one player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intent {
    pub left: bool,
    pub right: bool,
}

impl Intent {
    /// Horizontal velocity: opposing keys cancel out.
    pub fn velocity(&self, speed: f32) -> f32 {
        match (self.left, self.right) {
            (true, false) => -speed,
            (false, true) => speed,
            _ => 0.0,
        }
    }
}

/// Tuning copied out of the config at session start.
#[derive(Clone, Copy, Debug)]
pub struct Tuning {
    pub physics: PhysicsConfig,
    pub camera: CameraConfig,
}

pub struct WorldState {
    // ── Level session ──
    pub current_level: u32,
    pub level_name: String,
    pub intro: Vec<String>,
    pub background: (u8, u8, u8),
    pub layers: LayerSet,
    pub rules: LevelRules,
    pub physics: [Platformer; 2],
    pub map_width: f32,
    pub map_height: f32,

    // ── Actors ──
    pub actors: [Actor; 2],
    pub intents: [Intent; 2],

    // ── Session ──
    pub leftmost_x: f32,
    pub score: u32,
    pub between_levels: bool,
    pub game_ended: bool,
    pub state: GameState,
    /// Rules whose one-shot sound already played this session.
    pub cues_played: HashSet<&'static str>,
    pub end_sound_played: bool,
    pub tick: u64,

    // ── UI ──
    pub save_banner: f32,
    pub load_banner: f32,
    pub message: String,
    pub message_timer: f32,

    // ── Camera / Viewport ──
    pub camera: Camera,

    pub tuning: Tuning,
    pub library: Rc<LevelLibrary>,
}

// ── Construction ──

impl WorldState {
    /// An idle world with no level installed. Call `level::start_session`.
    pub fn new(library: Rc<LevelLibrary>, frames: [Rc<AnimationSet>; 2], config: &GameConfig) -> Self {
        let [fire_frames, water_frames] = frames;
        WorldState {
            current_level: 0,
            level_name: String::new(),
            intro: vec![],
            background: (0, 0, 0),
            layers: LayerSet::new(),
            rules: LevelRules::default(),
            physics: [
                Platformer::new(vec![], config.physics.gravity),
                Platformer::new(vec![], config.physics.gravity),
            ],
            map_width: 0.0,
            map_height: 0.0,
            actors: [
                Actor::new(PlayerId::Fire, fire_frames, config.animation_speed),
                Actor::new(PlayerId::Water, water_frames, config.animation_speed),
            ],
            intents: [Intent::default(); 2],
            leftmost_x: 0.0,
            score: 0,
            between_levels: true,
            game_ended: false,
            state: GameState::Running,
            cues_played: HashSet::new(),
            end_sound_played: false,
            tick: 0,
            save_banner: 0.0,
            load_banner: 0.0,
            message: String::new(),
            message_timer: 0.0,
            camera: Camera::new(config.camera.viewport_width),
            tuning: Tuning { physics: config.physics, camera: config.camera },
            library,
        }
    }

    pub fn actor(&self, id: PlayerId) -> &Actor {
        &self.actors[id.index()]
    }

    pub fn actor_mut(&mut self, id: PlayerId) -> &mut Actor {
        &mut self.actors[id.index()]
    }

    /// Gameplay advances only in this state.
    pub fn is_live(&self) -> bool {
        self.state == GameState::Running && !self.between_levels && !self.game_ended
    }

    pub fn set_message(&mut self, msg: &str) {
        self.message = msg.to_string();
        self.message_timer = self.tuning.camera.banner_seconds;
    }

    pub fn arm_save_banner(&mut self) {
        self.save_banner = self.tuning.camera.banner_seconds;
    }

    pub fn arm_load_banner(&mut self) {
        self.load_banner = self.tuning.camera.banner_seconds;
    }

    /// Count banner timers down, clearing an expired message.
    pub fn decay_banners(&mut self, dt: f32) {
        self.save_banner = (self.save_banner - dt).max(0.0);
        self.load_banner = (self.load_banner - dt).max(0.0);
        if self.message_timer > 0.0 {
            self.message_timer = (self.message_timer - dt).max(0.0);
            if self.message_timer == 0.0 {
                self.message.clear();
            }
        }
    }
}
