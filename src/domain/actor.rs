/// The two player characters.
///
/// Positions are continuous world units with y pointing up; `(x, y)` is
/// the hitbox center. Velocity is in units per tick.

use std::rc::Rc;

use super::anim::{AnimState, AnimationSet, Animator};
use super::layer::Rect;

pub const ACTOR_WIDTH: f32 = 48.0;
pub const ACTOR_HEIGHT: f32 = 60.0;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PlayerId {
    /// Player 1: walks through fire.
    Fire,
    /// Player 2: walks on water.
    Water,
}

impl PlayerId {
    pub const BOTH: [PlayerId; 2] = [PlayerId::Fire, PlayerId::Water];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            PlayerId::Fire => 0,
            PlayerId::Water => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayerId::Fire => "Fire Knight",
            PlayerId::Water => "Water Priestess",
        }
    }

    /// Directory name under the characters dir.
    pub fn asset_dir(self) -> &'static str {
        match self {
            PlayerId::Fire => "fire_knight",
            PlayerId::Water => "water_priestess",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Actor {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub width: f32,
    pub height: f32,
    pub facing_right: bool,
    pub anim: Animator,
    /// Standing in a terrain-affinity zone; recomputed every step.
    pub on_special_surface: bool,
    /// Attack connected with a breakable layer; consumed once the attack ends.
    pub hit_object: bool,
}

impl Actor {
    pub fn new(id: PlayerId, frames: Rc<AnimationSet>, anim_speed: u32) -> Self {
        Actor {
            id,
            x: 0.0,
            y: 0.0,
            dx: 0.0,
            dy: 0.0,
            width: ACTOR_WIDTH,
            height: ACTOR_HEIGHT,
            facing_right: true,
            anim: Animator::new(frames, anim_speed),
            on_special_surface: false,
            hit_object: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.left(), self.bottom(), self.width, self.height)
    }

    #[inline]
    pub fn left(&self) -> f32 { self.x - self.width / 2.0 }
    #[inline]
    pub fn right(&self) -> f32 { self.x + self.width / 2.0 }
    #[inline]
    pub fn bottom(&self) -> f32 { self.y - self.height / 2.0 }
    #[cfg(test)]
    pub fn top(&self) -> f32 { self.y + self.height / 2.0 }

    pub fn set_left(&mut self, left: f32) { self.x = left + self.width / 2.0; }
    pub fn set_right(&mut self, right: f32) { self.x = right - self.width / 2.0; }
    pub fn set_bottom(&mut self, bottom: f32) { self.y = bottom + self.height / 2.0; }
    pub fn set_top(&mut self, top: f32) { self.y = top - self.height / 2.0; }

    pub fn state(&self) -> AnimState {
        self.anim.state()
    }

    pub fn texture(&self) -> &str {
        self.anim.texture(self.facing_right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_follow_center() {
        let mut a = Actor::new(PlayerId::Fire, Rc::new(AnimationSet::fire_knight()), 10);
        a.x = 100.0;
        a.y = 200.0;
        assert_eq!(a.left(), 76.0);
        assert_eq!(a.right(), 124.0);
        assert_eq!(a.bottom(), 170.0);
        a.set_right(1000.0);
        assert_eq!(a.x, 976.0);
        a.set_bottom(64.0);
        assert_eq!(a.rect().bottom, 64.0);
    }

    #[test]
    fn player_indices_are_distinct() {
        assert_eq!(PlayerId::Fire.index(), 0);
        assert_eq!(PlayerId::Water.index(), 1);
    }
}
