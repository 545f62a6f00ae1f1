/// Platformer physics over named solid layers.
///
/// ## Architecture
///
/// Each actor is bound to its own `Platformer`, which carries the list of
/// layers that actor treats as solid. The same level therefore behaves
/// differently per actor: the Fire Knight sinks into water that the Water
/// Priestess stands on.
///
/// ## Integration (per tick)
///
///   1. `dy -= gravity`
///   2. Move along y by `dy`; on overlap with any solid, push the actor
///      out to the nearest face it entered through and zero `dy`.
///   3. Move along x by `dx`; on overlap, push out horizontally.
///
/// Vertical first, so an actor walking into a wall while landing keeps
/// its landing.
///
/// ## Grounded
///
/// The actor is grounded when its hitbox, probed `GROUND_PROBE` units
/// down, overlaps a solid. Only grounded actors may jump.

use super::actor::Actor;
use super::layer::{CollisionQuery, LayerId, Rect};

pub const GROUND_PROBE: f32 = 5.0;

/// Collision-resolving physics for one actor.
pub trait PhysicsBinding {
    /// One integration step: gravity, movement, push-out.
    fn step(&self, actor: &mut Actor, world: &dyn CollisionQuery);

    /// Solid ground within `GROUND_PROBE` units below the actor.
    fn is_grounded(&self, actor: &Actor, world: &dyn CollisionQuery) -> bool;

    /// Start a jump if grounded. Returns whether it happened.
    fn jump(&self, actor: &mut Actor, world: &dyn CollisionQuery, speed: f32) -> bool {
        if !self.is_grounded(actor, world) {
            return false;
        }
        actor.dy = speed;
        true
    }
}

#[derive(Clone, Debug)]
pub struct Platformer {
    pub solids: Vec<LayerId>,
    pub gravity: f32,
}

impl Platformer {
    pub fn new(solids: Vec<LayerId>, gravity: f32) -> Self {
        Platformer { solids, gravity }
    }

    /// Rectangles of every solid object overlapping `rect`.
    fn hits(&self, rect: &Rect, world: &dyn CollisionQuery) -> Vec<Rect> {
        self.solids
            .iter()
            .flat_map(|&layer| world.overlapping(rect, layer))
            .collect()
    }
}

impl PhysicsBinding for Platformer {
    fn step(&self, actor: &mut Actor, world: &dyn CollisionQuery) {
        actor.dy -= self.gravity;

        // ── Vertical ──
        actor.y += actor.dy;
        let hits = self.hits(&actor.rect(), world);
        if !hits.is_empty() {
            if actor.dy > 0.0 {
                let ceiling = hits.iter().map(|r| r.bottom).fold(f32::INFINITY, f32::min);
                actor.set_top(ceiling);
            } else {
                let floor = hits.iter().map(|r| r.top()).fold(f32::NEG_INFINITY, f32::max);
                actor.set_bottom(floor);
            }
            actor.dy = 0.0;
        }

        // ── Horizontal ──
        if actor.dx != 0.0 {
            actor.x += actor.dx;
            let hits = self.hits(&actor.rect(), world);
            if !hits.is_empty() {
                if actor.dx > 0.0 {
                    let wall = hits.iter().map(|r| r.left).fold(f32::INFINITY, f32::min);
                    actor.set_right(wall);
                } else {
                    let wall = hits.iter().map(|r| r.right()).fold(f32::NEG_INFINITY, f32::max);
                    actor.set_left(wall);
                }
            }
        }
    }

    fn is_grounded(&self, actor: &Actor, world: &dyn CollisionQuery) -> bool {
        let probe = actor.rect().translated(0.0, -GROUND_PROBE);
        self.solids.iter().any(|&layer| world.any_overlap(&probe, layer))
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use crate::domain::actor::PlayerId;
    use crate::domain::anim::AnimationSet;
    use crate::domain::layer::{LayerSet, LevelObject, TILE};

    /// Rows top-down; `#` = Platforms, `~` = Water.
    fn layers_from(rows: &[&str]) -> LayerSet {
        let mut set = LayerSet::new();
        set.declare(LayerId::Platforms);
        set.declare(LayerId::Water);
        let h = rows.len();
        for (r, row) in rows.iter().enumerate() {
            for (c, ch) in row.chars().enumerate() {
                let id = match ch {
                    '#' => LayerId::Platforms,
                    '~' => LayerId::Water,
                    _ => continue,
                };
                set.push(id, LevelObject { rect: Rect::tile(c, h - 1 - r), visible: true, origin: id });
            }
        }
        set
    }

    fn actor_at(x: f32, bottom: f32) -> Actor {
        let mut a = Actor::new(PlayerId::Fire, Rc::new(AnimationSet::fire_knight()), 10);
        a.x = x;
        a.set_bottom(bottom);
        a
    }

    fn settle(p: &Platformer, a: &mut Actor, world: &LayerSet, ticks: usize) {
        for _ in 0..ticks {
            p.step(a, world);
        }
    }

    #[test]
    fn falls_and_lands_on_platform() {
        let world = layers_from(&[
            "    ",
            "    ",
            "####",
        ]);
        let p = Platformer::new(vec![LayerId::Platforms], 1.0);
        let mut a = actor_at(100.0, 3.0 * TILE);
        assert!(!p.is_grounded(&a, &world));
        settle(&p, &mut a, &world, 60);
        assert_eq!(a.bottom(), TILE);
        assert_eq!(a.dy, 0.0);
        assert!(p.is_grounded(&a, &world));
    }

    #[test]
    fn solids_are_per_binding() {
        let world = layers_from(&[
            "    ",
            "~~~~",
            "####",
        ]);
        let knight = Platformer::new(vec![LayerId::Platforms], 1.0);
        let priestess = Platformer::new(vec![LayerId::Platforms, LayerId::Water], 1.0);
        let mut sinks = actor_at(100.0, 3.0 * TILE);
        let mut floats = actor_at(100.0, 3.0 * TILE);
        settle(&knight, &mut sinks, &world, 60);
        settle(&priestess, &mut floats, &world, 60);
        assert_eq!(sinks.bottom(), TILE);
        assert_eq!(floats.bottom(), 2.0 * TILE);
    }

    #[test]
    fn wall_stops_horizontal_motion() {
        let world = layers_from(&[
            "   #",
            "   #",
            "####",
        ]);
        let p = Platformer::new(vec![LayerId::Platforms], 1.0);
        let mut a = actor_at(100.0, TILE);
        a.dx = 5.0;
        settle(&p, &mut a, &world, 40);
        assert_eq!(a.right(), 3.0 * TILE);
        assert_eq!(a.bottom(), TILE);
    }

    #[test]
    fn ceiling_cancels_jump() {
        let world = layers_from(&[
            "####",
            "    ",
            "    ",
            "####",
        ]);
        let p = Platformer::new(vec![LayerId::Platforms], 1.0);
        let mut a = actor_at(100.0, TILE);
        assert!(p.jump(&mut a, &world, 20.0));
        settle(&p, &mut a, &world, 4);
        assert_eq!(a.top(), 3.0 * TILE);
        assert_eq!(a.dy, 0.0);
    }

    #[test]
    fn cannot_jump_midair() {
        let world = layers_from(&["    ", "    ", "####"]);
        let p = Platformer::new(vec![LayerId::Platforms], 1.0);
        let mut a = actor_at(100.0, 2.5 * TILE);
        assert!(!p.jump(&mut a, &world, 20.0));
        assert_eq!(a.dy, 0.0);
    }

    #[test]
    fn grounded_probe_reaches_five_units() {
        let world = layers_from(&["    ", "####"]);
        let p = Platformer::new(vec![LayerId::Platforms], 1.0);
        assert!(p.is_grounded(&actor_at(100.0, TILE + 4.0), &world));
        assert!(!p.is_grounded(&actor_at(100.0, TILE + 5.0), &world));
    }
}
