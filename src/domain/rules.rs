/// Per-level gameplay rules, table driven.
///
/// Pure data plus one mutation helper. The update cycle decides *when* a
/// rule fires; this module says *what* each level's rules are and *how*
/// an effect list mutates the layer set.
///
/// ## Terrain affinity (solid layers per actor)
/// ┌───────┬──────────────────────────────┬──────────────────────────────┐
/// │ Level │ Fire Knight                   │ Water Priestess               │
/// ├───────┼──────────────────────────────┼──────────────────────────────┤
/// │ 1     │ Platforms, Water Wall         │ Platforms, Water, Fire Wall   │
/// │ 2     │ Platforms, Bridge, Wall,      │ (same as Fire Knight)         │
/// │       │ Wall2, Water Frozen, Walls    │                               │
/// └───────┴──────────────────────────────┴──────────────────────────────┘
///
/// ## Triggers (level 1)
/// ┌─────────────┬─────────────────┬────────────────┬─────────────────────────────┐
/// │ Rule         │ Actor           │ Source         │ Effects                      │
/// ├─────────────┼─────────────────┼────────────────┼─────────────────────────────┤
/// │ fire lever   │ Fire Knight     │ Fire Lever     │ hide lever, show turned,     │
/// │              │                 │                │ remove Fire, Fire2, Fire Wall│
/// │ water lever  │ Water Priestess │ Water Lever    │ hide lever, show turned,     │
/// │              │                 │                │ Bridge → Platforms, remove   │
/// │              │                 │                │ Water Wall                   │
/// └─────────────┴─────────────────┴────────────────┴─────────────────────────────┘
///
/// ## Special attacks (level 2)
/// ┌─────────────┬─────────────────┬────────────────┬─────────────────────────────┐
/// │ plant wall   │ Fire Knight     │ Wall Plants    │ remove Wall, hide Plants 1-3 │
/// │ ice wall     │ Water Priestess │ Wall Water     │ remove Wall2, hide Water,    │
/// │              │                 │                │ show Water Frozen 1-3        │
/// └─────────────┴─────────────────┴────────────────┴─────────────────────────────┘
///
/// Every effect is idempotent, so re-applying a rule on later ticks is
/// harmless.

use super::actor::PlayerId;
use super::layer::{LayerId, LayerSet};

/// The last level; reaching its exit ends the game.
pub const FINAL_LEVEL: u32 = 2;

/// Sound cue attached to a rule. Played once per rule per session.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Lever,
    Shatter,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Effect {
    Hide(LayerId),
    Show(LayerId),
    Remove(LayerId),
    /// Move every object of `from` into `to` and make it visible.
    MoveInto { from: LayerId, to: LayerId },
}

impl Effect {
    fn layers(&self) -> Vec<LayerId> {
        match *self {
            Effect::Hide(id) | Effect::Show(id) | Effect::Remove(id) => vec![id],
            Effect::MoveInto { from, to } => vec![from, to],
        }
    }
}

/// Fires while `actor` overlaps any object of `source`.
#[derive(Clone, Debug)]
pub struct TriggerRule {
    pub id: &'static str,
    pub actor: PlayerId,
    pub source: LayerId,
    pub cue: Option<Cue>,
    pub effects: Vec<Effect>,
}

/// Latches when a locked, right-facing attack overlaps `target`; applies
/// once the attack animation ends.
#[derive(Clone, Debug)]
pub struct AttackRule {
    pub id: &'static str,
    pub actor: PlayerId,
    pub target: LayerId,
    pub cue: Option<Cue>,
    pub effects: Vec<Effect>,
}

/// Horizontal band (exclusive) where an actor counts as on its special
/// surface, active while `requires` still has objects.
#[derive(Clone, Debug)]
pub struct SurfaceZone {
    pub actor: PlayerId,
    pub x_min: f32,
    pub x_max: f32,
    pub requires: LayerId,
}

impl SurfaceZone {
    pub fn contains(&self, center_x: f32) -> bool {
        self.x_min < center_x && center_x < self.x_max
    }
}

#[derive(Clone, Debug, Default)]
pub struct LevelRules {
    /// Solid layers, indexed by `PlayerId::index()`.
    pub solids: [Vec<LayerId>; 2],
    /// Spawn centers, indexed by `PlayerId::index()`.
    pub spawns: [(f32, f32); 2],
    pub zones: Vec<SurfaceZone>,
    pub triggers: Vec<TriggerRule>,
    pub attacks: Vec<AttackRule>,
    pub attack_enabled: bool,
}

impl LevelRules {
    /// Every layer the rules or the physics bindings touch. A level that
    /// lacks one of these cannot be played.
    pub fn referenced_layers(&self) -> Vec<LayerId> {
        let mut out: Vec<LayerId> = vec![LayerId::Coins, LayerId::Exit];
        out.extend(self.solids.iter().flatten().copied());
        out.extend(self.zones.iter().map(|z| z.requires));
        for t in &self.triggers {
            out.push(t.source);
            out.extend(t.effects.iter().flat_map(Effect::layers));
        }
        for a in &self.attacks {
            out.push(a.target);
            out.extend(a.effects.iter().flat_map(Effect::layers));
        }
        let mut seen = Vec::with_capacity(out.len());
        for id in out {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }
}

pub fn rules_for_level(level: u32) -> Option<LevelRules> {
    match level {
        1 => Some(level_one()),
        2 => Some(level_two()),
        _ => None,
    }
}

fn level_one() -> LevelRules {
    use LayerId::*;
    LevelRules {
        solids: [
            vec![Platforms, WaterWall],
            vec![Platforms, Water, FireWall],
        ],
        spawns: [(360.0, 768.0), (480.0, 768.0)],
        zones: vec![
            SurfaceZone { actor: PlayerId::Fire, x_min: 2240.0, x_max: 2560.0, requires: FireWall },
            SurfaceZone { actor: PlayerId::Water, x_min: 768.0, x_max: 1216.0, requires: Bridge },
        ],
        triggers: vec![
            TriggerRule {
                id: "fire lever",
                actor: PlayerId::Fire,
                source: FireLever,
                cue: Some(Cue::Lever),
                effects: vec![
                    Effect::Hide(FireLever),
                    Effect::Show(FireLeverTurned),
                    Effect::Remove(Fire),
                    Effect::Remove(Fire2),
                    Effect::Remove(FireWall),
                ],
            },
            TriggerRule {
                id: "water lever",
                actor: PlayerId::Water,
                source: WaterLever,
                cue: Some(Cue::Lever),
                effects: vec![
                    Effect::Hide(WaterLever),
                    Effect::Show(WaterLeverTurned),
                    Effect::MoveInto { from: Bridge, to: Platforms },
                    Effect::Remove(WaterWall),
                ],
            },
        ],
        attacks: vec![],
        attack_enabled: false,
    }
}

fn level_two() -> LevelRules {
    use LayerId::*;
    let solids = vec![Platforms, Bridge, Wall, Wall2, WaterFrozen, Walls];
    LevelRules {
        solids: [solids.clone(), solids],
        spawns: [(200.0, 768.0), (300.0, 768.0)],
        zones: vec![],
        triggers: vec![],
        attacks: vec![
            AttackRule {
                id: "plant wall",
                actor: PlayerId::Fire,
                target: WallPlants,
                cue: Some(Cue::Shatter),
                effects: vec![
                    Effect::Remove(Wall),
                    Effect::Hide(Plants),
                    Effect::Hide(Plants2),
                    Effect::Hide(Plants3),
                ],
            },
            AttackRule {
                id: "ice wall",
                actor: PlayerId::Water,
                target: WallWater,
                cue: Some(Cue::Shatter),
                effects: vec![
                    Effect::Remove(Wall2),
                    Effect::Hide(Water),
                    Effect::Show(WaterFrozen),
                    Effect::Show(WaterFrozen2),
                    Effect::Show(WaterFrozen3),
                ],
            },
        ],
        attack_enabled: true,
    }
}

/// Apply an effect list to the layer set.
pub fn apply_effects(layers: &mut LayerSet, effects: &[Effect]) {
    for effect in effects {
        match *effect {
            Effect::Hide(id) => layers.set_visible(id, false),
            Effect::Show(id) => layers.set_visible(id, true),
            Effect::Remove(id) => { layers.clear(id); }
            Effect::MoveInto { from, to } => { layers.move_into(from, to, true); }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
