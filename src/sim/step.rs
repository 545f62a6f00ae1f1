/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Banner timers (always, even while paused)
///   2. Bounds clamp
///   3. Animation, then physics, then the bounds clamp again
///   4. Special-surface zones, then the derived animation state
///   5. Trigger → mutation rules
///   6. Special attacks
///   7. Coin pickup
///   8. Goal / level transition
///   9. Camera
///
/// Nothing past step 1 runs while paused, between levels or after the
/// game ended.

use crate::domain::actor::PlayerId;
use crate::domain::anim::AnimState;
use crate::domain::layer::{CollisionQuery, LayerId};
use crate::domain::physics::PhysicsBinding;
use crate::domain::rules::{self, FINAL_LEVEL};
use crate::error::LevelError;
use super::event::GameEvent;
use super::level;
use super::world::WorldState;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// `dt` is the wall-clock length of the tick in seconds. Only a failed
/// level transition is an error.
pub fn step(world: &mut WorldState, dt: f32) -> Result<Vec<GameEvent>, LevelError> {
    world.decay_banners(dt);
    if !world.is_live() {
        return Ok(vec![]);
    }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    resolve_bounds(world);
    resolve_animation(world);
    resolve_physics(world);
    resolve_bounds(world);
    resolve_surfaces(world);
    resolve_derived_state(world);
    resolve_triggers(world, &mut events);
    resolve_attacks(world, &mut events);
    resolve_coins(world, &mut events);
    resolve_goal(world, &mut events)?;
    resolve_camera(world);

    Ok(events)
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

/// Keep both actors inside `[leftmost_x, map_width]`.
fn resolve_bounds(world: &mut WorldState) {
    let (min_x, max_x) = (world.leftmost_x, world.map_width);
    for actor in world.actors.iter_mut() {
        if actor.left() < min_x {
            actor.set_left(min_x);
        }
        if actor.right() > max_x {
            actor.set_right(max_x);
        }
    }
}

fn resolve_animation(world: &mut WorldState) {
    for actor in world.actors.iter_mut() {
        actor.anim.advance();
    }
}

fn resolve_physics(world: &mut WorldState) {
    for (binding, actor) in world.physics.iter().zip(world.actors.iter_mut()) {
        binding.step(actor, &world.layers);
    }
}

fn resolve_surfaces(world: &mut WorldState) {
    for actor in world.actors.iter_mut() {
        let (id, x) = (actor.id, actor.x);
        actor.on_special_surface = world
            .rules
            .zones
            .iter()
            .any(|z| z.actor == id && z.contains(x) && !world.layers.is_empty(z.requires));
    }
}

/// Airborne → Jump; landing → Idle, Walk or Surf. The attack lock
/// silently overrides all of it.
fn resolve_derived_state(world: &mut WorldState) {
    for (binding, actor) in world.physics.iter().zip(world.actors.iter_mut()) {
        let grounded = binding.is_grounded(actor, &world.layers);
        let state = actor.state();
        if !grounded {
            if state != AnimState::Jump {
                actor.anim.set_state(AnimState::Jump);
            }
        } else if state == AnimState::Jump {
            if actor.dx == 0.0 && actor.dy == 0.0 {
                actor.anim.set_state(AnimState::Idle);
            } else if actor.dx != 0.0 {
                let next = if actor.on_special_surface { AnimState::Surf } else { AnimState::Walk };
                actor.anim.set_state(next);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Level rules
// ══════════════════════════════════════════════════════════════

fn resolve_triggers(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for rule in &world.rules.triggers {
        let rect = world.actors[rule.actor.index()].rect();
        if !world.layers.any_overlap(&rect, rule.source) {
            continue;
        }
        if let Some(cue) = rule.cue {
            if world.cues_played.insert(rule.id) {
                tracing::info!(rule = rule.id, level = world.current_level, tick = world.tick, "trigger fired");
                events.push(GameEvent::RuleCue { rule: rule.id, cue });
            }
        }
        rules::apply_effects(&mut world.layers, &rule.effects);
    }
}

/// A hit only latches during a locked, right-facing attack; the effects
/// land once the attack animation has finished.
fn resolve_attacks(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for rule in &world.rules.attacks {
        let actor = &mut world.actors[rule.actor.index()];
        if actor.anim.is_locked() {
            if actor.facing_right && world.layers.any_overlap(&actor.rect(), rule.target) {
                actor.hit_object = true;
            }
        } else if actor.hit_object {
            actor.hit_object = false;
            rules::apply_effects(&mut world.layers, &rule.effects);
            tracing::info!(rule = rule.id, level = world.current_level, tick = world.tick, "wall broken");
            events.push(GameEvent::WallBroken { rule: rule.id });
            if let Some(cue) = rule.cue {
                if world.cues_played.insert(rule.id) {
                    events.push(GameEvent::RuleCue { rule: rule.id, cue });
                }
            }
        }
    }
}

fn resolve_coins(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for id in PlayerId::BOTH {
        let rect = world.actors[id.index()].rect();
        let picked = world.layers.remove_overlapping(LayerId::Coins, &rect);
        for _ in 0..picked {
            world.score += 1;
            events.push(GameEvent::CoinPicked { by: id, score: world.score });
        }
    }
}

/// Both actors must stand in the exit together.
fn resolve_goal(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Result<(), LevelError> {
    let on_exit = world
        .actors
        .iter()
        .all(|a| world.layers.any_overlap(&a.rect(), LayerId::Exit));
    if !on_exit {
        return Ok(());
    }

    let level = world.current_level;
    if level >= FINAL_LEVEL {
        world.game_ended = true;
        if !world.end_sound_played {
            world.end_sound_played = true;
            tracing::info!(score = world.score, tick = world.tick, "game completed");
            events.push(GameEvent::GameCompleted { score: world.score });
        }
        return Ok(());
    }

    tracing::info!(level, score = world.score, tick = world.tick, "level completed");
    events.push(GameEvent::LevelCompleted { level });
    level::setup_level(world, level + 1)?;
    world.between_levels = true;
    Ok(())
}

fn resolve_camera(world: &mut WorldState) {
    let buffer = world.tuning.camera.buffer;
    world.camera.follow_pair(&mut world.actors, world.map_width, buffer);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layer::TILE;
    use crate::domain::rules::Cue;
    use crate::sim::level::{setup_level, test_world};
    use crate::sim::world::GameState;

    const DT: f32 = 1.0 / 60.0;

    /// Stand an actor on the tile grid: column `col`, feet at `row` tiles
    /// above the map bottom.
    fn place(world: &mut WorldState, id: PlayerId, col: usize, row: usize) {
        let a = world.actor_mut(id);
        a.x = col as f32 * TILE + TILE / 2.0;
        a.set_bottom(row as f32 * TILE);
        a.dx = 0.0;
        a.dy = 0.0;
    }

    fn run(world: &mut WorldState, ticks: usize) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..ticks {
            all.extend(step(world, DT).unwrap());
        }
        all
    }

    #[test]
    fn coin_counts_once() {
        let mut world = test_world();
        place(&mut world, PlayerId::Fire, 7, 2);
        place(&mut world, PlayerId::Water, 9, 2);
        let coins = world.layers.get(LayerId::Coins).len();

        let events = run(&mut world, 1);
        assert_eq!(world.score, 1);
        assert_eq!(world.layers.get(LayerId::Coins).len(), coins - 1);
        assert_eq!(events, vec![GameEvent::CoinPicked { by: PlayerId::Fire, score: 1 }]);

        let mut last = world.score;
        for _ in 0..30 {
            step(&mut world, DT).unwrap();
            assert!(world.score >= last);
            last = world.score;
        }
        assert_eq!(world.score, 1);
    }

    #[test]
    fn lever_sound_plays_once() {
        let mut world = test_world();
        place(&mut world, PlayerId::Fire, 42, 2);
        place(&mut world, PlayerId::Water, 41, 2);

        let events = run(&mut world, 50);
        let cues: Vec<_> = events.iter().filter(|e| matches!(e, GameEvent::RuleCue { .. })).collect();
        assert_eq!(cues, vec![&GameEvent::RuleCue { rule: "fire lever", cue: Cue::Lever }]);
        assert!(world.layers.is_empty(LayerId::FireWall));
        assert!(world.layers.is_empty(LayerId::Fire));
        assert!(world.layers.is_empty(LayerId::Fire2));
        assert!(world.layers.get(LayerId::FireLeverTurned).iter().all(|o| o.visible));
        assert!(world.layers.get(LayerId::FireLever).iter().all(|o| !o.visible));
    }

    #[test]
    fn water_lever_turns_bridge_solid_for_knight() {
        let mut world = test_world();
        place(&mut world, PlayerId::Water, 22, 2);
        place(&mut world, PlayerId::Fire, 21, 2);
        let platforms = world.layers.get(LayerId::Platforms).len();
        run(&mut world, 1);
        assert!(world.layers.is_empty(LayerId::Bridge));
        assert!(world.layers.is_empty(LayerId::WaterWall));
        assert_eq!(world.layers.get(LayerId::Platforms).len(), platforms + 8);

        // Knight now stands above the pool instead of sinking into it.
        place(&mut world, PlayerId::Fire, 15, 3);
        place(&mut world, PlayerId::Water, 16, 3);
        run(&mut world, 40);
        assert_eq!(world.actor(PlayerId::Fire).bottom(), 2.0 * TILE);
    }

    #[test]
    fn knight_sinks_into_water_priestess_does_not() {
        let mut world = test_world();
        world.layers.clear(LayerId::WaterWall);
        place(&mut world, PlayerId::Fire, 15, 3);
        place(&mut world, PlayerId::Water, 17, 3);
        run(&mut world, 40);
        assert_eq!(world.actor(PlayerId::Fire).bottom(), TILE);
        assert_eq!(world.actor(PlayerId::Water).bottom(), 2.0 * TILE);
    }

    #[test]
    fn right_edge_is_clamped() {
        let mut world = test_world();
        place(&mut world, PlayerId::Fire, 49, 2);
        place(&mut world, PlayerId::Water, 45, 2);
        world.actor_mut(PlayerId::Fire).x = 3190.0;
        world.actor_mut(PlayerId::Fire).dx = 5.0;
        run(&mut world, 1);
        assert!(world.actor(PlayerId::Fire).right() <= world.map_width);
        run(&mut world, 10);
        assert_eq!(world.actor(PlayerId::Fire).right(), world.map_width);
    }

    #[test]
    fn left_bound_holds() {
        let mut world = test_world();
        place(&mut world, PlayerId::Fire, 5, 2);
        world.actor_mut(PlayerId::Fire).dx = -5.0;
        run(&mut world, 100);
        assert_eq!(world.actor(PlayerId::Fire).left(), world.leftmost_x);
        assert_eq!(world.leftmost_x, -24.0);
    }

    #[test]
    fn level_two_spawns_are_not_clamped() {
        let mut world = test_world();
        setup_level(&mut world, 2).unwrap();
        run(&mut world, 1);
        assert_eq!(world.actor(PlayerId::Fire).x, 200.0);
        assert_eq!(world.actor(PlayerId::Water).x, 300.0);
    }

    #[test]
    fn non_final_exit_advances_one_level() {
        let mut world = test_world();
        world.score = 4;
        place(&mut world, PlayerId::Fire, 47, 2);
        place(&mut world, PlayerId::Water, 47, 2);
        let events = run(&mut world, 1);
        assert!(events.contains(&GameEvent::LevelCompleted { level: 1 }));
        assert_eq!(world.current_level, 2);
        assert!(world.between_levels);
        assert!(!world.game_ended);
        assert_eq!(world.score, 4);
        assert!(world.layers.contains(LayerId::WallWater));
    }

    #[test]
    fn one_actor_on_exit_is_not_enough() {
        let mut world = test_world();
        place(&mut world, PlayerId::Fire, 47, 2);
        place(&mut world, PlayerId::Water, 44, 2);
        run(&mut world, 1);
        assert_eq!(world.current_level, 1);
    }

    #[test]
    fn final_exit_ends_game_once() {
        let mut world = test_world();
        setup_level(&mut world, 2).unwrap();
        place(&mut world, PlayerId::Fire, 46, 2);
        place(&mut world, PlayerId::Water, 46, 2);
        let events = run(&mut world, 5);
        assert!(world.game_ended);
        assert_eq!(world.current_level, 2);
        let done: Vec<_> = events.iter().filter(|e| matches!(e, GameEvent::GameCompleted { .. })).collect();
        assert_eq!(done.len(), 1);
    }

    #[test]
    fn paused_world_only_decays_banners() {
        let mut world = test_world();
        world.state = GameState::Paused;
        world.arm_save_banner();
        place(&mut world, PlayerId::Fire, 10, 6);
        let y = world.actor(PlayerId::Fire).y;
        assert!(run(&mut world, 30).is_empty());
        assert_eq!(world.actor(PlayerId::Fire).y, y);
        assert!(world.save_banner < 2.0 && world.save_banner > 1.0);
        assert_eq!(world.tick, 0);
    }

    #[test]
    fn airborne_is_jump_and_landing_walks() {
        let mut world = test_world();
        place(&mut world, PlayerId::Fire, 6, 5);
        place(&mut world, PlayerId::Water, 8, 2);
        run(&mut world, 1);
        assert_eq!(world.actor(PlayerId::Fire).state(), AnimState::Jump);
        world.actor_mut(PlayerId::Fire).dx = 1.0;
        run(&mut world, 40);
        assert_eq!(world.actor(PlayerId::Fire).state(), AnimState::Walk);

        place(&mut world, PlayerId::Fire, 6, 4);
        run(&mut world, 40);
        assert_eq!(world.actor(PlayerId::Fire).state(), AnimState::Idle);
    }

    #[test]
    fn knight_surfs_through_fire_zone() {
        let mut world = test_world();
        place(&mut world, PlayerId::Fire, 37, 4);
        place(&mut world, PlayerId::Water, 33, 2);
        world.actor_mut(PlayerId::Fire).dx = 0.5;
        run(&mut world, 30);
        let knight = world.actor(PlayerId::Fire);
        assert!(knight.on_special_surface);
        assert_eq!(knight.state(), AnimState::Surf);
    }

    #[test]
    fn knight_attack_breaks_plant_wall_after_animation() {
        let mut world = test_world();
        setup_level(&mut world, 2).unwrap();
        place(&mut world, PlayerId::Fire, 13, 2);
        place(&mut world, PlayerId::Water, 12, 2);
        run(&mut world, 1);
        world.actor_mut(PlayerId::Fire).facing_right = true;
        world.actor_mut(PlayerId::Fire).anim.lock_attack();

        let events = run(&mut world, 5);
        assert!(world.actor(PlayerId::Fire).hit_object);
        assert!(!world.layers.is_empty(LayerId::Wall));
        assert!(events.is_empty());

        let events = run(&mut world, 40);
        assert!(world.layers.is_empty(LayerId::Wall));
        assert!(world.layers.get(LayerId::Plants).iter().all(|o| !o.visible));
        assert!(!world.actor(PlayerId::Fire).hit_object);
        assert_eq!(
            events,
            vec![
                GameEvent::WallBroken { rule: "plant wall" },
                GameEvent::RuleCue { rule: "plant wall", cue: Cue::Shatter },
            ]
        );
    }

    #[test]
    fn attack_facing_left_does_nothing() {
        let mut world = test_world();
        setup_level(&mut world, 2).unwrap();
        place(&mut world, PlayerId::Fire, 13, 2);
        place(&mut world, PlayerId::Water, 12, 2);
        world.actor_mut(PlayerId::Fire).facing_right = false;
        world.actor_mut(PlayerId::Fire).anim.lock_attack();
        run(&mut world, 60);
        assert!(!world.layers.is_empty(LayerId::Wall));
    }

    #[test]
    fn attack_in_open_ground_breaks_nothing() {
        let mut world = test_world();
        setup_level(&mut world, 2).unwrap();
        place(&mut world, PlayerId::Fire, 20, 2);
        place(&mut world, PlayerId::Water, 18, 2);
        run(&mut world, 1);
        world.actor_mut(PlayerId::Fire).facing_right = true;
        world.actor_mut(PlayerId::Fire).anim.lock_attack();
        world.actor_mut(PlayerId::Water).facing_right = true;
        world.actor_mut(PlayerId::Water).anim.lock_attack();

        let events = run(&mut world, 60);
        for id in PlayerId::BOTH {
            assert!(!world.actor(id).anim.is_locked());
            assert!(!world.actor(id).hit_object);
        }
        assert!(!world.layers.is_empty(LayerId::Wall));
        assert!(!world.layers.is_empty(LayerId::Wall2));
        assert!(!events
            .iter()
            .any(|e| matches!(e, GameEvent::WallBroken { .. } | GameEvent::RuleCue { .. })));
    }

    #[test]
    fn priestess_attack_freezes_water() {
        let mut world = test_world();
        setup_level(&mut world, 2).unwrap();
        place(&mut world, PlayerId::Water, 28, 2);
        place(&mut world, PlayerId::Fire, 27, 2);
        world.actor_mut(PlayerId::Water).facing_right = true;
        world.actor_mut(PlayerId::Water).anim.lock_attack();
        run(&mut world, 60);
        assert!(world.layers.is_empty(LayerId::Wall2));
        assert!(world.layers.get(LayerId::Water).iter().all(|o| !o.visible));
        for id in [LayerId::WaterFrozen, LayerId::WaterFrozen2, LayerId::WaterFrozen3] {
            assert!(world.layers.get(id).iter().all(|o| o.visible));
        }
        assert!(!world.layers.is_empty(LayerId::Wall));
    }

    #[test]
    fn camera_stays_in_bounds_while_playing() {
        let mut world = test_world();
        place(&mut world, PlayerId::Fire, 30, 2);
        place(&mut world, PlayerId::Water, 33, 2);
        world.actor_mut(PlayerId::Fire).dx = 5.0;
        world.actor_mut(PlayerId::Water).dx = 5.0;
        for _ in 0..200 {
            step(&mut world, DT).unwrap();
            assert!(world.camera.x >= 0.0);
            assert!(world.camera.x <= world.camera.max_x(world.map_width));
            assert_eq!(world.camera.y, 0.0);
        }
    }
}
