/// Control handling: per-player presses/releases and meta controls.
///
/// Input is edge-based. A press or release updates the held-key intents,
/// recomputes horizontal velocity and may switch the animation state
/// straight away; the update cycle then takes it from there.
///
/// Movement intents are always tracked, so a key held across a pause or an
/// interstitial still counts afterwards. Everything else (facing, jumps,
/// attacks, animation changes) only happens while gameplay is live.

use crate::domain::actor::PlayerId;
use crate::domain::anim::AnimState;
use crate::domain::physics::PhysicsBinding;
use super::event::GameEvent;
use super::world::{GameState, WorldState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Control {
    Left,
    Right,
    Jump,
    Attack,
}

fn grounded(world: &WorldState, id: PlayerId) -> bool {
    let i = id.index();
    world.physics[i].is_grounded(&world.actors[i], &world.layers)
}

pub fn press(world: &mut WorldState, id: PlayerId, control: Control) -> Vec<GameEvent> {
    let mut events = vec![];
    let i = id.index();
    let live = world.is_live();

    match control {
        Control::Left | Control::Right => {
            let right = control == Control::Right;
            if right {
                world.intents[i].right = true;
            } else {
                world.intents[i].left = true;
            }
            update_speed(world);
            if live {
                world.actors[i].facing_right = right;
                if grounded(world, id) {
                    let actor = &mut world.actors[i];
                    let next = if actor.on_special_surface { AnimState::Surf } else { AnimState::Walk };
                    actor.anim.set_state(next);
                }
            }
        }
        Control::Jump => {
            if !live {
                return events;
            }
            let speed = world.tuning.physics.jump_speed;
            let binding = &world.physics[i];
            let actor = &mut world.actors[i];
            if binding.jump(actor, &world.layers, speed) {
                actor.anim.set_state(AnimState::Jump);
                events.push(GameEvent::Jumped(id));
            }
        }
        Control::Attack => {
            if live && world.rules.attack_enabled {
                world.actors[i].anim.lock_attack();
            }
        }
    }
    events
}

pub fn release(world: &mut WorldState, id: PlayerId, control: Control) {
    let i = id.index();
    match control {
        Control::Left => world.intents[i].left = false,
        Control::Right => world.intents[i].right = false,
        Control::Jump | Control::Attack => return,
    }
    update_speed(world);
    if world.is_live() {
        world.actors[i].anim.set_state(AnimState::Idle);
    }
}

/// Recompute both actors' horizontal velocity from held keys; a grounded
/// actor that stopped goes Idle.
pub fn update_speed(world: &mut WorldState) {
    let speed = world.tuning.physics.move_speed;
    let live = world.is_live();
    for id in PlayerId::BOTH {
        let i = id.index();
        world.actors[i].dx = world.intents[i].velocity(speed);
        if live && world.actors[i].dx == 0.0 && grounded(world, id) {
            world.actors[i].anim.set_state(AnimState::Idle);
        }
    }
}

pub fn toggle_pause(world: &mut WorldState) {
    world.state = match world.state {
        GameState::Running => GameState::Paused,
        GameState::Paused => GameState::Running,
    };
    tracing::debug!(state = ?world.state, "pause toggled");
}

/// Leave the interstitial screen. Returns whether anything changed.
pub fn continue_game(world: &mut WorldState) -> bool {
    if !world.between_levels {
        return false;
    }
    world.between_levels = false;
    tracing::info!(level = world.current_level, "level started");
    true
}
