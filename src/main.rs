/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::path::Path;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::actor::PlayerId;
use domain::anim::AnimationSet;
use domain::rules::Cue;
use error::AppError;
use sim::control;
use sim::event::GameEvent;
use sim::level::{start_session, LevelLibrary};
use sim::save;
use sim::step;
use sim::world::WorldState;
use ui::gamepad::GamepadState;
use ui::input::{Action, InputState, Meta};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_tracing(&config.log_file);
    match &config.source {
        Some(path) => tracing::info!(path = %path.display(), "config loaded"),
        None => tracing::info!("no config.toml found, using defaults"),
    }
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    // Level data is validated before the terminal is touched, so a broken
    // level file is reported on a normal screen.
    let mut world = match build_world(&config) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("Startup failed: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();
    let honor_release = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            let _ = renderer.cleanup();
            tracing::error!(error = %e, "terminal init failed");
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config, honor_release);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        tracing::error!(error = %e, "game aborted");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Twin Elements!");
    println!("Final Score: {}", world.score);
}

/// Log to a file: the terminal belongs to the game.
fn init_tracing(log_file: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file = match std::fs::OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}; logging disabled", log_file.display());
            return;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

fn build_world(config: &GameConfig) -> Result<WorldState, AppError> {
    let library = Rc::new(LevelLibrary::load(&config.levels_dir)?);

    let frames = PlayerId::BOTH.map(|id| {
        let fallback = match id {
            PlayerId::Fire => AnimationSet::fire_knight(),
            PlayerId::Water => AnimationSet::water_priestess(),
        };
        Rc::new(AnimationSet::load_or(&config.characters_dir.join(id.asset_dir()), fallback))
    });

    let mut world = WorldState::new(library, frames, config);
    start_session(&mut world)?;
    Ok(world)
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    honor_release: bool,
) -> Result<(), AppError> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = config.tick();
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        let metas: Vec<Meta> = kb.metas().iter().chain(gp.metas()).copied().collect();
        for meta in metas {
            if handle_meta(world, meta, config) {
                return Ok(());
            }
        }

        let actions: Vec<Action> = kb.actions().iter().chain(gp.actions()).copied().collect();
        for action in actions {
            let events = match action {
                Action::Press(id, c) => control::press(world, id, c),
                Action::Release(id, c) => {
                    control::release(world, id, c);
                    vec![]
                }
            };
            process_sound_events(sound, &events);
        }

        if last_tick.elapsed() >= tick_rate {
            let dt = last_tick.elapsed().as_secs_f32();
            last_tick = Instant::now();
            let events = step::step(world, dt)?;
            process_sound_events(sound, &events);
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }
}

/// Returns true when the player asked to quit.
fn handle_meta(world: &mut WorldState, meta: Meta, config: &GameConfig) -> bool {
    match meta {
        Meta::Quit => return true,
        Meta::Pause => control::toggle_pause(world),
        Meta::Continue => {
            control::continue_game(world);
        }
        Meta::Save => {
            if let Err(e) = save::save(world, &config.save_file) {
                tracing::warn!(error = %e, "save failed");
                world.set_message(&format!("Save failed: {e}"));
            }
        }
        Meta::Load => {
            if let Err(e) = save::load(world, &config.save_file) {
                tracing::warn!(error = %e, "load failed");
                world.set_message(&format!("Load failed: {e}"));
            }
        }
    }
    false
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    for ev in events {
        tracing::debug!(event = ?ev, "game event");
        let Some(sfx) = sound else { continue };
        match ev {
            GameEvent::Jumped(_) => sfx.play_jump(),
            GameEvent::CoinPicked { .. } => sfx.play_coin(),
            GameEvent::RuleCue { cue: Cue::Lever, .. } => sfx.play_lever(),
            GameEvent::RuleCue { cue: Cue::Shatter, .. } => sfx.play_shatter(),
            GameEvent::WallBroken { .. } => {}
            GameEvent::LevelCompleted { .. } => sfx.play_level_complete(),
            GameEvent::GameCompleted { .. } => sfx.play_game_complete(),
        }
    }
}
