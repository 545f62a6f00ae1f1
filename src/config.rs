/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing or incomplete.
///
/// Logging is not up yet when the config is read (the log file path lives
/// in the config), so problems are collected in `warnings` and logged by
/// the caller once tracing is initialized.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub levels_dir: PathBuf,
    pub characters_dir: PathBuf,
    pub save_file: PathBuf,
    pub log_file: PathBuf,
    pub tick_rate_ms: u64,
    pub physics: PhysicsConfig,
    pub animation_speed: u32,
    pub camera: CameraConfig,
    pub gamepad: GamepadConfig,
    /// File the settings came from; `None` means built-in defaults.
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub move_speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    /// Hysteresis: the camera stops following once the actors are further
    /// apart than `viewport_width - buffer`.
    pub buffer: f32,
    pub viewport_width: f32,
    pub banner_seconds: f32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub attack: Vec<String>,
    pub pause: Vec<String>,
    pub confirm: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    animation: TomlAnimation,
    #[serde(default)]
    camera: TomlCamera,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_characters_dir")]
    characters_dir: String,
    #[serde(default = "default_save_file")]
    save_file: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_move_speed")]
    move_speed: f32,
    #[serde(default = "default_jump_speed")]
    jump_speed: f32,
    #[serde(default = "default_gravity")]
    gravity: f32,
}

#[derive(Deserialize, Debug)]
struct TomlAnimation {
    #[serde(default = "default_anim_speed")]
    speed: u32,
}

#[derive(Deserialize, Debug)]
struct TomlCamera {
    #[serde(default = "default_buffer")]
    buffer: f32,
    #[serde(default = "default_viewport_width")]
    viewport_width: f32,
    #[serde(default = "default_banner_seconds")]
    banner_seconds: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump")]
    jump: Vec<String>,
    #[serde(default = "default_attack")]
    attack: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
}

// ── Defaults ──

fn default_levels_dir() -> String { "levels".into() }
fn default_characters_dir() -> String { "characters".into() }
fn default_save_file() -> String { "savegame.toml".into() }
fn default_log_file() -> String { "twin-elements.log".into() }
fn default_tick_rate() -> u64 { 16 }   // ~60 steps per second

fn default_move_speed() -> f32 { 5.0 }
fn default_jump_speed() -> f32 { 20.0 }
fn default_gravity() -> f32 { 1.0 }
fn default_anim_speed() -> u32 { 10 }

fn default_buffer() -> f32 { 100.0 }
fn default_viewport_width() -> f32 { 1080.0 }
fn default_banner_seconds() -> f32 { 2.0 }

fn default_jump() -> Vec<String> { vec!["A".into()] }
fn default_attack() -> Vec<String> { vec!["X".into(), "B".into(), "R1".into()] }
fn default_pause() -> Vec<String> { vec!["Select".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            characters_dir: default_characters_dir(),
            save_file: default_save_file(),
            log_file: default_log_file(),
            tick_rate_ms: default_tick_rate(),
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            move_speed: default_move_speed(),
            jump_speed: default_jump_speed(),
            gravity: default_gravity(),
        }
    }
}

impl Default for TomlAnimation {
    fn default() -> Self {
        TomlAnimation { speed: default_anim_speed() }
    }
}

impl Default for TomlCamera {
    fn default() -> Self {
        TomlCamera {
            buffer: default_buffer(),
            viewport_width: default_viewport_width(),
            banner_seconds: default_banner_seconds(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump(),
            attack: default_attack(),
            pause: default_pause(),
            confirm: default_confirm(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let (toml_cfg, source) = load_toml(&search_dirs, &mut warnings);
        GameConfig::resolve(toml_cfg, source, warnings, &search_dirs)
    }

    /// Parse config text directly. Relative paths stay relative.
    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::resolve(cfg, None, vec![], &[]))
    }

    fn resolve(
        cfg: TomlConfig,
        source: Option<PathBuf>,
        warnings: Vec<String>,
        search_dirs: &[PathBuf],
    ) -> Self {
        GameConfig {
            levels_dir: resolve_dir(&cfg.general.levels_dir, search_dirs),
            characters_dir: resolve_dir(&cfg.general.characters_dir, search_dirs),
            save_file: PathBuf::from(cfg.general.save_file),
            log_file: PathBuf::from(cfg.general.log_file),
            tick_rate_ms: cfg.general.tick_rate_ms.max(1),
            physics: PhysicsConfig {
                move_speed: cfg.physics.move_speed,
                jump_speed: cfg.physics.jump_speed,
                gravity: cfg.physics.gravity,
            },
            animation_speed: cfg.animation.speed.max(1),
            camera: CameraConfig {
                buffer: cfg.camera.buffer,
                viewport_width: cfg.camera.viewport_width,
                banner_seconds: cfg.camera.banner_seconds,
            },
            gamepad: GamepadConfig {
                jump: cfg.gamepad.jump,
                attack: cfg.gamepad.attack,
                pause: cfg.gamepad.pause,
                confirm: cfg.gamepad.confirm,
            },
            source,
            warnings,
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::resolve(TomlConfig::default(), None, vec![], &[])
    }
}

/// A relative data directory resolves against the first candidate dir that
/// contains it, else stays relative to CWD.
fn resolve_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// First `config.toml` found wins; a broken one means defaults.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> (TomlConfig, Option<PathBuf>) {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match read_toml(&path) {
            Ok(cfg) => return (cfg, Some(path)),
            Err(e) => {
                warnings.push(format!("{}: {e}; using default settings", path.display()));
                return (TomlConfig::default(), None);
            }
        }
    }
    (TomlConfig::default(), None)
}

fn read_toml(path: &Path) -> Result<TomlConfig, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    toml::from_str::<TomlConfig>(&text).map_err(|e| e.to_string())
}
