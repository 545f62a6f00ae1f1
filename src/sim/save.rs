/// Save and load session progress (single snapshot file).
///
/// ## What is stored:
///   level, score, leftmost x, map width, session flags and both actor
///   positions. On load the level is rebuilt from its data first, then the
///   stored values are written over it.
///
/// ## What is not stored:
///   animation state, trigger latches and layer mutations. A loaded level
///   starts with its geometry as authored.
///
/// ## File format:
///   TOML, tagged with `version`. Other versions are refused.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::actor::PlayerId;
use crate::error::SaveError;
use super::level::setup_level;
use super::world::{GameState, WorldState};

pub const SNAPSHOT_VERSION: u32 = 1;

// ══════════════════════════════════════════════════════════════
// Public types
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Persisted subset of the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub level: u32,
    pub score: u32,
    pub leftmost_x: f32,
    pub map_width: f32,
    pub between_levels: bool,
    pub game_ended: bool,
    pub state: GameState,
    pub fire: Position,
    pub water: Position,
}

impl Snapshot {
    fn position(&self, id: PlayerId) -> Position {
        match id {
            PlayerId::Fire => self.fire,
            PlayerId::Water => self.water,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Snapshot capture / restore (WorldState ↔ Snapshot)
// ══════════════════════════════════════════════════════════════

pub fn capture_snapshot(w: &WorldState) -> Snapshot {
    let pos = |id| {
        let a = w.actor(id);
        Position { x: a.x, y: a.y }
    };
    Snapshot {
        version: SNAPSHOT_VERSION,
        level: w.current_level,
        score: w.score,
        leftmost_x: w.leftmost_x,
        map_width: w.map_width,
        between_levels: w.between_levels,
        game_ended: w.game_ended,
        state: w.state,
        fire: pos(PlayerId::Fire),
        water: pos(PlayerId::Water),
    }
}

/// Rebuild the snapshot's level, then overwrite the stored values.
/// If the level cannot be built the world is left as it was.
pub fn restore_snapshot(w: &mut WorldState, snap: &Snapshot) -> Result<(), SaveError> {
    if snap.version != SNAPSHOT_VERSION {
        return Err(SaveError::Version { found: snap.version, expected: SNAPSHOT_VERSION });
    }
    setup_level(w, snap.level)?;

    w.score = snap.score;
    w.leftmost_x = snap.leftmost_x;
    w.map_width = snap.map_width;
    w.between_levels = snap.between_levels;
    w.game_ended = snap.game_ended;
    w.state = snap.state;
    for id in PlayerId::BOTH {
        let p = snap.position(id);
        let a = w.actor_mut(id);
        a.x = p.x;
        a.y = p.y;
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// File operations (Ctrl+S / Ctrl+L)
// ══════════════════════════════════════════════════════════════

pub fn save(w: &mut WorldState, path: &Path) -> Result<(), SaveError> {
    let content = toml::to_string(&capture_snapshot(w))?;
    std::fs::write(path, content)
        .map_err(|source| SaveError::Io { path: path.to_path_buf(), source })?;
    w.arm_save_banner();
    tracing::info!(path = %path.display(), level = w.current_level, "game saved");
    Ok(())
}

/// Read and decode before touching the world: a missing or unreadable
/// file leaves the session as it was.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SaveError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SaveError::NotFound(path.to_path_buf()));
        }
        Err(source) => return Err(SaveError::Io { path: path.to_path_buf(), source }),
    };
    Ok(toml::from_str(&content)?)
}

pub fn load(w: &mut WorldState, path: &Path) -> Result<(), SaveError> {
    let snap = read_snapshot(path)?;
    restore_snapshot(w, &snap)?;
    w.arm_load_banner();
    tracing::info!(path = %path.display(), level = snap.level, "game loaded");
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layer::LayerId;
    use crate::sim::level::test_world;

    #[test]
    fn round_trip_restores_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.toml");

        let mut world = test_world();
        world.score = 7;
        world.actor_mut(PlayerId::Fire).x = 1234.0;
        world.actor_mut(PlayerId::Water).y = 456.0;
        save(&mut world, &path).unwrap();
        assert!(world.save_banner > 0.0);
        let saved = capture_snapshot(&world);

        world.score = 0;
        world.actor_mut(PlayerId::Fire).x = 10.0;
        world.between_levels = true;
        load(&mut world, &path).unwrap();

        assert_eq!(capture_snapshot(&world), saved);
        assert!(world.load_banner > 0.0);
    }

    #[test]
    fn missing_file_leaves_world_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let mut world = test_world();
        world.score = 3;
        let before = capture_snapshot(&world);
        let err = load(&mut world, &path).unwrap_err();
        assert!(matches!(err, SaveError::NotFound(_)));
        assert_eq!(capture_snapshot(&world), before);
        assert_eq!(world.load_banner, 0.0);
    }

    #[test]
    fn level_two_snapshot_rebuilds_level_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.toml");

        let mut snap = capture_snapshot(&test_world());
        snap.level = 2;
        snap.score = 11;
        snap.fire = Position { x: 900.0, y: 300.0 };
        std::fs::write(&path, toml::to_string(&snap).unwrap()).unwrap();

        let mut world = test_world();
        assert!(world.layers.contains(LayerId::FireLever));
        load(&mut world, &path).unwrap();

        assert_eq!(world.current_level, 2);
        assert!(world.layers.contains(LayerId::WallPlants));
        assert!(!world.layers.contains(LayerId::FireLever));
        assert!(world.rules.attack_enabled);
        assert_eq!(world.score, 11);
        // Positions are written after the level's spawns.
        assert_eq!(world.actor(PlayerId::Fire).x, 900.0);
        assert_eq!(world.actor(PlayerId::Fire).y, 300.0);
    }

    #[test]
    fn other_version_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.toml");

        let mut snap = capture_snapshot(&test_world());
        snap.version = 99;
        snap.level = 2;
        std::fs::write(&path, toml::to_string(&snap).unwrap()).unwrap();

        let mut world = test_world();
        let err = load(&mut world, &path).unwrap_err();
        assert!(matches!(err, SaveError::Version { found: 99, expected: 1 }));
        assert_eq!(world.current_level, 1);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.toml");
        std::fs::write(&path, "level = \"two\"").unwrap();

        let mut world = test_world();
        assert!(matches!(load(&mut world, &path), Err(SaveError::Decode(_))));
    }
}
