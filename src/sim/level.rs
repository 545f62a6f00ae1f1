/// Level loader and level-session setup.
///
/// ## Sources (priority order):
///   1. `level<N>.txt` in the configured levels directory
///   2. Built-in embedded levels
///
/// Every level is parsed and validated when the library loads, so a
/// broken override is reported at startup rather than at the exit of the
/// previous level.
///
/// ## Level format (`.txt`):
///   ```
///   @name Chapter 1: Crystal Caves
///   @background 24,20,48
///   @intro HOW TO PLAY
///   @layer # Platforms
///   @layer = Bridge hidden
///   <map rows, row 0 = top>
///   ---
///   <overlay rows, same coordinates>
///   ```
///
/// `@layer <glyph> <Layer Name> [hidden]` binds a glyph to a layer and
/// declares it, even if no cell uses the glyph. Each glyph cell becomes one
/// 64×64 object. `.` and space are empty. Planes separated by `---`
/// overlay each other, so one cell can hold objects of several layers.

use std::path::Path;
use std::rc::Rc;

use crate::domain::actor::PlayerId;
use crate::domain::layer::{LayerId, LayerSet, LevelObject, Rect, TILE};
use crate::domain::physics::Platformer;
use crate::domain::rules::{self, LevelRules, FINAL_LEVEL};
use crate::error::LevelError;
use super::world::{GameState, WorldState};

/// Glyph binding from a `@layer` line.
#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    pub glyph: char,
    pub layer: LayerId,
    pub hidden: bool,
}

/// Parsed level data.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub number: u32,
    pub name: String,
    pub background: (u8, u8, u8),
    pub intro: Vec<String>,
    pub legend: Vec<Glyph>,
    pub planes: Vec<Vec<String>>,
}

impl LevelDef {
    /// Widest row of the base plane.
    pub fn columns(&self) -> usize {
        self.planes
            .first()
            .map(|p| p.iter().map(|r| r.chars().count()).max().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn rows(&self) -> usize {
        self.planes.first().map_or(0, |p| p.len())
    }

    fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.legend.iter().find(|g| g.glyph == ch)
    }

    /// Fresh layer set for this level: declared layers plus one object per
    /// glyph cell.
    pub fn build_layers(&self) -> LayerSet {
        let mut layers = LayerSet::new();
        for g in &self.legend {
            layers.declare(g.layer);
        }
        let rows = self.rows();
        for plane in &self.planes {
            for (r, row) in plane.iter().enumerate() {
                for (c, ch) in row.chars().enumerate() {
                    if let Some(g) = self.glyph(ch) {
                        layers.push(g.layer, LevelObject {
                            rect: Rect::tile(c, rows - 1 - r),
                            visible: !g.hidden,
                            origin: g.layer,
                        });
                    }
                }
            }
        }
        layers
    }
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

pub fn parse_level(number: u32, content: &str) -> Result<LevelDef, LevelError> {
    let malformed = |reason: String| LevelError::Malformed { level: number, reason };

    let mut def = LevelDef {
        number,
        name: format!("Level {number}"),
        background: (0, 0, 0),
        intro: vec![],
        legend: vec![],
        planes: vec![vec![]],
    };

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if let Some(directive) = line.strip_prefix('@') {
            let (key, rest) = directive.split_once(' ').unwrap_or((directive, ""));
            match key {
                "name" => def.name = rest.trim().to_string(),
                "intro" => def.intro.push(rest.trim().to_string()),
                "background" => {
                    def.background = parse_rgb(rest)
                        .ok_or_else(|| malformed(format!("line {}: bad background `{rest}`", lineno + 1)))?;
                }
                "layer" => {
                    let g = parse_glyph(number, rest)?;
                    if def.legend.iter().any(|other| other.glyph == g.glyph) {
                        return Err(malformed(format!("glyph `{}` bound twice", g.glyph)));
                    }
                    def.legend.push(g);
                }
                other => return Err(malformed(format!("line {}: unknown directive @{other}", lineno + 1))),
            }
        } else if line.trim() == "---" {
            def.planes.push(vec![]);
        } else if !line.is_empty() {
            if let Some(plane) = def.planes.last_mut() {
                plane.push(line.to_string());
            }
        }
    }

    // Drop empty planes (e.g. a trailing separator).
    def.planes.retain(|p| !p.is_empty());
    if def.planes.is_empty() {
        return Err(malformed("no map rows".into()));
    }

    let rows = def.rows();
    for (i, plane) in def.planes.iter().enumerate() {
        if plane.len() > rows {
            return Err(malformed(format!("plane {} has {} rows, base has {rows}", i + 1, plane.len())));
        }
        for (r, row) in plane.iter().enumerate() {
            for (c, ch) in row.chars().enumerate() {
                if ch != '.' && ch != ' ' && def.glyph(ch).is_none() {
                    return Err(malformed(format!("unbound glyph `{ch}` at row {r}, column {c}")));
                }
            }
        }
    }

    Ok(def)
}

fn parse_glyph(level: u32, binding: &str) -> Result<Glyph, LevelError> {
    let mut chars = binding.chars();
    let glyph = chars.next().ok_or_else(|| LevelError::Malformed {
        level,
        reason: "@layer needs a glyph".into(),
    })?;
    let mut name = chars.as_str().trim();
    let hidden = match name.strip_suffix(" hidden") {
        Some(stripped) => {
            name = stripped.trim_end();
            true
        }
        None => false,
    };
    let layer = LayerId::from_name(name).ok_or_else(|| LevelError::UnknownLayer {
        level,
        name: name.to_string(),
    })?;
    Ok(Glyph { glyph, layer, hidden })
}

fn parse_rgb(text: &str) -> Option<(u8, u8, u8)> {
    let parts: Vec<u8> = text
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts[..] {
        [r, g, b] => Some((r, g, b)),
        _ => None,
    }
}

/// Every layer the rules and bindings need must be declared.
pub fn validate_layers(level: u32, layers: &LayerSet, rules: &LevelRules) -> Result<(), LevelError> {
    for id in rules.referenced_layers() {
        if !layers.contains(id) {
            return Err(LevelError::MissingLayer { level, layer: id.name() });
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Library
// ══════════════════════════════════════════════════════════════

fn embedded_source(level: u32) -> Option<&'static str> {
    match level {
        1 => Some(include_str!("../../assets/levels/level1.txt")),
        2 => Some(include_str!("../../assets/levels/level2.txt")),
        _ => None,
    }
}

/// All levels of the game, parsed and validated.
#[derive(Debug)]
pub struct LevelLibrary {
    levels: Vec<LevelDef>,
}

impl LevelLibrary {
    /// Built-in levels, with `level<N>.txt` overrides from `levels_dir`.
    pub fn load(levels_dir: &Path) -> Result<Self, LevelError> {
        let mut sources = Vec::new();
        for n in 1..=FINAL_LEVEL {
            let path = levels_dir.join(format!("level{n}.txt"));
            if path.is_file() {
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| LevelError::Io { path: path.clone(), source })?;
                tracing::info!(level = n, path = %path.display(), "level override");
                sources.push((n, text));
            } else {
                let text = embedded_source(n).ok_or(LevelError::UnknownLevel(n))?;
                sources.push((n, text.to_string()));
            }
        }
        LevelLibrary::from_sources(sources)
    }

    #[cfg(test)]
    pub fn embedded() -> Result<Self, LevelError> {
        let sources = (1..=FINAL_LEVEL)
            .map(|n| embedded_source(n).map(|t| (n, t.to_string())).ok_or(LevelError::UnknownLevel(n)))
            .collect::<Result<Vec<_>, _>>()?;
        LevelLibrary::from_sources(sources)
    }

    /// Parse and validate `(level number, text)` pairs.
    pub fn from_sources(sources: Vec<(u32, String)>) -> Result<Self, LevelError> {
        let mut levels = Vec::with_capacity(sources.len());
        for (n, text) in sources {
            let def = parse_level(n, &text)?;
            let rules = rules::rules_for_level(n).ok_or(LevelError::UnknownLevel(n))?;
            validate_layers(n, &def.build_layers(), &rules)?;
            levels.push(def);
        }
        Ok(LevelLibrary { levels })
    }

    pub fn get(&self, level: u32) -> Result<&LevelDef, LevelError> {
        self.levels
            .iter()
            .find(|d| d.number == level)
            .ok_or(LevelError::UnknownLevel(level))
    }
}

// ══════════════════════════════════════════════════════════════
// Session setup
// ══════════════════════════════════════════════════════════════

/// Install `level` into the world: fresh layers, bindings and spawns.
/// On error the world is left exactly as it was.
pub fn setup_level(world: &mut WorldState, level: u32) -> Result<(), LevelError> {
    let library = Rc::clone(&world.library);
    let def = library.get(level)?;
    let rules = rules::rules_for_level(level).ok_or(LevelError::UnknownLevel(level))?;
    let layers = def.build_layers();
    validate_layers(level, &layers, &rules)?;

    let gravity = world.tuning.physics.gravity;
    let speed = world.tuning.physics.move_speed;

    world.current_level = level;
    world.level_name = def.name.clone();
    world.intro = def.intro.clone();
    world.background = def.background;
    world.layers = layers;
    world.map_width = def.columns() as f32 * TILE;
    world.map_height = def.rows() as f32 * TILE;
    world.physics = [
        Platformer::new(rules.solids[PlayerId::Fire.index()].clone(), gravity),
        Platformer::new(rules.solids[PlayerId::Water.index()].clone(), gravity),
    ];
    for id in PlayerId::BOTH {
        let i = id.index();
        let (x, y) = rules.spawns[i];
        let dx = world.intents[i].velocity(speed);
        let actor = &mut world.actors[i];
        actor.x = x;
        actor.y = y;
        actor.dx = dx;
        actor.dy = 0.0;
        actor.hit_object = false;
        actor.on_special_surface = false;
    }
    world.rules = rules;
    world.camera.x = 0.0;
    world.camera.y = 0.0;

    tracing::info!(level, name = %world.level_name, width = world.map_width, "level ready");
    Ok(())
}

/// Begin a new game on level 1, showing its interstitial first.
pub fn start_session(world: &mut WorldState) -> Result<(), LevelError> {
    // Taken before any level places the actors: the left edge of an actor
    // centered on the origin. Every level shares it.
    let leftmost_x = world
        .actors
        .iter()
        .map(|a| -a.width / 2.0)
        .fold(f32::INFINITY, f32::min);
    setup_level(world, 1)?;
    world.score = 0;
    world.between_levels = true;
    world.game_ended = false;
    world.state = GameState::Running;
    world.cues_played.clear();
    world.end_sound_played = false;
    world.tick = 0;
    world.leftmost_x = leftmost_x;
    Ok(())
}

/// A world on level 1 built from the embedded levels, past its
/// interstitial.
#[cfg(test)]
pub(crate) fn test_world() -> WorldState {
    use crate::config::GameConfig;
    use crate::domain::anim::AnimationSet;

    let config = GameConfig::default();
    let library = Rc::new(LevelLibrary::embedded().unwrap());
    let frames = [
        Rc::new(AnimationSet::fire_knight()),
        Rc::new(AnimationSet::water_priestess()),
    ];
    let mut world = WorldState::new(library, frames, &config);
    start_session(&mut world).unwrap();
    world.between_levels = false;
    world
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = "\
@name Tiny
@layer # Platforms
@layer o Coins
@layer E Exit
@layer ~ Water
@layer = Bridge hidden
....
.o.E
####
---
....
....
.==.
";

    #[test]
    fn embedded_levels_validate() {
        let lib = LevelLibrary::embedded().unwrap();
        let one = lib.get(1).unwrap();
        assert_eq!(one.name, "Chapter 1: Crystal Caves");
        assert_eq!(one.columns(), 50);
        assert_eq!(one.rows(), 12);
        assert_eq!(lib.get(2).unwrap().intro[0], "SPECIAL ATTACK UNLOCKED!");
        assert!(matches!(lib.get(3), Err(LevelError::UnknownLevel(3))));
    }

    #[test]
    fn planes_overlay_and_rows_count_from_bottom() {
        let def = parse_level(1, TINY).unwrap();
        let layers = def.build_layers();
        assert_eq!(layers.get(LayerId::Platforms).len(), 4);
        assert_eq!(layers.get(LayerId::Platforms)[0].rect, Rect::tile(0, 0));
        assert_eq!(layers.get(LayerId::Coins)[0].rect, Rect::tile(1, 1));
        let bridge = layers.get(LayerId::Bridge);
        assert_eq!(bridge.len(), 2);
        assert!(bridge.iter().all(|o| !o.visible && o.rect.bottom == 0.0));
        assert!(layers.contains(LayerId::Water));
        assert!(layers.is_empty(LayerId::Water));
    }

    #[test]
    fn unknown_layer_name_is_rejected() {
        let err = parse_level(1, "@layer # Lava\n####\n").unwrap_err();
        assert!(matches!(err, LevelError::UnknownLayer { level: 1, ref name } if name == "Lava"));
    }

    #[test]
    fn unbound_glyph_is_rejected() {
        let err = parse_level(2, "@layer # Platforms\n#X#\n").unwrap_err();
        assert!(matches!(err, LevelError::Malformed { level: 2, .. }));
    }

    #[test]
    fn overlay_taller_than_base_is_rejected() {
        let err = parse_level(1, "@layer # Platforms\n##\n---\n..\n..\n").unwrap_err();
        assert!(matches!(err, LevelError::Malformed { .. }));
    }

    #[test]
    fn background_must_be_three_bytes() {
        assert!(parse_level(1, "@background 1,2\n#\n").is_err());
        assert!(parse_level(1, "@background 1,2,300\n#\n").is_err());
        assert_eq!(parse_rgb("10, 20, 30"), Some((10, 20, 30)));
    }

    #[test]
    fn missing_referenced_layer_is_fatal() {
        let err = LevelLibrary::from_sources(vec![(1, TINY.to_string())]).unwrap_err();
        assert!(matches!(err, LevelError::MissingLayer { level: 1, .. }));
    }

    #[test]
    fn directory_override_replaces_embedded_level() {
        let dir = tempfile::tempdir().unwrap();
        let custom = embedded_source(2).unwrap().replace("Forest of Illusion", "Custom Grove");
        std::fs::write(dir.path().join("level2.txt"), custom).unwrap();
        let lib = LevelLibrary::load(dir.path()).unwrap();
        assert_eq!(lib.get(1).unwrap().name, "Chapter 1: Crystal Caves");
        assert_eq!(lib.get(2).unwrap().name, "Chapter 2: Custom Grove");
    }

    #[test]
    fn broken_override_fails_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let broken = embedded_source(1).unwrap().replace("@layer ! Fire Wall\n", "");
        std::fs::write(dir.path().join("level1.txt"), broken).unwrap();
        assert!(LevelLibrary::load(dir.path()).is_err());
    }

    #[test]
    fn session_starts_on_level_one_interstitial() {
        let config = crate::config::GameConfig::default();
        let lib = Rc::new(LevelLibrary::embedded().unwrap());
        let frames = [
            Rc::new(crate::domain::anim::AnimationSet::fire_knight()),
            Rc::new(crate::domain::anim::AnimationSet::water_priestess()),
        ];
        let mut world = WorldState::new(lib, frames, &config);
        start_session(&mut world).unwrap();
        assert_eq!(world.current_level, 1);
        assert!(world.between_levels);
        assert_eq!(world.leftmost_x, -24.0);
        assert_eq!(world.map_width, 3200.0);
        assert_eq!((world.actors[0].x, world.actors[0].y), (360.0, 768.0));
        assert_eq!((world.actors[1].x, world.actors[1].y), (480.0, 768.0));
    }

    #[test]
    fn setup_installs_level_two_bindings() {
        let mut world = test_world();
        world.intents[1].right = true;
        world.actors[0].dy = -7.0;
        world.actors[0].hit_object = true;
        setup_level(&mut world, 2).unwrap();
        assert_eq!(world.current_level, 2);
        assert!(world.physics[0].solids.contains(&LayerId::WaterFrozen));
        assert!(world.layers.contains(LayerId::WallPlants));
        assert_eq!(world.actors[0].dy, 0.0);
        assert!(!world.actors[0].hit_object);
        assert_eq!(world.actors[1].dx, 5.0);
        assert_eq!((world.actors[0].x, world.actors[1].x), (200.0, 300.0));
        assert_eq!(world.leftmost_x, -24.0);
    }

    #[test]
    fn failed_setup_leaves_world_untouched() {
        let mut world = test_world();
        world.actors[0].x = 999.0;
        assert!(setup_level(&mut world, 7).is_err());
        assert_eq!(world.current_level, 1);
        assert_eq!(world.actors[0].x, 999.0);
        assert!(world.layers.contains(LayerId::FireWall));
    }
}
