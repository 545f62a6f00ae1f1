/// Per-actor animation state machine.
///
/// Each actor owns an `Animator` bound to that actor's `AnimationSet`.
/// The set holds, for every state, an ordered sequence of frames; a frame
/// is a base glyph pair plus its horizontally mirrored counterpart used
/// when the actor faces left.
///
/// ## Ticking
///
/// `advance()` runs once per simulation tick. Every `speed` ticks the frame
/// cursor moves forward and wraps at the end of the sequence. Wrapping
/// out of Attack releases the lock and drops back to Idle.
///
/// ## Locking
///
/// While an attack plays the animator is locked: `set_state` is a no-op,
/// whoever calls it. Only the attack's own wraparound unlocks it.
///
/// ## Frame assets
///
/// `AnimationSet::discover` probes `<dir>/<state>/<state>_<n>.txt` for
/// n = 1, 2, … and stops at the first missing file.

use std::io::ErrorKind;
use std::path::Path;
use std::rc::Rc;

/// Glyph drawn for a state with no frames at all.
pub const FALLBACK_GLYPH: &str = "??";

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AnimState {
    Idle,
    Walk,
    Jump,
    Surf,
    Attack,
}

impl AnimState {
    pub const ALL: [AnimState; 5] = [
        AnimState::Idle,
        AnimState::Walk,
        AnimState::Jump,
        AnimState::Surf,
        AnimState::Attack,
    ];

    /// Directory / file stem used for frame discovery.
    pub fn name(self) -> &'static str {
        match self {
            AnimState::Idle   => "idle",
            AnimState::Walk   => "walk",
            AnimState::Jump   => "jump",
            AnimState::Surf   => "surf",
            AnimState::Attack => "attack",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    pub base: String,
    pub mirrored: String,
}

impl Frame {
    pub fn new(base: &str) -> Self {
        Frame { base: base.to_string(), mirrored: mirror_glyphs(base) }
    }
}

/// Mirror a glyph string left-to-right.
pub fn mirror_glyphs(s: &str) -> String {
    s.chars().rev().map(mirror_char).collect()
}

fn mirror_char(c: char) -> char {
    match c {
        '<' => '>',
        '>' => '<',
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '/' => '\\',
        '\\' => '/',
        other => other,
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnimationSet {
    sequences: [Vec<Frame>; 5],
}

impl AnimationSet {
    pub fn from_frames(frames: &[(AnimState, &[&str])]) -> Self {
        let mut set = AnimationSet::default();
        for (state, glyphs) in frames {
            set.sequences[state.index()] = glyphs.iter().map(|g| Frame::new(g)).collect();
        }
        set
    }

    pub fn frames(&self, state: AnimState) -> &[Frame] {
        &self.sequences[state.index()]
    }

    /// Probe frame files under `dir`. Returns `None` when `dir` itself
    /// does not exist; a missing frame file only ends that state's sequence.
    pub fn discover(dir: &Path) -> Option<Self> {
        if !dir.is_dir() {
            return None;
        }
        let mut set = AnimationSet::default();
        for state in AnimState::ALL {
            let mut index = 1;
            loop {
                let path = dir
                    .join(state.name())
                    .join(format!("{}_{}.txt", state.name(), index));
                let glyph = match std::fs::read_to_string(&path) {
                    Ok(text) => text.lines().next().unwrap_or("").trim_end().to_string(),
                    Err(e) if e.kind() == ErrorKind::NotFound => break,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "unreadable frame, sequence cut short");
                        break;
                    }
                };
                set.sequences[state.index()].push(Frame::new(&glyph));
                index += 1;
            }
        }
        Some(set)
    }

    /// Discovered frames, or `fallback` when the directory is absent.
    pub fn load_or(dir: &Path, fallback: AnimationSet) -> Self {
        match AnimationSet::discover(dir) {
            Some(set) => {
                tracing::debug!(dir = %dir.display(), "loaded character frames");
                set
            }
            None => fallback,
        }
    }

    pub fn fire_knight() -> Self {
        AnimationSet::from_frames(&[
            (AnimState::Idle, &["F>", "F)"]),
            (AnimState::Walk, &["F>", "f>", "F}", "f>"]),
            (AnimState::Jump, &["F^"]),
            (AnimState::Surf, &["F~", "f~"]),
            (AnimState::Attack, &["F/", "F-", "F\\"]),
        ])
    }

    pub fn water_priestess() -> Self {
        AnimationSet::from_frames(&[
            (AnimState::Idle, &["W>", "W)"]),
            (AnimState::Walk, &["W>", "w>", "W}", "w>"]),
            (AnimState::Jump, &["W^"]),
            (AnimState::Surf, &["W~", "w~", "W="]),
            (AnimState::Attack, &["W*", "W+", "W*"]),
        ])
    }
}

#[derive(Clone, Debug)]
pub struct Animator {
    frames: Rc<AnimationSet>,
    state: AnimState,
    frame: usize,
    countdown: u32,
    locked: bool,
    speed: u32,
}

impl Animator {
    pub fn new(frames: Rc<AnimationSet>, speed: u32) -> Self {
        Animator {
            frames,
            state: AnimState::Idle,
            frame: 0,
            countdown: 0,
            locked: false,
            speed,
        }
    }

    pub fn state(&self) -> AnimState { self.state }
    #[cfg(test)]
    pub fn frame(&self) -> usize { self.frame }
    pub fn is_locked(&self) -> bool { self.locked }

    /// Frames in the current sequence; an empty sequence is one static frame.
    pub fn frame_count(&self) -> usize {
        self.frames.frames(self.state).len().max(1)
    }

    /// Switch state unless locked. Returns whether the switch happened.
    pub fn set_state(&mut self, state: AnimState) -> bool {
        if self.locked {
            return false;
        }
        self.state = state;
        self.frame = 0;
        true
    }

    /// Start an attack and hold the lock until its last frame wraps.
    pub fn lock_attack(&mut self) {
        if self.set_state(AnimState::Attack) {
            self.locked = true;
        }
    }

    pub fn advance(&mut self) {
        self.countdown += 1;
        if self.countdown < self.speed.max(1) {
            return;
        }
        self.countdown = 0;
        self.frame += 1;
        if self.frame >= self.frame_count() {
            self.frame = 0;
            if self.state == AnimState::Attack {
                self.locked = false;
                self.set_state(AnimState::Idle);
            }
        }
    }

    /// Glyph for this tick: mirrored when facing left.
    pub fn texture(&self, facing_right: bool) -> &str {
        match self.frames.frames(self.state).get(self.frame) {
            Some(f) if facing_right => &f.base,
            Some(f) => &f.mirrored,
            None => FALLBACK_GLYPH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animator() -> Animator {
        Animator::new(Rc::new(AnimationSet::fire_knight()), 10)
    }

    #[test]
    fn set_state_resets_cursor() {
        let mut a = animator();
        a.set_state(AnimState::Walk);
        for _ in 0..25 { a.advance(); }
        assert_eq!(a.frame(), 2);
        assert!(a.set_state(AnimState::Surf));
        assert_eq!(a.state(), AnimState::Surf);
        assert_eq!(a.frame(), 0);
    }

    #[test]
    fn lock_suppresses_every_transition() {
        let mut a = animator();
        a.lock_attack();
        assert!(a.is_locked());
        for _ in 0..10 { a.advance(); }
        let frame = a.frame();
        for target in AnimState::ALL {
            assert!(!a.set_state(target));
            assert_eq!(a.state(), AnimState::Attack);
            assert_eq!(a.frame(), frame);
        }
    }

    #[test]
    fn lock_implies_attack() {
        let mut a = animator();
        a.lock_attack();
        for _ in 0..200 {
            if a.is_locked() {
                assert_eq!(a.state(), AnimState::Attack);
            }
            a.advance();
        }
    }

    #[test]
    fn attack_wrap_unlocks_into_idle() {
        let mut a = animator();
        a.set_state(AnimState::Walk);
        a.lock_attack();
        let ticks = a.frame_count() as u32 * 10;
        for _ in 0..ticks - 1 { a.advance(); }
        assert!(a.is_locked());
        a.advance();
        assert!(!a.is_locked());
        assert_eq!(a.state(), AnimState::Idle);
        assert_eq!(a.frame(), 0);
    }

    #[test]
    fn cursor_stays_in_range_and_is_periodic() {
        for state in [AnimState::Idle, AnimState::Walk, AnimState::Jump, AnimState::Surf] {
            let mut a = animator();
            a.set_state(state);
            let period = a.frame_count() * 10;
            for _ in 0..3 { a.advance(); }
            let start = a.frame();
            for _ in 0..period {
                a.advance();
                assert!(a.frame() < a.frame_count());
            }
            assert_eq!(a.frame(), start);
        }
    }

    #[test]
    fn empty_sequence_is_static_frame() {
        let set = AnimationSet::from_frames(&[(AnimState::Idle, &["I>"])]);
        let mut a = Animator::new(Rc::new(set), 2);
        a.set_state(AnimState::Walk);
        for _ in 0..9 {
            a.advance();
            assert_eq!(a.frame(), 0);
        }
        assert_eq!(a.texture(true), FALLBACK_GLYPH);
    }

    #[test]
    fn empty_attack_still_unlocks() {
        let set = AnimationSet::from_frames(&[(AnimState::Idle, &["I>"])]);
        let mut a = Animator::new(Rc::new(set), 3);
        a.lock_attack();
        for _ in 0..3 { a.advance(); }
        assert!(!a.is_locked());
        assert_eq!(a.state(), AnimState::Idle);
    }

    #[test]
    fn texture_follows_facing() {
        let a = animator();
        assert_eq!(a.texture(true), "F>");
        assert_eq!(a.texture(false), "<F");
    }

    #[test]
    fn mirror_swaps_direction_glyphs() {
        assert_eq!(mirror_glyphs("F/"), "\\F");
        assert_eq!(mirror_glyphs("(W}"), "{W)");
    }

    #[test]
    fn discovery_stops_at_first_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let walk = dir.path().join("walk");
        std::fs::create_dir_all(&walk).unwrap();
        std::fs::write(walk.join("walk_1.txt"), "A>\n").unwrap();
        std::fs::write(walk.join("walk_2.txt"), "B>").unwrap();
        std::fs::write(walk.join("walk_4.txt"), "D>").unwrap();

        let set = AnimationSet::discover(dir.path()).unwrap();
        let glyphs: Vec<&str> = set.frames(AnimState::Walk).iter().map(|f| f.base.as_str()).collect();
        assert_eq!(glyphs, vec!["A>", "B>"]);
        assert_eq!(set.frames(AnimState::Walk)[0].mirrored, "<A");
        assert!(set.frames(AnimState::Idle).is_empty());
    }

    #[test]
    fn unreadable_frame_ends_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let jump = dir.path().join("jump");
        std::fs::create_dir_all(&jump).unwrap();
        std::fs::write(jump.join("jump_1.txt"), "J^").unwrap();
        std::fs::write(jump.join("jump_2.txt"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::write(jump.join("jump_3.txt"), "K^").unwrap();

        let set = AnimationSet::discover(dir.path()).unwrap();
        assert_eq!(set.frames(AnimState::Jump).len(), 1);
        assert_eq!(set.frames(AnimState::Jump)[0].base, "J^");
    }

    #[test]
    fn missing_directory_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let set = AnimationSet::load_or(&dir.path().join("nobody"), AnimationSet::water_priestess());
        assert_eq!(set.frames(AnimState::Surf).len(), 3);
    }
}
