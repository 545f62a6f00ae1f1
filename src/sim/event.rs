/// Events emitted during a simulation step or by control handling.
/// The presentation layer consumes these for sound.

use crate::domain::actor::PlayerId;
use crate::domain::rules::Cue;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Jumped(PlayerId),
    CoinPicked { by: PlayerId, score: u32 },
    /// A rule played its one-shot sound.
    RuleCue { rule: &'static str, cue: Cue },
    /// An attack rule applied its effects.
    WallBroken { rule: &'static str },
    LevelCompleted { level: u32 },
    /// Emitted at most once per session.
    GameCompleted { score: u32 },
}
