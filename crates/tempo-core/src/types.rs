use serde::{Deserialize, Serialize};

/// Numeric player identifier as issued by the upstream feed.
pub type PlayerId = u64;

/// Numeric team identifier.
pub type TeamId = u64;

/// Event sequence number; defines the strict total order of a game log.
pub type Seq = u64;

/// Game period, 1-based. Periods above the regulation count are overtime.
pub type Period = u8;

/// Whether a transition (and the interval built from it) comes from an
/// explicit substitution event or from a correction the engine inferred.
/// Period-boundary carry-overs are `Inferred`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Explicit,
    Inferred,
}

/// Direction of a court status change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

/// One entry in the merged transition stream: a single player entering or
/// leaving the court. Explicit substitutions contribute an `Out` and an
/// `In`; inferred corrections and boundary carry-overs contribute their
/// own changes with `Provenance::Inferred`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub seq: Seq,
    pub period: Period,
    /// Game clock at the change, seconds remaining in the period.
    pub clock: u32,
    pub wall_clock: i64,
    pub team: TeamId,
    pub player: PlayerId,
    pub direction: Direction,
    pub provenance: Provenance,
    /// Set when the change was produced while recovering from inconsistent
    /// data (outgoing player not on court, ambiguous inference victim).
    #[serde(default)]
    pub degraded: bool,
}

/// A closed court-presence interval for one player within one period.
///
/// Clocks count down, so `start_clock >= end_clock`. Intervals are
/// half-open in time: the starting instant belongs to this interval, the
/// ending instant to whatever follows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interval {
    pub player: PlayerId,
    pub team: TeamId,
    pub period: Period,
    pub start_clock: u32,
    pub end_clock: u32,
    pub provenance: Provenance,
    #[serde(default)]
    pub degraded: bool,
}

impl Interval {
    /// Whether this interval covers game-clock instant `t` of `period`.
    pub fn covers(&self, period: Period, t: u32) -> bool {
        self.period == period && self.start_clock >= t && t > self.end_clock
    }

    /// Tracked court time in game-clock seconds.
    pub fn seconds(&self) -> u32 {
        self.start_clock - self.end_clock
    }
}
