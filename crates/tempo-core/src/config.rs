use serde::{Deserialize, Serialize};

use crate::types::Period;

/// Which swap-out policy the activity inference engine uses when it must
/// pick the teammate leaving the court for an inferred re-entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwapPolicyKind {
    /// Teammate with the oldest last-recorded activity, ties to the lowest
    /// player id. The default.
    LongestIdle,
    /// Lowest player id outright. Exists to prove the policy seam and as a
    /// baseline when evaluating alternatives.
    LowestPlayerId,
}

/// Tunable thresholds for one derivation run. Every field has a default,
/// so partial config documents deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Flag a player's minutes audit row when tracked and box-score
    /// minutes diverge by more than this many minutes.
    pub minutes_divergence_threshold: f64,
    /// How many events ahead a made shot looks for its and-1 foul.
    pub and_one_lookahead_events: usize,
    /// Maximum game-clock distance, in seconds, between a made shot and a
    /// foul for the pair to count as an and-1.
    pub and_one_window_seconds: u32,
    /// Number of regulation periods; later periods are overtime.
    pub regulation_periods: Period,
    pub regulation_period_seconds: u32,
    pub overtime_period_seconds: u32,
    pub swap_policy: SwapPolicyKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            minutes_divergence_threshold: 2.0,
            and_one_lookahead_events: 3,
            and_one_window_seconds: 5,
            regulation_periods: 4,
            regulation_period_seconds: 720,
            overtime_period_seconds: 300,
            swap_policy: SwapPolicyKind::LongestIdle,
        }
    }
}

impl Config {
    /// Game clock value at the start of `period`.
    pub fn period_start_clock(&self, period: Period) -> u32 {
        if period <= self.regulation_periods {
            self.regulation_period_seconds
        } else {
            self.overtime_period_seconds
        }
    }
}
