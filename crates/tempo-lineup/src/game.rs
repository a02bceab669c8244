use anyhow::Context;
use serde::{Deserialize, Serialize};

use tempo_core::{Config, Event, GameSeed, Interval};
use tempo_courttime::{audit_minutes, build_intervals, policy_for, reconstruct, MinutesAuditRow};
use tempo_possession::segment;

use crate::assemble::{assemble, LineupPossession};

/// Per-game counters across the whole derivation. Every recovered
/// data-quality condition is visible here as well as on the individual
/// records it degraded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeriveStats {
    pub events: usize,
    pub explicit_substitutions: usize,
    pub degraded_substitutions: usize,
    pub inferred_swaps: usize,
    pub ambiguous_swaps: usize,
    pub unknown_roster_players: usize,
    pub intervals: usize,
    pub degraded_intervals: usize,
    pub possessions: usize,
    pub lineup_incomplete: usize,
    pub flagged_minutes: usize,
}

/// Everything derived from one game's event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameDerivation {
    pub intervals: Vec<Interval>,
    pub minutes: Vec<MinutesAuditRow>,
    pub possessions: Vec<LineupPossession>,
    pub stats: DeriveStats,
}

/// Run the full per-game derivation: reconstruct court presence, build
/// intervals and the minutes audit, segment possessions, and attach
/// lineups. Pure in its inputs; re-running on an identical event log,
/// seed, and config produces an identical derivation. Games are
/// independent, so callers may run this across games in parallel.
pub fn derive_game(
    events: &[Event],
    seed: &GameSeed,
    config: &Config,
) -> anyhow::Result<GameDerivation> {
    seed.validate().context("validating game seed")?;

    let policy = policy_for(config.swap_policy);
    let recon = reconstruct(events, seed, config, policy.as_ref())
        .context("reconstructing court presence")?;
    let intervals = build_intervals(&recon.changes, config);
    let minutes = audit_minutes(&intervals, seed, config);
    let possessions = segment(events, seed, config).context("segmenting possessions")?;
    let possessions = assemble(&possessions, &intervals);

    let stats = DeriveStats {
        events: recon.stats.events,
        explicit_substitutions: recon.stats.explicit_substitutions,
        degraded_substitutions: recon.stats.degraded_substitutions,
        inferred_swaps: recon.stats.inferred_swaps,
        ambiguous_swaps: recon.stats.ambiguous_swaps,
        unknown_roster_players: recon.stats.unknown_roster_players,
        intervals: intervals.len(),
        degraded_intervals: intervals.iter().filter(|iv| iv.degraded).count(),
        possessions: possessions.len(),
        lineup_incomplete: possessions.iter().filter(|p| p.lineup_incomplete).count(),
        flagged_minutes: minutes.iter().filter(|row| row.flagged).count(),
    };

    Ok(GameDerivation {
        intervals,
        minutes,
        possessions,
        stats,
    })
}
