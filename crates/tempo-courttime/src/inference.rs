use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tempo_core::{
    Config, Direction, Error, Event, EventKind, GameSeed, Period, PlayerId, Provenance, Seq,
    StatusChange,
};

use crate::policy::{SwapContext, SwapOutPolicy};
use crate::tracker::CourtTracker;

/// Counters describing one reconstruction pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconstructStats {
    pub events: usize,
    pub explicit_substitutions: usize,
    pub degraded_substitutions: usize,
    pub inferred_swaps: usize,
    pub ambiguous_swaps: usize,
    pub unknown_roster_players: usize,
}

/// The merged transition stream plus its counters.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub changes: Vec<StatusChange>,
    pub stats: ReconstructStats,
}

/// Walk the ordered event stream once, combining the substitution tracker
/// with activity inference and period-boundary carry-over, and emit the
/// merged status-change stream the interval builder consumes.
///
/// Activity by a player the tracker records as off court synthesizes a
/// swap ordered immediately before the activity: the active player enters
/// and a teammate chosen by `policy` leaves, both `Provenance::Inferred`.
/// At a period boundary every open presence is closed at the boundary
/// clock and reopened at the next period's start clock for whoever is
/// still on court; a missing period-end row is tolerated by synthesizing
/// the close when the period number advances.
pub fn reconstruct(
    events: &[Event],
    seed: &GameSeed,
    config: &Config,
    policy: &dyn SwapOutPolicy,
) -> Result<Reconstruction, Error> {
    let mut tracker = CourtTracker::from_seed(seed)?;
    let mut changes: Vec<StatusChange> = Vec::new();
    let mut stats = ReconstructStats::default();
    let mut last_activity: BTreeMap<PlayerId, Seq> = BTreeMap::new();
    let mut current_period: Period = 1;
    let mut boundary_closed = false;
    let mut last_seen: Option<(Seq, Period, u32, i64)> = None;

    // Starters open at the period 1 start by construction.
    let first_wall = events.first().map(|e| e.wall_clock).unwrap_or(0);
    for (team, player) in tracker.all_on_court() {
        changes.push(StatusChange {
            seq: 0,
            period: 1,
            clock: config.period_start_clock(1),
            wall_clock: first_wall,
            team,
            player,
            direction: Direction::In,
            provenance: Provenance::Explicit,
            degraded: false,
        });
    }

    for event in events {
        tracker.observe_seq(event.seq)?;

        if event.period > current_period {
            if !boundary_closed {
                // The feed skipped the period-end row; close at the boundary.
                for (team, player) in tracker.all_on_court() {
                    changes.push(StatusChange {
                        seq: event.seq,
                        period: current_period,
                        clock: 0,
                        wall_clock: event.wall_clock,
                        team,
                        player,
                        direction: Direction::Out,
                        provenance: Provenance::Inferred,
                        degraded: false,
                    });
                }
            }
            let start = config.period_start_clock(event.period);
            for (team, player) in tracker.all_on_court() {
                changes.push(StatusChange {
                    seq: event.seq,
                    period: event.period,
                    clock: start,
                    wall_clock: event.wall_clock,
                    team,
                    player,
                    direction: Direction::In,
                    provenance: Provenance::Inferred,
                    degraded: false,
                });
            }
            current_period = event.period;
            boundary_closed = false;
        }

        match &event.kind {
            EventKind::Substitution { .. } => {
                let outcome = tracker.apply_substitution(event)?;
                stats.explicit_substitutions += 1;
                if outcome.degraded {
                    stats.degraded_substitutions += 1;
                }
                changes.extend(outcome.changes);
            }
            EventKind::PeriodEnd => {
                for (team, player) in tracker.all_on_court() {
                    changes.push(StatusChange {
                        seq: event.seq,
                        period: event.period,
                        clock: event.clock,
                        wall_clock: event.wall_clock,
                        team,
                        player,
                        direction: Direction::Out,
                        provenance: Provenance::Inferred,
                        degraded: false,
                    });
                }
                boundary_closed = true;
            }
            _ => {
                for player in event.players_involved() {
                    let Some(team) = seed.team_of(player) else {
                        stats.unknown_roster_players += 1;
                        continue;
                    };
                    let Some(on_court) = tracker.on_court(team) else {
                        stats.unknown_roster_players += 1;
                        continue;
                    };
                    if !on_court.contains(&player) {
                        let candidates = on_court.clone();
                        if candidates.is_empty() {
                            continue;
                        }
                        let choice = policy.pick(
                            &candidates,
                            &SwapContext {
                                last_activity: &last_activity,
                            },
                        );
                        tracker.swap(team, choice.player, player);
                        stats.inferred_swaps += 1;
                        if choice.ambiguous {
                            stats.ambiguous_swaps += 1;
                        }
                        debug!(
                            seq = event.seq,
                            team,
                            incoming = player,
                            outgoing = choice.player,
                            ambiguous = choice.ambiguous,
                            "synthesized swap for off-court activity"
                        );
                        let change = |p: PlayerId, direction: Direction| StatusChange {
                            seq: event.seq,
                            period: event.period,
                            clock: event.clock,
                            wall_clock: event.wall_clock,
                            team,
                            player: p,
                            direction,
                            provenance: Provenance::Inferred,
                            degraded: choice.ambiguous,
                        };
                        changes.push(change(choice.player, Direction::Out));
                        changes.push(change(player, Direction::In));
                    }
                    last_activity.insert(player, event.seq);
                }
            }
        }

        stats.events += 1;
        last_seen = Some((event.seq, event.period, event.clock, event.wall_clock));
    }

    // Close anything still open when the log ends without a period-end row.
    if !boundary_closed {
        let (seq, period, clock, wall_clock) =
            last_seen.unwrap_or((0, 1, config.period_start_clock(1), first_wall));
        for (team, player) in tracker.all_on_court() {
            changes.push(StatusChange {
                seq,
                period,
                clock,
                wall_clock,
                team,
                player,
                direction: Direction::Out,
                provenance: Provenance::Inferred,
                degraded: false,
            });
        }
    }

    Ok(Reconstruction { changes, stats })
}
