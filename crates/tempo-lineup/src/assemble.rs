use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use tempo_core::{Interval, Period, PlayerId, TeamId};
use tempo_possession::Possession;

/// A canonical five-man lineup. Players are sorted ascending at
/// construction, so equal five-man groups always collide to the same
/// value regardless of substitution history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Lineup {
    pub team: TeamId,
    pub players: [PlayerId; 5],
}

impl Lineup {
    pub fn new(team: TeamId, mut players: [PlayerId; 5]) -> Self {
        players.sort_unstable();
        Self { team, players }
    }

    /// Stable string key for downstream grouping.
    pub fn lineup_id(&self) -> String {
        format!(
            "{}:{}",
            self.team,
            self.players.map(|p| p.to_string()).join("-")
        )
    }
}

/// A possession with the lineups on the floor at its start. When either
/// side does not resolve to exactly five tracked players, the possession
/// is kept for coverage reporting but flagged `lineup_incomplete` and
/// excluded from strict per-lineup aggregation downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineupPossession {
    #[serde(flatten)]
    pub possession: Possession,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offense_lineup: Option<Lineup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense_lineup: Option<Lineup>,
    pub lineup_incomplete: bool,
}

/// Distinct players of `team` whose interval covers the instant.
fn players_covering(
    intervals: &[Interval],
    team: TeamId,
    period: Period,
    t: u32,
) -> BTreeSet<PlayerId> {
    intervals
        .iter()
        .filter(|iv| iv.team == team && iv.covers(period, t))
        .map(|iv| iv.player)
        .collect()
}

fn exact_five(players: &BTreeSet<PlayerId>) -> Option<[PlayerId; 5]> {
    if players.len() != 5 {
        return None;
    }
    let mut out = [0; 5];
    for (slot, &player) in out.iter_mut().zip(players.iter()) {
        *slot = player;
    }
    Some(out)
}

/// Attach lineups to possessions by querying the reconstructed intervals
/// at each possession's start instant.
pub fn assemble(possessions: &[Possession], intervals: &[Interval]) -> Vec<LineupPossession> {
    possessions
        .iter()
        .map(|possession| {
            let on_court = |team| {
                players_covering(intervals, team, possession.period, possession.start_clock)
            };
            let offense = on_court(possession.offense);
            let defense = on_court(possession.defense);

            let offense_lineup =
                exact_five(&offense).map(|players| Lineup::new(possession.offense, players));
            let defense_lineup =
                exact_five(&defense).map(|players| Lineup::new(possession.defense, players));
            let lineup_incomplete = offense_lineup.is_none() || defense_lineup.is_none();
            if lineup_incomplete {
                warn!(
                    period = possession.period,
                    start_clock = possession.start_clock,
                    offense_count = offense.len(),
                    defense_count = defense.len(),
                    "possession start not covered by exactly five tracked players per team"
                );
            }

            LineupPossession {
                possession: possession.clone(),
                offense_lineup,
                defense_lineup,
                lineup_incomplete,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_core::Provenance;
    use tempo_possession::EndReason;

    const HOME: TeamId = 10;
    const AWAY: TeamId = 20;

    fn interval(player: PlayerId, team: TeamId, start: u32, end: u32) -> Interval {
        Interval {
            player,
            team,
            period: 1,
            start_clock: start,
            end_clock: end,
            provenance: Provenance::Explicit,
            degraded: false,
        }
    }

    fn full_court(start: u32, end: u32) -> Vec<Interval> {
        let mut intervals = Vec::new();
        for p in [1, 2, 3, 4, 5] {
            intervals.push(interval(p, HOME, start, end));
        }
        for p in [6, 7, 8, 9, 11] {
            intervals.push(interval(p, AWAY, start, end));
        }
        intervals
    }

    fn possession(start: u32, end: u32) -> Possession {
        Possession {
            period: 1,
            start_clock: start,
            end_clock: end,
            offense: HOME,
            defense: AWAY,
            points: 2,
            end_reason: EndReason::MadeShot,
        }
    }

    #[test]
    fn canonical_lineup_ignores_insertion_order() {
        let a = Lineup::new(HOME, [5, 3, 1, 4, 2]);
        let b = Lineup::new(HOME, [1, 2, 3, 4, 5]);
        assert_eq!(a, b);
        assert_eq!(a.lineup_id(), "10:1-2-3-4-5");
    }

    #[test]
    fn complete_coverage_attaches_both_lineups() {
        let rows = assemble(&[possession(720, 700)], &full_court(720, 0));
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert!(!row.lineup_incomplete);
        assert_eq!(row.offense_lineup.as_ref().unwrap().players, [1, 2, 3, 4, 5]);
        assert_eq!(row.defense_lineup.as_ref().unwrap().players, [6, 7, 8, 9, 11]);
    }

    #[test]
    fn coverage_uses_the_possession_start_instant() {
        // Player 5 leaves at 600; 101 plays the rest of the period.
        let mut intervals = full_court(720, 0);
        intervals.retain(|iv| iv.player != 5);
        intervals.push(interval(5, HOME, 720, 600));
        intervals.push(interval(101, HOME, 600, 0));

        let before = assemble(&[possession(650, 630)], &intervals);
        assert_eq!(before[0].offense_lineup.as_ref().unwrap().players, [1, 2, 3, 4, 5]);

        let after = assemble(&[possession(600, 580)], &intervals);
        assert_eq!(
            after[0].offense_lineup.as_ref().unwrap().players,
            [1, 2, 3, 4, 101]
        );
    }

    #[test]
    fn four_tracked_players_flag_the_possession() {
        let mut intervals = full_court(720, 0);
        intervals.retain(|iv| iv.player != 5);
        let rows = assemble(&[possession(700, 680)], &intervals);
        let row = &rows[0];
        assert!(row.lineup_incomplete);
        assert!(row.offense_lineup.is_none());
        // The defense still resolved; the flag covers the possession.
        assert!(row.defense_lineup.is_some());
    }

    #[test]
    fn six_tracked_players_flag_the_possession() {
        let mut intervals = full_court(720, 0);
        intervals.push(interval(102, HOME, 720, 0));
        let rows = assemble(&[possession(700, 680)], &intervals);
        assert!(rows[0].lineup_incomplete);
        assert!(rows[0].offense_lineup.is_none());
    }

    #[test]
    fn duplicate_coverage_of_one_player_does_not_fake_a_fifth() {
        // Player 1 has two degraded intervals both covering the instant;
        // player 5 is untracked. Four distinct players is incomplete.
        let mut intervals = full_court(720, 0);
        intervals.retain(|iv| iv.player != 5);
        intervals.push(interval(1, HOME, 710, 0));
        let rows = assemble(&[possession(700, 680)], &intervals);
        assert!(rows[0].lineup_incomplete);
    }

    #[test]
    fn lineup_possession_round_trip_serialize() {
        let rows = assemble(&[possession(720, 700)], &full_court(720, 0));
        let json = serde_json::to_string(&rows).unwrap();
        assert!(json.contains("\"lineup_incomplete\":false"));
        let back: Vec<LineupPossession> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rows);
    }
}
