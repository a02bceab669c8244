use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use tempo_core::{Config, GameSeed, Interval, PlayerId, TeamId};

/// One row of the tracked-vs-box-score minutes audit. The audit only
/// annotates; a flagged row never blocks output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MinutesAuditRow {
    pub player: PlayerId,
    pub team: TeamId,
    pub tracked_seconds: u32,
    pub box_minutes: f64,
    pub divergence_minutes: f64,
    pub flagged: bool,
}

/// Compare tracked court time against recorded box-score minutes for
/// every player the intervals or the box score mention, flagging rows
/// whose divergence exceeds `Config::minutes_divergence_threshold`.
pub fn audit_minutes(
    intervals: &[Interval],
    seed: &GameSeed,
    config: &Config,
) -> Vec<MinutesAuditRow> {
    let mut tracked: BTreeMap<PlayerId, (TeamId, u32)> = BTreeMap::new();
    for interval in intervals {
        let entry = tracked.entry(interval.player).or_insert((interval.team, 0));
        entry.1 += interval.seconds();
    }
    // Players with recorded minutes but no tracked intervals still get a
    // row; their whole box-score time is divergence.
    for &player in seed.box_minutes.keys() {
        let Some(team) = seed.team_of(player) else {
            continue;
        };
        tracked.entry(player).or_insert((team, 0));
    }

    tracked
        .into_iter()
        .map(|(player, (team, tracked_seconds))| {
            let box_minutes = seed.box_minutes.get(&player).copied().unwrap_or(0.0);
            let divergence_minutes = (f64::from(tracked_seconds) / 60.0 - box_minutes).abs();
            let flagged = divergence_minutes > config.minutes_divergence_threshold;
            if flagged {
                warn!(
                    player,
                    team,
                    tracked_seconds,
                    box_minutes,
                    divergence_minutes,
                    "tracked minutes diverge from box score beyond threshold"
                );
            }
            MinutesAuditRow {
                player,
                team,
                tracked_seconds,
                box_minutes,
                divergence_minutes,
                flagged,
            }
        })
        .collect()
}
