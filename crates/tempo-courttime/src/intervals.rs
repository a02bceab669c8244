use std::cmp::Reverse;
use std::collections::BTreeMap;

use tempo_core::{Config, Direction, Interval, Period, PlayerId, Provenance, StatusChange, TeamId};

struct OpenEntry {
    team: TeamId,
    period: Period,
    clock: u32,
    provenance: Provenance,
    degraded: bool,
}

/// Fold the merged status-change stream into closed per-player intervals.
///
/// An `In` opens an entry (a duplicate `In` for an already-open player is
/// ignored; the earlier entry stands). An `Out` closes `[entry, out)`.
/// An `Out` for a player with no open entry means the feed knew something
/// we never saw enter: the interval is synthesized from the period start,
/// `Inferred` and degraded. Entries still open when the stream ends close
/// at their period's boundary.
pub fn build_intervals(changes: &[StatusChange], config: &Config) -> Vec<Interval> {
    let mut open: BTreeMap<PlayerId, OpenEntry> = BTreeMap::new();
    let mut intervals: Vec<Interval> = Vec::new();

    for change in changes {
        match change.direction {
            Direction::In => {
                open.entry(change.player).or_insert(OpenEntry {
                    team: change.team,
                    period: change.period,
                    clock: change.clock,
                    provenance: change.provenance,
                    degraded: change.degraded,
                });
            }
            Direction::Out => match open.remove(&change.player) {
                Some(entry) => {
                    let end_clock = if change.period == entry.period {
                        change.clock.min(entry.clock)
                    } else {
                        0
                    };
                    intervals.push(Interval {
                        player: change.player,
                        team: entry.team,
                        period: entry.period,
                        start_clock: entry.clock,
                        end_clock,
                        provenance: entry.provenance,
                        degraded: entry.degraded || change.degraded,
                    });
                }
                None => {
                    intervals.push(Interval {
                        player: change.player,
                        team: change.team,
                        period: change.period,
                        start_clock: config.period_start_clock(change.period),
                        end_clock: change.clock,
                        provenance: Provenance::Inferred,
                        degraded: true,
                    });
                }
            },
        }
    }

    for (player, entry) in open {
        intervals.push(Interval {
            player,
            team: entry.team,
            period: entry.period,
            start_clock: entry.clock,
            end_clock: 0,
            provenance: entry.provenance,
            degraded: entry.degraded,
        });
    }

    intervals.sort_by_key(|iv| (iv.player, iv.period, Reverse(iv.start_clock)));
    intervals
}
