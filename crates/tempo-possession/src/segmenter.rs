use serde::{Deserialize, Serialize};
use tracing::debug;

use tempo_core::{Config, Error, Event, EventKind, GameSeed, Period, PlayerId, Seq, TeamId};

/// Why a possession closed. Exactly one reason per possession; rules are
/// evaluated in priority order and the first match wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    MadeShot,
    DefensiveRebound,
    Turnover,
    LastFreeThrow,
    PeriodEnd,
}

/// A contiguous span of play during which one team had the ball.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Possession {
    pub period: Period,
    pub start_clock: u32,
    pub end_clock: u32,
    pub offense: TeamId,
    pub defense: TeamId,
    pub points: u32,
    pub end_reason: EndReason,
}

/// The free-throw run is a transient sub-state: intermediate attempts
/// keep the possession open and dead-ball rebounds between attempts must
/// not read as a change of possession.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Live,
    FreeThrows,
}

struct OpenPossession {
    period: Period,
    start_clock: u32,
    /// Bound lazily from the first attributable offensive event. A span
    /// that closes without ever binding is dropped, never guessed.
    offense: Option<TeamId>,
    points: u32,
    phase: Phase,
}

fn ensure_open(open: &mut Option<OpenPossession>, period: Period, start_clock: u32) {
    open.get_or_insert(OpenPossession {
        period,
        start_clock,
        offense: None,
        points: 0,
        phase: Phase::Live,
    });
}

fn close_possession(
    open: &mut Option<OpenPossession>,
    possessions: &mut Vec<Possession>,
    pair: (TeamId, TeamId),
    end_clock: u32,
    reason: EndReason,
    next_start_clock: &mut u32,
) {
    if let Some(p) = open.take() {
        if let Some(offense) = p.offense {
            let defense = if offense == pair.0 { pair.1 } else { pair.0 };
            debug!(
                period = p.period,
                start_clock = p.start_clock,
                end_clock,
                offense,
                points = p.points,
                reason = ?reason,
                "closed possession"
            );
            possessions.push(Possession {
                period: p.period,
                start_clock: p.start_clock,
                end_clock,
                offense,
                defense,
                points: p.points,
                end_reason: reason,
            });
        }
        *next_start_clock = end_clock;
    }
}

/// Whether the made shot at `idx` is the front half of an and-1: a
/// shooting foul drawn by the same shooter within the bounded lookahead
/// window. The window is bounded in both events and game-clock seconds.
fn is_and_one(events: &[Event], idx: usize, shooter: PlayerId, config: &Config) -> bool {
    let shot = &events[idx];
    events[idx + 1..]
        .iter()
        .take(config.and_one_lookahead_events)
        .take_while(|next| next.period == shot.period)
        .any(|next| {
            shot.clock.abs_diff(next.clock) <= config.and_one_window_seconds
                && matches!(
                    &next.kind,
                    EventKind::Foul {
                        drawn_by: Some(drawn),
                        shooting: true,
                        ..
                    } if *drawn == shooter
                )
        })
}

/// Segment one game's ordered event stream into possessions.
///
/// Transition rules, in priority order per event:
/// 1. made field goal ends the possession unless it is an and-1, which
///    holds it open through the free-throw run;
/// 2. a rebound by the team that did not take the last shot ends it
///    (offensive boards keep it open; with no shot on record the rebound
///    counts as defensive);
/// 3. a turnover always ends it;
/// 4. a free throw ends it only when flagged last in its sequence;
/// 5. a period end force-ends it.
///
/// Points accumulate from made field goals and made free throws between
/// the boundaries. Spans that never bind an offense are discarded.
pub fn segment(
    events: &[Event],
    seed: &GameSeed,
    config: &Config,
) -> Result<Vec<Possession>, Error> {
    let pair = seed.teams()?;
    let known = |team: TeamId, seq: Seq| {
        if team == pair.0 || team == pair.1 {
            Ok(())
        } else {
            Err(Error::UnknownTeam { team, seq })
        }
    };

    let mut possessions: Vec<Possession> = Vec::new();
    let mut open: Option<OpenPossession> = None;
    let mut current_period: Period = 1;
    let mut next_start_clock = config.period_start_clock(1);
    let mut last_shot_team: Option<TeamId> = None;
    let mut last_clock = next_start_clock;

    for (idx, event) in events.iter().enumerate() {
        if event.period > current_period {
            // Missing period-end row: force the close at the boundary.
            close_possession(
                &mut open,
                &mut possessions,
                pair,
                0,
                EndReason::PeriodEnd,
                &mut next_start_clock,
            );
            current_period = event.period;
            next_start_clock = config.period_start_clock(event.period);
            last_shot_team = None;
        }
        last_clock = event.clock;

        match &event.kind {
            EventKind::Shot {
                team,
                shooter,
                made,
                value,
                ..
            } => {
                known(*team, event.seq)?;
                ensure_open(&mut open, current_period, next_start_clock);
                let p = open.as_mut().expect("possession just opened");
                p.offense.get_or_insert(*team);
                last_shot_team = Some(*team);
                if *made {
                    p.points += u32::from(*value);
                    if !is_and_one(events, idx, *shooter, config) {
                        close_possession(
                            &mut open,
                            &mut possessions,
                            pair,
                            event.clock,
                            EndReason::MadeShot,
                            &mut next_start_clock,
                        );
                    }
                }
            }
            EventKind::FreeThrow {
                team,
                made,
                last_in_sequence,
                ..
            } => {
                known(*team, event.seq)?;
                ensure_open(&mut open, current_period, next_start_clock);
                let p = open.as_mut().expect("possession just opened");
                p.offense.get_or_insert(*team);
                p.phase = Phase::FreeThrows;
                last_shot_team = Some(*team);
                if *made {
                    p.points += 1;
                }
                if *last_in_sequence {
                    close_possession(
                        &mut open,
                        &mut possessions,
                        pair,
                        event.clock,
                        EndReason::LastFreeThrow,
                        &mut next_start_clock,
                    );
                }
            }
            EventKind::Rebound { team, .. } => {
                known(*team, event.seq)?;
                ensure_open(&mut open, current_period, next_start_clock);
                let p = open.as_mut().expect("possession just opened");
                if p.phase == Phase::FreeThrows {
                    // Dead-ball rebound between free-throw attempts.
                    continue;
                }
                let defensive = match last_shot_team {
                    Some(shot_team) => *team != shot_team,
                    // No shot on record: the original data's documented
                    // default is to treat the board as defensive.
                    None => true,
                };
                if defensive {
                    close_possession(
                        &mut open,
                        &mut possessions,
                        pair,
                        event.clock,
                        EndReason::DefensiveRebound,
                        &mut next_start_clock,
                    );
                } else {
                    p.offense.get_or_insert(*team);
                }
            }
            EventKind::Turnover { team, .. } => {
                known(*team, event.seq)?;
                ensure_open(&mut open, current_period, next_start_clock);
                let p = open.as_mut().expect("possession just opened");
                p.offense.get_or_insert(*team);
                close_possession(
                    &mut open,
                    &mut possessions,
                    pair,
                    event.clock,
                    EndReason::Turnover,
                    &mut next_start_clock,
                );
            }
            EventKind::PeriodEnd => {
                close_possession(
                    &mut open,
                    &mut possessions,
                    pair,
                    event.clock,
                    EndReason::PeriodEnd,
                    &mut next_start_clock,
                );
                last_shot_team = None;
            }
            EventKind::Substitution { .. } | EventKind::Foul { .. } | EventKind::Other { .. } => {}
        }
    }

    // A truncated log without its final period-end row still closes.
    close_possession(
        &mut open,
        &mut possessions,
        pair,
        last_clock,
        EndReason::PeriodEnd,
        &mut next_start_clock,
    );

    Ok(possessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const HOME: TeamId = 10;
    const AWAY: TeamId = 20;

    fn seed() -> GameSeed {
        let mut starters = BTreeMap::new();
        starters.insert(HOME, vec![1, 2, 3, 4, 5]);
        starters.insert(AWAY, vec![6, 7, 8, 9, 11]);
        let mut roster = BTreeMap::new();
        for p in 1..=5 {
            roster.insert(p, HOME);
        }
        for p in [6, 7, 8, 9, 11] {
            roster.insert(p, AWAY);
        }
        GameSeed::new(starters, roster, BTreeMap::new())
    }

    fn run(events: &[Event]) -> Vec<Possession> {
        segment(events, &seed(), &Config::default()).unwrap()
    }

    #[test]
    fn made_shot_closes_with_its_points() {
        let events = vec![
            Event::made_shot(1, 1, 700, HOME, 1, 3),
            Event::period_end(2, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 1);
        let p = &possessions[0];
        assert_eq!(p.offense, HOME);
        assert_eq!(p.defense, AWAY);
        assert_eq!(p.start_clock, 720);
        assert_eq!(p.end_clock, 700);
        assert_eq!(p.points, 3);
        assert_eq!(p.end_reason, EndReason::MadeShot);
    }

    #[test]
    fn defensive_rebound_closes_scoreless_possession() {
        let events = vec![
            Event::missed_shot(1, 1, 700, HOME, 1),
            Event::rebound(2, 1, 698, AWAY, Some(6)),
            Event::period_end(3, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions[0].end_reason, EndReason::DefensiveRebound);
        assert_eq!(possessions[0].offense, HOME);
        assert_eq!(possessions[0].points, 0);
        assert_eq!(possessions[0].end_clock, 698);
    }

    #[test]
    fn offensive_rebound_keeps_the_possession_open() {
        let events = vec![
            Event::missed_shot(1, 1, 700, HOME, 1),
            Event::rebound(2, 1, 698, HOME, Some(2)),
            Event::made_shot(3, 1, 690, HOME, 2, 2),
            Event::period_end(4, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 1);
        assert_eq!(possessions[0].points, 2);
        assert_eq!(possessions[0].end_reason, EndReason::MadeShot);
        assert_eq!(possessions[0].end_clock, 690);
    }

    #[test]
    fn turnover_always_closes() {
        let events = vec![
            Event::turnover(1, 1, 650, AWAY, Some(6)),
            Event::period_end(2, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions[0].offense, AWAY);
        assert_eq!(possessions[0].defense, HOME);
        assert_eq!(possessions[0].end_reason, EndReason::Turnover);
    }

    #[test]
    fn free_throw_run_closes_only_on_the_last_attempt() {
        // Made shot with a foul drawn, then a two-attempt run.
        let events = vec![
            Event::made_shot(1, 1, 500, HOME, 1, 2),
            Event::foul(2, 1, 500, AWAY, Some(6), Some(1), true),
            Event::free_throw(3, 1, 500, HOME, 1, true, false),
            Event::free_throw(4, 1, 500, HOME, 1, true, true),
            Event::period_end(5, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 1);
        let p = &possessions[0];
        assert_eq!(p.points, 4);
        assert_eq!(p.end_reason, EndReason::LastFreeThrow);
    }

    #[test]
    fn and_one_closes_after_the_free_throw_not_the_shot() {
        let events = vec![
            Event::made_shot(1, 1, 480, HOME, 1, 2),
            Event::foul(2, 1, 479, AWAY, Some(6), Some(1), true),
            Event::free_throw(3, 1, 479, HOME, 1, true, true),
            Event::turnover(4, 1, 400, AWAY, Some(7)),
            Event::period_end(5, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 2);
        assert_eq!(possessions[0].points, 3);
        assert_eq!(possessions[0].end_reason, EndReason::LastFreeThrow);
        assert_eq!(possessions[0].end_clock, 479);
        // The next possession starts where the and-1 ended.
        assert_eq!(possessions[1].start_clock, 479);
        assert_eq!(possessions[1].offense, AWAY);
    }

    #[test]
    fn foul_outside_the_window_is_not_an_and_one() {
        let events = vec![
            Event::made_shot(1, 1, 480, HOME, 1, 2),
            Event::foul(2, 1, 470, AWAY, Some(6), Some(1), true),
            Event::period_end(3, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions[0].end_reason, EndReason::MadeShot);
        assert_eq!(possessions[0].end_clock, 480);
    }

    #[test]
    fn foul_on_a_different_player_is_not_an_and_one() {
        let events = vec![
            Event::made_shot(1, 1, 480, HOME, 1, 2),
            Event::foul(2, 1, 479, AWAY, Some(6), Some(2), true),
            Event::period_end(3, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions[0].end_reason, EndReason::MadeShot);
    }

    #[test]
    fn dead_ball_rebound_between_free_throws_is_ignored() {
        let events = vec![
            Event::missed_shot(1, 1, 500, HOME, 1),
            Event::foul(2, 1, 500, AWAY, Some(6), Some(1), true),
            Event::free_throw(3, 1, 500, HOME, 1, false, false),
            Event::rebound(4, 1, 500, AWAY, None),
            Event::free_throw(5, 1, 500, HOME, 1, true, true),
            Event::period_end(6, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 1);
        assert_eq!(possessions[0].points, 1);
        assert_eq!(possessions[0].end_reason, EndReason::LastFreeThrow);
    }

    #[test]
    fn period_end_force_closes_with_accumulated_points() {
        let events = vec![
            Event::made_shot(1, 1, 30, HOME, 1, 2),
            Event::foul(2, 1, 29, AWAY, Some(6), Some(1), true),
            Event::free_throw(3, 1, 29, HOME, 1, true, false),
            Event::period_end(4, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 1);
        assert_eq!(possessions[0].points, 3);
        assert_eq!(possessions[0].end_reason, EndReason::PeriodEnd);
        assert_eq!(possessions[0].end_clock, 0);
    }

    #[test]
    fn possession_chain_starts_where_the_previous_ended() {
        let events = vec![
            Event::made_shot(1, 1, 700, HOME, 1, 2),
            Event::turnover(2, 1, 650, AWAY, Some(6)),
            Event::missed_shot(3, 1, 600, HOME, 2),
            Event::rebound(4, 1, 598, AWAY, Some(7)),
            Event::period_end(5, 1),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 3);
        assert_eq!(
            (possessions[0].start_clock, possessions[0].end_clock),
            (720, 700)
        );
        assert_eq!(
            (possessions[1].start_clock, possessions[1].end_clock),
            (700, 650)
        );
        assert_eq!(
            (possessions[2].start_clock, possessions[2].end_clock),
            (650, 598)
        );
    }

    #[test]
    fn periods_are_segmented_independently() {
        let events = vec![
            Event::made_shot(1, 1, 20, HOME, 1, 2),
            Event::period_end(2, 1),
            Event::made_shot(3, 2, 700, AWAY, 6, 3),
            Event::period_end(4, 2),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 2);
        assert_eq!(possessions[1].period, 2);
        assert_eq!(possessions[1].start_clock, 720);
        assert_eq!(possessions[1].offense, AWAY);
    }

    #[test]
    fn missing_period_end_row_still_closes_at_the_boundary() {
        let events = vec![
            Event::missed_shot(1, 1, 20, HOME, 1),
            Event::made_shot(2, 2, 700, AWAY, 6, 2),
            Event::period_end(3, 2),
        ];
        let possessions = run(&events);
        assert_eq!(possessions.len(), 2);
        assert_eq!(possessions[0].period, 1);
        assert_eq!(possessions[0].end_clock, 0);
        assert_eq!(possessions[0].end_reason, EndReason::PeriodEnd);
    }

    #[test]
    fn span_with_no_attributable_offense_is_dropped() {
        let events = vec![
            Event::foul(1, 1, 700, AWAY, Some(6), Some(1), false),
            Event::period_end(2, 1),
        ];
        assert!(run(&events).is_empty());
    }

    #[test]
    fn unknown_team_is_fatal() {
        let events = vec![Event::made_shot(1, 1, 700, 99, 1, 2)];
        let err = segment(&events, &seed(), &Config::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownTeam { team: 99, seq: 1 }));
    }

    #[test]
    fn possession_round_trip_serialize() {
        let possessions = run(&[
            Event::made_shot(1, 1, 700, HOME, 1, 2),
            Event::period_end(2, 1),
        ]);
        let json = serde_json::to_string(&possessions).unwrap();
        assert!(json.contains("\"made_shot\""));
        let back: Vec<Possession> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, possessions);
    }
}
