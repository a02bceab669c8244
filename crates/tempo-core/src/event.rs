use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Period, PlayerId, Seq, TeamId};

// ── Raw feed rows ──

/// Event-type tag of a raw play-by-play row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RawKind {
    MadeShot,
    MissedShot,
    FreeThrow,
    Rebound,
    Turnover,
    Foul,
    Violation,
    Substitution,
    Timeout,
    PeriodEnd,
    Other,
}

/// A loosely-typed play-by-play row as the upstream feed delivers it:
/// every player slot is optional and most flags are only meaningful for
/// some kinds. Slot conventions follow the feed: substitutions carry the
/// outgoing player in slot 1 and the incoming player in slot 2; shots
/// carry the shooter in slot 1 and an assist in slot 2; fouls carry the
/// committing player in slot 1 and the player who drew it in slot 2.
///
/// [`Event::try_from`] narrows a row into the closed typed variant set,
/// failing fast on a missing required field instead of letting an empty
/// value propagate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEvent {
    pub seq: Seq,
    pub period: Period,
    /// Game clock, seconds remaining in the period.
    pub clock: u32,
    /// Opaque monotone wall-clock stamp from the feed.
    pub wall_clock: i64,
    pub kind: RawKind,
    #[serde(default)]
    pub team: Option<TeamId>,
    #[serde(default)]
    pub player1: Option<PlayerId>,
    #[serde(default)]
    pub player2: Option<PlayerId>,
    #[serde(default)]
    pub player3: Option<PlayerId>,
    /// Points scored on this row (shot value, or 1 for a made free throw).
    #[serde(default)]
    pub points: u8,
    /// Free throws only: whether this attempt is the last of its sequence.
    #[serde(default)]
    pub last_free_throw: bool,
    /// Fouls only: whether the foul occurred on a shot attempt.
    #[serde(default)]
    pub shooting_foul: bool,
}

// ── Typed events ──

/// A validated game-log event. `seq` defines the strict total order;
/// `clock` counts down within `period`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub seq: Seq,
    pub period: Period,
    pub clock: u32,
    pub wall_clock: i64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Substitution {
        team: TeamId,
        player_out: PlayerId,
        player_in: PlayerId,
    },
    Shot {
        team: TeamId,
        shooter: PlayerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assist: Option<PlayerId>,
        made: bool,
        /// Points value of the attempt, 2 or 3.
        value: u8,
    },
    Rebound {
        team: TeamId,
        /// Team rebounds carry no player.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rebounder: Option<PlayerId>,
    },
    Turnover {
        team: TeamId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<PlayerId>,
    },
    FreeThrow {
        team: TeamId,
        shooter: PlayerId,
        made: bool,
        last_in_sequence: bool,
    },
    Foul {
        team: TeamId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        committed_by: Option<PlayerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        drawn_by: Option<PlayerId>,
        shooting: bool,
    },
    PeriodEnd,
    /// Violations, jump balls, timeouts and anything else that only
    /// matters as evidence of who is on the floor.
    Other {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team: Option<TeamId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        players: Vec<PlayerId>,
    },
}

impl Event {
    fn new(seq: Seq, period: Period, clock: u32, kind: EventKind) -> Self {
        Self {
            seq,
            period,
            clock,
            wall_clock: 0,
            kind,
        }
    }

    /// Attach the feed's wall-clock stamp.
    pub fn with_wall_clock(mut self, wall_clock: i64) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    pub fn substitution(
        seq: Seq,
        period: Period,
        clock: u32,
        team: TeamId,
        player_out: PlayerId,
        player_in: PlayerId,
    ) -> Self {
        Self::new(
            seq,
            period,
            clock,
            EventKind::Substitution {
                team,
                player_out,
                player_in,
            },
        )
    }

    pub fn made_shot(
        seq: Seq,
        period: Period,
        clock: u32,
        team: TeamId,
        shooter: PlayerId,
        value: u8,
    ) -> Self {
        Self::new(
            seq,
            period,
            clock,
            EventKind::Shot {
                team,
                shooter,
                assist: None,
                made: true,
                value,
            },
        )
    }

    pub fn missed_shot(
        seq: Seq,
        period: Period,
        clock: u32,
        team: TeamId,
        shooter: PlayerId,
    ) -> Self {
        Self::new(
            seq,
            period,
            clock,
            EventKind::Shot {
                team,
                shooter,
                assist: None,
                made: false,
                value: 2,
            },
        )
    }

    /// Set the assist on a shot event; no-op for other kinds.
    pub fn with_assist(mut self, player: PlayerId) -> Self {
        if let EventKind::Shot { ref mut assist, .. } = self.kind {
            *assist = Some(player);
        }
        self
    }

    pub fn rebound(
        seq: Seq,
        period: Period,
        clock: u32,
        team: TeamId,
        rebounder: Option<PlayerId>,
    ) -> Self {
        Self::new(seq, period, clock, EventKind::Rebound { team, rebounder })
    }

    pub fn turnover(
        seq: Seq,
        period: Period,
        clock: u32,
        team: TeamId,
        player: Option<PlayerId>,
    ) -> Self {
        Self::new(seq, period, clock, EventKind::Turnover { team, player })
    }

    pub fn free_throw(
        seq: Seq,
        period: Period,
        clock: u32,
        team: TeamId,
        shooter: PlayerId,
        made: bool,
        last_in_sequence: bool,
    ) -> Self {
        Self::new(
            seq,
            period,
            clock,
            EventKind::FreeThrow {
                team,
                shooter,
                made,
                last_in_sequence,
            },
        )
    }

    pub fn foul(
        seq: Seq,
        period: Period,
        clock: u32,
        team: TeamId,
        committed_by: Option<PlayerId>,
        drawn_by: Option<PlayerId>,
        shooting: bool,
    ) -> Self {
        Self::new(
            seq,
            period,
            clock,
            EventKind::Foul {
                team,
                committed_by,
                drawn_by,
                shooting,
            },
        )
    }

    pub fn period_end(seq: Seq, period: Period) -> Self {
        Self::new(seq, period, 0, EventKind::PeriodEnd)
    }

    pub fn other(
        seq: Seq,
        period: Period,
        clock: u32,
        team: Option<TeamId>,
        players: Vec<PlayerId>,
    ) -> Self {
        Self::new(seq, period, clock, EventKind::Other { team, players })
    }

    /// The team this event is attributed to, when it has one.
    pub fn team(&self) -> Option<TeamId> {
        match self.kind {
            EventKind::Substitution { team, .. }
            | EventKind::Shot { team, .. }
            | EventKind::Rebound { team, .. }
            | EventKind::Turnover { team, .. }
            | EventKind::FreeThrow { team, .. }
            | EventKind::Foul { team, .. } => Some(team),
            EventKind::Other { team, .. } => team,
            EventKind::PeriodEnd => None,
        }
    }

    /// Every player the event names. Used by activity inference as
    /// evidence of court presence; team resolution goes through the
    /// roster, since a foul's drawn-by player belongs to the opponent of
    /// the committing team. Substitutions are excluded: the tracker owns
    /// those, and naming their players here would make every missed
    /// re-entry self-confirming.
    pub fn players_involved(&self) -> Vec<PlayerId> {
        match &self.kind {
            EventKind::Substitution { .. } | EventKind::PeriodEnd => Vec::new(),
            EventKind::Shot {
                shooter, assist, ..
            } => {
                let mut players = vec![*shooter];
                players.extend(assist.iter().copied());
                players
            }
            EventKind::Rebound { rebounder, .. } => rebounder.iter().copied().collect(),
            EventKind::Turnover { player, .. } => player.iter().copied().collect(),
            EventKind::FreeThrow { shooter, .. } => vec![*shooter],
            EventKind::Foul {
                committed_by,
                drawn_by,
                ..
            } => committed_by.iter().chain(drawn_by.iter()).copied().collect(),
            EventKind::Other { players, .. } => players.clone(),
        }
    }
}

// ── Raw → typed narrowing ──

impl TryFrom<RawEvent> for Event {
    type Error = Error;

    fn try_from(raw: RawEvent) -> Result<Self, Error> {
        let seq = raw.seq;
        let team = |field: &str| {
            raw.team
                .ok_or_else(|| Error::malformed(seq, format!("{field} row missing team id")))
        };
        let player = |slot: Option<PlayerId>, what: &str| {
            slot.ok_or_else(|| Error::malformed(seq, format!("{what} missing")))
        };

        let kind = match raw.kind {
            RawKind::Substitution => EventKind::Substitution {
                team: team("substitution")?,
                player_out: player(raw.player1, "substitution outgoing player id")?,
                player_in: player(raw.player2, "substitution incoming player id")?,
            },
            RawKind::MadeShot => {
                if raw.points != 2 && raw.points != 3 {
                    return Err(Error::malformed(
                        seq,
                        format!("made shot with points {} outside 2..=3", raw.points),
                    ));
                }
                EventKind::Shot {
                    team: team("shot")?,
                    shooter: player(raw.player1, "shot shooter id")?,
                    assist: raw.player2,
                    made: true,
                    value: raw.points,
                }
            }
            RawKind::MissedShot => EventKind::Shot {
                team: team("shot")?,
                shooter: player(raw.player1, "shot shooter id")?,
                assist: None,
                made: false,
                // Attempt value is not reliably present on misses.
                value: if raw.points == 3 { 3 } else { 2 },
            },
            RawKind::FreeThrow => EventKind::FreeThrow {
                team: team("free throw")?,
                shooter: player(raw.player1, "free throw shooter id")?,
                made: raw.points > 0,
                last_in_sequence: raw.last_free_throw,
            },
            RawKind::Rebound => EventKind::Rebound {
                team: team("rebound")?,
                rebounder: raw.player1,
            },
            RawKind::Turnover => EventKind::Turnover {
                team: team("turnover")?,
                player: raw.player1,
            },
            RawKind::Foul => EventKind::Foul {
                team: team("foul")?,
                committed_by: raw.player1,
                drawn_by: raw.player2,
                shooting: raw.shooting_foul,
            },
            RawKind::PeriodEnd => EventKind::PeriodEnd,
            RawKind::Violation | RawKind::Timeout | RawKind::Other => EventKind::Other {
                team: raw.team,
                players: [raw.player1, raw.player2, raw.player3]
                    .into_iter()
                    .flatten()
                    .collect(),
            },
        };

        Ok(Event {
            seq: raw.seq,
            period: raw.period,
            clock: raw.clock,
            wall_clock: raw.wall_clock,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: RawKind) -> RawEvent {
        RawEvent {
            seq: 1,
            period: 1,
            clock: 700,
            wall_clock: 100,
            kind,
            team: Some(10),
            player1: None,
            player2: None,
            player3: None,
            points: 0,
            last_free_throw: false,
            shooting_foul: false,
        }
    }

    #[test]
    fn substitution_requires_both_player_slots() {
        let mut row = raw(RawKind::Substitution);
        row.player1 = Some(7);
        let err = Event::try_from(row.clone()).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { seq: 1, .. }));

        row.player2 = Some(8);
        let event = Event::try_from(row).unwrap();
        assert_eq!(
            event.kind,
            EventKind::Substitution {
                team: 10,
                player_out: 7,
                player_in: 8,
            }
        );
    }

    #[test]
    fn made_shot_requires_sane_points() {
        let mut row = raw(RawKind::MadeShot);
        row.player1 = Some(7);
        row.points = 4;
        assert!(Event::try_from(row.clone()).is_err());

        row.points = 3;
        let event = Event::try_from(row).unwrap();
        match event.kind {
            EventKind::Shot { made, value, .. } => {
                assert!(made);
                assert_eq!(value, 3);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn rows_without_team_are_rejected() {
        let mut row = raw(RawKind::Turnover);
        row.team = None;
        assert!(Event::try_from(row).is_err());
    }

    #[test]
    fn free_throw_made_comes_from_points() {
        let mut row = raw(RawKind::FreeThrow);
        row.player1 = Some(7);
        row.points = 1;
        row.last_free_throw = true;
        let event = Event::try_from(row).unwrap();
        assert_eq!(
            event.kind,
            EventKind::FreeThrow {
                team: 10,
                shooter: 7,
                made: true,
                last_in_sequence: true,
            }
        );
    }

    #[test]
    fn timeout_narrows_to_other() {
        let mut row = raw(RawKind::Timeout);
        row.player1 = Some(3);
        row.player3 = Some(5);
        let event = Event::try_from(row).unwrap();
        assert_eq!(
            event.kind,
            EventKind::Other {
                team: Some(10),
                players: vec![3, 5],
            }
        );
    }

    #[test]
    fn players_involved_covers_both_sides_of_a_foul() {
        let event = Event::foul(9, 2, 300, 20, Some(4), Some(11), true);
        assert_eq!(event.players_involved(), vec![4, 11]);
    }

    #[test]
    fn players_involved_skips_substitutions() {
        let event = Event::substitution(3, 1, 650, 10, 7, 8);
        assert!(event.players_involved().is_empty());
    }

    #[test]
    fn shot_with_assist_names_both_players() {
        let event = Event::made_shot(5, 1, 500, 10, 7, 2).with_assist(9);
        assert_eq!(event.players_involved(), vec![7, 9]);
    }

    #[test]
    fn event_round_trip_serialize() {
        let event = Event::free_throw(12, 3, 45, 20, 33, true, false).with_wall_clock(9_000);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"free_throw\""));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn period_end_round_trip_serialize() {
        let event = Event::period_end(99, 1);
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.team(), None);
    }
}
