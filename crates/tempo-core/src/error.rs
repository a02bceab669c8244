use thiserror::Error;

use crate::types::{PlayerId, Seq, TeamId};

/// Fatal conditions that abort processing of a single game.
///
/// Recovered conditions (substitution inconsistency, inference ambiguity,
/// incomplete lineups) are deliberately not represented here: they are
/// expressed as `degraded` / `lineup_incomplete` flags and counters in the
/// output schema so they stay visible downstream.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed event at seq {seq}: {detail}")]
    MalformedEvent { seq: Seq, detail: String },

    #[error("no starting lineup recorded for team {team}")]
    MissingStartingLineup { team: TeamId },

    #[error("starting lineup for team {team} has {count} distinct players, expected 5")]
    InvalidStartingLineup { team: TeamId, count: usize },

    #[error("seed names {count} teams, expected exactly 2")]
    WrongTeamCount { count: usize },

    #[error("starter {player} is absent from the roster or mapped to another team")]
    RosterMismatch { player: PlayerId },

    #[error("event seq {seq} is not after previously applied seq {last}")]
    OutOfOrderEvent { seq: Seq, last: Seq },

    #[error("event at seq {seq} references team {team}, which is not in the seed")]
    UnknownTeam { team: TeamId, seq: Seq },
}

impl Error {
    /// Shorthand for the required-field failures raised while narrowing a
    /// raw feed row into a typed event.
    pub fn malformed(seq: Seq, detail: impl Into<String>) -> Self {
        Error::MalformedEvent {
            seq,
            detail: detail.into(),
        }
    }
}
