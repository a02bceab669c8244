use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{PlayerId, TeamId};

/// External per-game seed data sourced from the box score: who started,
/// which team every player belongs to, and recorded minutes for the
/// divergence audit. The engine cannot start without a valid seed, so
/// [`GameSeed::validate`] is fatal where the event-stream heuristics are
/// not.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GameSeed {
    /// Starting five per team.
    pub starters: BTreeMap<TeamId, Vec<PlayerId>>,
    /// Player to team mapping for everyone in the box score.
    pub roster: BTreeMap<PlayerId, TeamId>,
    /// Recorded minutes played per player. Missing players audit as 0.0.
    #[serde(default)]
    pub box_minutes: BTreeMap<PlayerId, f64>,
}

impl GameSeed {
    pub fn new(
        starters: BTreeMap<TeamId, Vec<PlayerId>>,
        roster: BTreeMap<PlayerId, TeamId>,
        box_minutes: BTreeMap<PlayerId, f64>,
    ) -> Self {
        Self {
            starters,
            roster,
            box_minutes,
        }
    }

    /// The two teams of this game, in ascending id order.
    pub fn teams(&self) -> Result<(TeamId, TeamId), Error> {
        let teams: Vec<TeamId> = self.starters.keys().copied().collect();
        match teams.as_slice() {
            [a, b] => Ok((*a, *b)),
            other => Err(Error::WrongTeamCount { count: other.len() }),
        }
    }

    /// The opposing team id, assuming `team` is one of the two.
    pub fn opponent_of(&self, team: TeamId) -> Result<TeamId, Error> {
        let (a, b) = self.teams()?;
        Ok(if team == a { b } else { a })
    }

    /// Which team a player belongs to, per the roster.
    pub fn team_of(&self, player: PlayerId) -> Option<TeamId> {
        self.roster.get(&player).copied()
    }

    /// Check the structural contract: exactly two teams, five distinct
    /// starters each, every starter present in the roster on the right
    /// team. Any failure here aborts the game's derivation.
    pub fn validate(&self) -> Result<(), Error> {
        let (a, b) = self.teams()?;
        for team in [a, b] {
            let starters = self
                .starters
                .get(&team)
                .filter(|s| !s.is_empty())
                .ok_or(Error::MissingStartingLineup { team })?;
            let distinct: BTreeSet<PlayerId> = starters.iter().copied().collect();
            if distinct.len() != 5 || starters.len() != 5 {
                return Err(Error::InvalidStartingLineup {
                    team,
                    count: distinct.len(),
                });
            }
            for &player in starters {
                if self.roster.get(&player) != Some(&team) {
                    return Err(Error::RosterMismatch { player });
                }
            }
        }
        Ok(())
    }
}
