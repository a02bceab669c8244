use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use tempo_core::{
    Direction, Error, Event, EventKind, GameSeed, PlayerId, Provenance, Seq, StatusChange, TeamId,
};

/// Per-team on-court sets, seeded from the starting lineups and mutated
/// one transition at a time. The tracker is the single owner of court
/// state; inference and the boundary logic go through it rather than
/// keeping shadow copies.
#[derive(Debug, Clone)]
pub struct CourtTracker {
    on_court: BTreeMap<TeamId, BTreeSet<PlayerId>>,
    last_seq: Option<Seq>,
}

/// Result of applying one explicit substitution.
#[derive(Debug, Clone)]
pub struct SubOutcome {
    pub changes: Vec<StatusChange>,
    /// Set when the event disagreed with tracked state and a forced
    /// correction was applied.
    pub degraded: bool,
}

impl CourtTracker {
    /// Seed court state from the starting lineups. Fails on a seed that
    /// cannot initialize the tracker (missing or malformed starting five).
    pub fn from_seed(seed: &GameSeed) -> Result<Self, Error> {
        seed.validate()?;
        let on_court = seed
            .starters
            .iter()
            .map(|(&team, players)| (team, players.iter().copied().collect()))
            .collect();
        Ok(Self {
            on_court,
            last_seq: None,
        })
    }

    /// Enforce strictly increasing sequence order. The driving loop calls
    /// this once per event, before any state mutation for that event.
    pub fn observe_seq(&mut self, seq: Seq) -> Result<(), Error> {
        if let Some(last) = self.last_seq {
            if seq <= last {
                return Err(Error::OutOfOrderEvent { seq, last });
            }
        }
        self.last_seq = Some(seq);
        Ok(())
    }

    pub fn on_court(&self, team: TeamId) -> Option<&BTreeSet<PlayerId>> {
        self.on_court.get(&team)
    }

    pub fn is_on_court(&self, team: TeamId, player: PlayerId) -> bool {
        self.on_court
            .get(&team)
            .is_some_and(|set| set.contains(&player))
    }

    /// Whether every team currently has exactly five players tracked.
    pub fn is_regulation(&self) -> bool {
        self.on_court.values().all(|set| set.len() == 5)
    }

    /// Iterate `(team, player)` over everyone currently on court, in
    /// deterministic id order.
    pub fn all_on_court(&self) -> impl Iterator<Item = (TeamId, PlayerId)> + '_ {
        self.on_court
            .iter()
            .flat_map(|(&team, set)| set.iter().map(move |&player| (team, player)))
    }

    /// Apply an explicit substitution event, emitting the pair of status
    /// changes for the interval builder.
    ///
    /// An outgoing player who is not tracked on court is an inconsistency:
    /// the player is forced on court and removed again (a net no-op on the
    /// set), the emitted changes are tagged degraded, and processing
    /// continues. A resulting set size other than five is reported by
    /// [`CourtTracker::is_regulation`] and propagates to downstream
    /// lineup-incomplete flags rather than being repaired by guesswork.
    pub fn apply_substitution(&mut self, event: &Event) -> Result<SubOutcome, Error> {
        let (team, player_out, player_in) = match event.kind {
            EventKind::Substitution {
                team,
                player_out,
                player_in,
            } => (team, player_out, player_in),
            _ => {
                return Err(Error::malformed(
                    event.seq,
                    "apply_substitution called with a non-substitution event",
                ))
            }
        };

        let set = self
            .on_court
            .get_mut(&team)
            .ok_or(Error::UnknownTeam {
                team,
                seq: event.seq,
            })?;

        let mut degraded = false;
        if !set.remove(&player_out) {
            degraded = true;
            warn!(
                seq = event.seq,
                team,
                player = player_out,
                "substitution removes a player not tracked on court; forcing correction"
            );
        }
        if !set.insert(player_in) {
            degraded = true;
            warn!(
                seq = event.seq,
                team,
                player = player_in,
                "substitution inserts a player already tracked on court"
            );
        }
        if set.len() != 5 {
            warn!(
                seq = event.seq,
                team,
                size = set.len(),
                "court set is off regulation size after substitution"
            );
        }

        let change = |player: PlayerId, direction: Direction| StatusChange {
            seq: event.seq,
            period: event.period,
            clock: event.clock,
            wall_clock: event.wall_clock,
            team,
            player,
            direction,
            provenance: Provenance::Explicit,
            degraded,
        };

        Ok(SubOutcome {
            changes: vec![
                change(player_out, Direction::Out),
                change(player_in, Direction::In),
            ],
            degraded,
        })
    }

    /// Swap `player_out` for `player_in` on `team` without emitting
    /// changes. Used by activity inference, which builds its own inferred
    /// status changes. Returns false when the tracked state disagreed with
    /// either half of the swap.
    pub fn swap(&mut self, team: TeamId, player_out: PlayerId, player_in: PlayerId) -> bool {
        match self.on_court.get_mut(&team) {
            Some(set) => {
                let removed = set.remove(&player_out);
                let inserted = set.insert(player_in);
                removed && inserted
            }
            None => false,
        }
    }
}
