use std::collections::{BTreeMap, BTreeSet};

use tempo_core::{PlayerId, Seq, SwapPolicyKind};

/// Evidence available to a swap-out policy when activity inference must
/// pick the teammate who leaves the court for an inferred re-entry.
pub struct SwapContext<'a> {
    /// Last recorded activity seq per player. Players with no recorded
    /// activity are absent and rank as idle since seq 0.
    pub last_activity: &'a BTreeMap<PlayerId, Seq>,
}

/// The chosen victim plus whether the choice was a coin flip between
/// equally plausible candidates. Ambiguous choices are still
/// deterministic, but they are flagged so the uncertainty stays visible
/// in the derived intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChoice {
    pub player: PlayerId,
    pub ambiguous: bool,
}

/// Which on-court teammate to substitute out when an off-court player
/// shows activity. The data underdetermines this, so the rule is a
/// replaceable strategy: implementations must be deterministic for a
/// given candidate set and context.
pub trait SwapOutPolicy {
    fn name(&self) -> &'static str;

    /// Pick a victim from a non-empty candidate set.
    fn pick(&self, candidates: &BTreeSet<PlayerId>, ctx: &SwapContext<'_>) -> SwapChoice;
}

/// Default policy: the teammate idle the longest, measured by last
/// recorded activity seq; never-active players rank oldest. Exact ties
/// resolve to the lowest player id and are flagged ambiguous.
pub struct LongestIdlePolicy;

impl SwapOutPolicy for LongestIdlePolicy {
    fn name(&self) -> &'static str {
        "longest_idle"
    }

    fn pick(&self, candidates: &BTreeSet<PlayerId>, ctx: &SwapContext<'_>) -> SwapChoice {
        let idle_since =
            |player: PlayerId| ctx.last_activity.get(&player).copied().unwrap_or(0);
        // Keying on (activity seq, id) makes the minimum unique, so ties
        // on idleness resolve to the lowest player id.
        let player = candidates
            .iter()
            .copied()
            .min_by_key(|&p| (idle_since(p), p))
            .expect("policy invoked with an empty candidate set");
        let ambiguous = candidates
            .iter()
            .filter(|&&p| idle_since(p) == idle_since(player))
            .count()
            > 1;
        SwapChoice { player, ambiguous }
    }
}

/// Baseline policy: lowest player id, unconditionally. Useful when
/// evaluating how much the idle heuristic actually buys.
pub struct LowestPlayerIdPolicy;

impl SwapOutPolicy for LowestPlayerIdPolicy {
    fn name(&self) -> &'static str {
        "lowest_player_id"
    }

    fn pick(&self, candidates: &BTreeSet<PlayerId>, _ctx: &SwapContext<'_>) -> SwapChoice {
        let player = *candidates
            .iter()
            .next()
            .expect("policy invoked with an empty candidate set");
        SwapChoice {
            player,
            ambiguous: false,
        }
    }
}

/// Resolve the configured policy selection to an implementation.
pub fn policy_for(kind: SwapPolicyKind) -> Box<dyn SwapOutPolicy> {
    match kind {
        SwapPolicyKind::LongestIdle => Box::new(LongestIdlePolicy),
        SwapPolicyKind::LowestPlayerId => Box::new(LowestPlayerIdPolicy),
    }
}
