//! Exclusive claiming across a batch.
//!
//! Requests are walked strictly in batch order and never revisited. Each one
//! takes the first unclaimed candidate in registration order; later requests
//! cannot take a pattern an earlier one already holds. This is greedy, not a
//! globally optimal assignment, and reversing the batch can change winners.

use super::matcher::MatchContext;
use super::patterns::{AdUnitPattern, PatternId};
use crate::TransactionObject;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Patterns already taken within one `request_bids` call.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    claimed: HashSet<PatternId>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, id: PatternId) -> bool {
        self.claimed.contains(&id)
    }

    /// Returns `false` if `id` was already claimed.
    pub fn claim(&mut self, id: PatternId) -> bool {
        self.claimed.insert(id)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// One output row per input request, in input order.
pub fn assign<'a>(
    ctx: &MatchContext<'a>,
    requests: Vec<TransactionObject>,
    claims: &mut ClaimSet,
) -> Vec<(TransactionObject, Option<&'a AdUnitPattern>)> {
    requests
        .into_iter()
        .map(|request| {
            let claimed = claim_first(ctx, &request, claims);
            (request, claimed)
        })
        .collect()
}

fn claim_first<'a>(
    ctx: &MatchContext<'a>,
    request: &TransactionObject,
    claims: &mut ClaimSet,
) -> Option<&'a AdUnitPattern> {
    let candidates: Vec<&AdUnitPattern> =
        ctx.find_candidates(request).into_iter().filter(|p| !claims.is_claimed(p.id())).collect();

    let Some((&winner, rest)) = candidates.split_first() else {
        debug!(inventory = ?request.inventory, "no placement pattern matched request");
        return None;
    };
    if !rest.is_empty() {
        let discarded: Vec<String> = rest.iter().map(|p| p.label()).collect();
        warn!(
            inventory = ?request.inventory,
            chosen = %winner.label(),
            ?discarded,
            "more than one placement pattern matched; keeping the first registered"
        );
    }
    claims.claim(winner.id());
    Some(winner)
}
