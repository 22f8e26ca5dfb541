//! Fresh auction through the bidding engine.

use super::{ReadyCallback, SourceSubmodule, names};
use crate::collaborators::{AuctionCallback, AuctionOutcome, BiddingEngine};
use crate::engine::AuctionTracker;
use crate::{AdUnit, AuctionResult, MatchObject};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// Sends every built unit of a batch to the bidding engine in one call and
/// forwards the whole batch once the auction completes.
pub struct AuctionSource {
    bidding: Rc<dyn BiddingEngine>,
    tracker: Rc<AuctionTracker>,
}

impl AuctionSource {
    pub fn new(bidding: Rc<dyn BiddingEngine>, tracker: Rc<AuctionTracker>) -> Self {
        Self { bidding, tracker }
    }
}

impl SourceSubmodule for AuctionSource {
    fn name(&self) -> &str {
        names::SOURCE_AUCTION
    }

    fn request_bids(&self, matches: Vec<MatchObject>, on_ready: ReadyCallback) {
        let units: Vec<AdUnit> = matches.iter().filter_map(|m| m.unit.clone()).collect();
        if units.is_empty() {
            debug!(matches = matches.len(), "no units to auction; forwarding");
            on_ready(matches);
            return;
        }

        info!(units = units.len(), "triggering new auction");
        // Whoever takes the batch first delivers it: the completion callback
        // or the error path below. Never both.
        let pending = Rc::new(RefCell::new(Some(matches)));

        let slot = Rc::clone(&pending);
        let tracker = Rc::clone(&self.tracker);
        let ready = Rc::clone(&on_ready);
        let on_complete: AuctionCallback = Box::new(move |outcome: AuctionOutcome| {
            let Some(mut matches) = slot.borrow_mut().take() else {
                warn!(auction_id = %outcome.auction_id, "auction completion arrived after batch was delivered");
                return;
            };
            record_outcome(&tracker, &mut matches, &outcome);
            ready(matches);
        });

        if let Err(err) = self.bidding.auction(units, on_complete) {
            error!(%err, "bidding engine failed; forwarding without bids");
            let taken = pending.borrow_mut().take();
            if let Some(matches) = taken {
                on_ready(matches);
            }
        }
    }
}

/// Attach each unit's bids to its match and remember them as the latest
/// auction for that unit code.
fn record_outcome(tracker: &AuctionTracker, matches: &mut [MatchObject], outcome: &AuctionOutcome) {
    debug!(auction_id = %outcome.auction_id, timed_out = outcome.timed_out, "auction completed");
    for m in matches.iter_mut() {
        let Some(unit) = &m.unit else {
            continue;
        };
        let result = AuctionResult {
            bids: outcome.bids_by_unit.get(&unit.code).cloned().unwrap_or_default(),
            timed_out: outcome.timed_out,
            auction_id: outcome.auction_id.clone(),
        };
        tracker.set_latest_auction(unit.code.clone(), result.clone());
        m.values = Some(result);
    }
}
