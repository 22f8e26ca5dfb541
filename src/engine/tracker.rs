//! Latest auction outcome per unit code.
//!
//! Shared by the auction source (writer) and the cache source (reader) for
//! the life of the engine. Last writer wins; nothing is ever evicted.

use crate::{AuctionResult, BidStatus};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AuctionTracker {
    latest: RefCell<HashMap<String, AuctionResult>>,
}

impl AuctionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest_auction(&self, unit_code: impl Into<String>, result: AuctionResult) {
        self.latest.borrow_mut().insert(unit_code.into(), result);
    }

    pub fn latest_auction(&self, unit_code: &str) -> Option<AuctionResult> {
        self.latest.borrow().get(unit_code).cloned()
    }

    /// Flag bid `ad_id` of the latest auction for `unit_code` as rendered so
    /// the cache never serves it again. Returns whether the bid was found.
    pub fn mark_rendered(&self, unit_code: &str, ad_id: &str) -> bool {
        let mut latest = self.latest.borrow_mut();
        let Some(bid) = latest.get_mut(unit_code).and_then(|r| r.bids.iter_mut().find(|b| b.ad_id == ad_id)) else {
            return false;
        };
        bid.status = BidStatus::Rendered;
        true
    }

    pub fn len(&self) -> usize {
        self.latest.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.borrow().is_empty()
    }
}
