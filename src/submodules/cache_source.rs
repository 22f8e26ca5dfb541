//! Bids from the latest auction, with a fresh auction for misses.

use super::{ReadyCallback, SourceSubmodule, names};
use crate::engine::AuctionTracker;
use crate::{AuctionResult, MatchObject, TransactionObject};
use chrono::Utc;
use std::rc::Rc;
use tracing::{debug, info};

/// Serves matches from the [`AuctionTracker`] when a usable bid is cached.
///
/// Matches without one are handed to `fallback` (normally the auction
/// source), so a cache miss is never dropped. Hits and misses reach the
/// destination in separate calls; empty partitions are not forwarded.
pub struct CacheSource {
    tracker: Rc<AuctionTracker>,
    fallback: Rc<dyn SourceSubmodule>,
}

impl CacheSource {
    pub fn new(tracker: Rc<AuctionTracker>, fallback: Rc<dyn SourceSubmodule>) -> Self {
        Self { tracker, fallback }
    }

    /// Cached result for `m` restricted to usable bids, if any remain.
    fn cached(&self, m: &MatchObject, now_ms: i64) -> Option<AuctionResult> {
        let unit = m.unit.as_ref()?;
        let latest = self.tracker.latest_auction(&unit.code)?;
        let bids: Vec<_> = latest.bids.into_iter().filter(|b| b.is_usable(now_ms)).collect();
        (!bids.is_empty()).then(|| AuctionResult { bids, ..latest })
    }
}

impl SourceSubmodule for CacheSource {
    fn name(&self) -> &str {
        names::SOURCE_CACHE
    }

    fn validate(&self, request: &TransactionObject) -> Result<(), String> {
        if request.destination.name() == names::DESTINATION_CACHE {
            return Err("cache source can't deliver to the cache destination".to_string());
        }
        Ok(())
    }

    fn request_bids(&self, matches: Vec<MatchObject>, on_ready: ReadyCallback) {
        let now_ms = Utc::now().timestamp_millis();
        let mut ready = Vec::new();
        let mut misses = Vec::new();
        for mut m in matches {
            if !m.is_matched() {
                ready.push(m);
                continue;
            }
            match self.cached(&m, now_ms) {
                Some(values) => {
                    m.values = Some(values);
                    ready.push(m);
                }
                None => misses.push(m),
            }
        }

        debug!(ready = ready.len(), misses = misses.len(), "partitioned matches by cached bids");
        if !ready.is_empty() {
            on_ready(ready);
        }
        if !misses.is_empty() {
            info!(misses = misses.len(), fallback = %self.fallback.name(), "no usable cached bids; auctioning");
            self.fallback.request_bids(misses, on_ready);
        }
    }
}
