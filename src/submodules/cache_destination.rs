//! Keep bids in the cache; nothing is delivered.

use super::{DestinationSubmodule, names};
use crate::MatchObject;
use tracing::info;

pub struct CacheDestination;

impl DestinationSubmodule for CacheDestination {
    fn name(&self) -> &str {
        names::DESTINATION_CACHE
    }

    fn send(&self, matches: Vec<MatchObject>) {
        let codes: Vec<&str> = matches.iter().filter_map(|m| m.unit.as_ref()).map(|u| u.code.as_str()).collect();
        if !codes.is_empty() {
            info!(?codes, "cached bids");
        }
    }
}
