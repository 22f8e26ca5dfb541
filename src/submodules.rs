//! Pluggable pipeline stages.
//!
//! Every valid request flows through exactly one implementation of each:
//!
//! ```text
//! requests ── Inventory::create_units ──> MatchObjects (request + unit?)
//!                                             │
//!          ── Source::request_bids ──────────┤  attach bids (auction / cache)
//!                                             │  ... possibly much later ...
//!          ── on_ready ── Destination::send ─┘  render / refresh / callback / cache
//! ```
//!
//! There is a single active inventory; sources and destinations are keyed by
//! [`name`](SourceSubmodule::name) and picked per request. The defaults live
//! in this directory and are registered by
//! [`Engine::with_default_submodules`](crate::Engine::with_default_submodules).
//!
//! A source must call `on_ready` for every match it was given, at least once
//! in total. It may split the batch across several calls (the cache source
//! forwards hits right away and misses after a fallback auction).

#[path = "submodules/auction_source.rs"]
mod auction_source;
#[path = "submodules/cache_destination.rs"]
mod cache_destination;
#[path = "submodules/cache_source.rs"]
mod cache_source;
#[path = "submodules/callback_destination.rs"]
mod callback_destination;
#[path = "submodules/inventory.rs"]
mod inventory;
#[path = "submodules/refresh_destination.rs"]
mod refresh_destination;
#[path = "submodules/render_destination.rs"]
mod render_destination;

pub use auction_source::AuctionSource;
pub use cache_destination::CacheDestination;
pub use cache_source::CacheSource;
pub use callback_destination::CallbackDestination;
pub use inventory::PatternInventory;
pub use refresh_destination::RefreshSlotDestination;
pub use render_destination::RenderDestination;

use crate::engine::{ClaimSet, MatchContext};
use crate::error::ValidationError;
use crate::{InventoryKinds, MatchObject, TransactionObject};
use std::rc::Rc;

/// Registry keys of the built-in sources and destinations.
pub mod names {
    pub const SOURCE_AUCTION: &str = "auction";
    pub const SOURCE_CACHE: &str = "cache";
    pub const DESTINATION_RENDER: &str = "render";
    pub const DESTINATION_REFRESH_SLOT: &str = "refresh-slot";
    pub const DESTINATION_CALLBACK: &str = "callback";
    pub const DESTINATION_CACHE: &str = "cache";
}

/// Continuation a source calls with matches that are ready for delivery.
///
/// `Fn`, not `FnOnce`: a source may deliver one batch in several parts.
pub type ReadyCallback = Rc<dyn Fn(Vec<MatchObject>)>;

/// Turns requests into match objects: matching, claiming and unit building.
pub trait InventorySubmodule {
    fn name(&self) -> &str;

    /// Inventory variants this implementation understands.
    fn supported_kinds(&self) -> InventoryKinds;

    /// Variant-specific required fields.
    fn validate(&self, request: &TransactionObject) -> Result<(), ValidationError> {
        let _ = request;
        Ok(())
    }

    /// One match object per request (after any expansion), in request order.
    /// Patterns recorded in `claims` must not be handed out again.
    fn create_units(
        &self,
        ctx: &MatchContext<'_>,
        requests: Vec<TransactionObject>,
        claims: &mut ClaimSet,
    ) -> Vec<MatchObject>;
}

/// Acquires bids for built units.
pub trait SourceSubmodule {
    fn name(&self) -> &str;

    /// Veto a request; the reason ends up in the request's `error`.
    fn validate(&self, request: &TransactionObject) -> Result<(), String> {
        let _ = request;
        Ok(())
    }

    fn request_bids(&self, matches: Vec<MatchObject>, on_ready: ReadyCallback);
}

/// Disposes of matches once bids are available.
pub trait DestinationSubmodule {
    fn name(&self) -> &str;

    /// Veto a request; the reason ends up in the request's `error`.
    fn validate(&self, request: &TransactionObject) -> Result<(), String> {
        let _ = request;
        Ok(())
    }

    fn send(&self, matches: Vec<MatchObject>);
}
