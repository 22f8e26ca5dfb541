//! Contracts of the external collaborators the engine calls into.
//!
//! The engine never talks to an ad server, a page, or a bidding protocol
//! directly. The host supplies implementations of these traits; the default
//! source and destination submodules drive them.
//!
//! Everything here is single-threaded (`Rc`, no `Send` bounds): the host is a
//! cooperative event loop and "waiting" means holding on to a callback.

use crate::error::CollaboratorError;
use crate::{AdUnit, Bid, Size};
use std::collections::HashMap;
use std::rc::Rc;

/// A slot size as reported by the ad server. Fluid sizes carry no
/// dimensions and never take part in size negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSize {
    Fixed(Size),
    Fluid,
}

/// A visual slot owned by the ad-server slot directory.
pub trait AdSlot {
    fn element_id(&self) -> String;
    fn path(&self) -> String;
    /// Sizes the slot accepts at the current page viewport.
    fn native_sizes(&self) -> Vec<SlotSize>;
    fn set_targeting(&self, key: &str, values: &[String]);
}

pub type SlotHandle = Rc<dyn AdSlot>;

/// The ad-server slot directory.
pub trait SlotDirectory {
    fn list_slots(&self) -> Result<Vec<SlotHandle>, CollaboratorError>;
    /// Define a slot for `path` inside `container_id`. `Ok(None)` means the
    /// directory declined (for example, the container already has a slot).
    fn create_slot(
        &self,
        path: &str,
        sizes: &[Size],
        container_id: &str,
    ) -> Result<Option<SlotHandle>, CollaboratorError>;
    fn refresh(&self, slots: &[SlotHandle]) -> Result<(), CollaboratorError>;
    /// Run `command` once the directory is ready. May run it immediately.
    fn enqueue(&self, command: Box<dyn FnOnce()>);
}

/// Everything the bidding engine reports when an auction completes.
#[derive(Debug, Clone, Default)]
pub struct AuctionOutcome {
    pub bids_by_unit: HashMap<String, Vec<Bid>>,
    pub timed_out: bool,
    pub auction_id: String,
}

pub type AuctionCallback = Box<dyn FnOnce(AuctionOutcome)>;

/// The auction/bidding engine.
pub trait BiddingEngine {
    /// Start one auction over `units`. `on_complete` is invoked exactly once,
    /// covering every submitted unit, possibly long after this returns.
    fn auction(&self, units: Vec<AdUnit>, on_complete: AuctionCallback) -> Result<(), CollaboratorError>;

    /// Push bid targeting for `unit_codes` onto the given slots ahead of an
    /// ad-server refresh.
    fn apply_targeting(&self, unit_codes: &[String], slots_by_code: &HashMap<String, SlotHandle>) {
        let _ = (unit_codes, slots_by_code);
    }
}

/// A page container located by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
}

/// The DOM rendering adapter.
pub trait PageRenderer {
    fn find_container(&self, id: &str) -> Option<Container>;
    fn render_creative(&self, target: &Container, bid: &Bid) -> Result<(), CollaboratorError>;
}
