//! In-memory collaborators for tests.

use crate::collaborators::{
    AdSlot, AuctionCallback, AuctionOutcome, BiddingEngine, Container, PageRenderer, SlotDirectory, SlotHandle,
    SlotSize,
};
use crate::error::CollaboratorError;
use crate::{AdUnit, Bid, BidStatus, MatchObject, Size, TransactionObject};
use chrono::Utc;
use serde_json::Map;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

pub(crate) struct MockSlot {
    path: String,
    element_id: String,
    sizes: Vec<SlotSize>,
    targeting: RefCell<Vec<(String, Vec<String>)>>,
}

impl MockSlot {
    pub(crate) fn new(path: &str, element_id: &str, sizes: Vec<Size>) -> Self {
        Self {
            path: path.to_string(),
            element_id: element_id.to_string(),
            sizes: sizes.into_iter().map(SlotSize::Fixed).collect(),
            targeting: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with_fluid(mut self) -> Self {
        self.sizes.push(SlotSize::Fluid);
        self
    }

    pub(crate) fn targeting(&self) -> Vec<(String, Vec<String>)> {
        self.targeting.borrow().clone()
    }
}

impl AdSlot for MockSlot {
    fn element_id(&self) -> String {
        self.element_id.clone()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn native_sizes(&self) -> Vec<SlotSize> {
        self.sizes.clone()
    }

    fn set_targeting(&self, key: &str, values: &[String]) {
        self.targeting.borrow_mut().push((key.to_string(), values.to_vec()));
    }
}

/// Slot directory whose command queue runs immediately unless `deferred`.
#[derive(Default)]
pub(crate) struct MockDirectory {
    slots: RefCell<Vec<Rc<MockSlot>>>,
    created: RefCell<Vec<(String, Vec<Size>, String)>>,
    refreshed: RefCell<Vec<Vec<String>>>,
    queue: RefCell<Vec<Box<dyn FnOnce()>>>,
    deferred: Cell<bool>,
}

impl MockDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn deferred() -> Self {
        let directory = Self::default();
        directory.deferred.set(true);
        directory
    }

    pub(crate) fn add_slot(&self, slot: MockSlot) -> Rc<MockSlot> {
        let slot = Rc::new(slot);
        self.slots.borrow_mut().push(Rc::clone(&slot));
        slot
    }

    pub(crate) fn slot(&self, element_id: &str) -> Option<Rc<MockSlot>> {
        self.slots.borrow().iter().find(|s| s.element_id == element_id).cloned()
    }

    pub(crate) fn run_queue(&self) {
        let commands: Vec<Box<dyn FnOnce()>> = self.queue.borrow_mut().drain(..).collect();
        for command in commands {
            command();
        }
    }

    pub(crate) fn created(&self) -> Vec<(String, Vec<Size>, String)> {
        self.created.borrow().clone()
    }

    /// Element ids per refresh call.
    pub(crate) fn refreshed(&self) -> Vec<Vec<String>> {
        self.refreshed.borrow().clone()
    }
}

impl SlotDirectory for MockDirectory {
    fn list_slots(&self) -> Result<Vec<SlotHandle>, CollaboratorError> {
        Ok(self.slots.borrow().iter().map(|s| Rc::clone(s) as SlotHandle).collect())
    }

    fn create_slot(
        &self,
        path: &str,
        sizes: &[Size],
        container_id: &str,
    ) -> Result<Option<SlotHandle>, CollaboratorError> {
        if self.slot(container_id).is_some() {
            return Ok(None);
        }
        self.created.borrow_mut().push((path.to_string(), sizes.to_vec(), container_id.to_string()));
        let slot = self.add_slot(MockSlot::new(path, container_id, sizes.to_vec()));
        Ok(Some(slot as SlotHandle))
    }

    fn refresh(&self, slots: &[SlotHandle]) -> Result<(), CollaboratorError> {
        self.refreshed.borrow_mut().push(slots.iter().map(|s| s.element_id()).collect());
        Ok(())
    }

    fn enqueue(&self, command: Box<dyn FnOnce()>) {
        if self.deferred.get() {
            self.queue.borrow_mut().push(command);
        } else {
            command();
        }
    }
}

/// Bidding engine that holds completions until the test releases them.
#[derive(Default)]
pub(crate) struct MockBidding {
    pending: RefCell<Vec<(Vec<String>, AuctionCallback)>>,
    auctioned: RefCell<Vec<Vec<String>>>,
    targeted: RefCell<Vec<Vec<String>>>,
    fail: bool,
    counter: Cell<u32>,
}

impl MockBidding {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Unit codes per auction call.
    pub(crate) fn auctioned_codes(&self) -> Vec<Vec<String>> {
        self.auctioned.borrow().clone()
    }

    pub(crate) fn targeted_codes(&self) -> Vec<Vec<String>> {
        self.targeted.borrow().clone()
    }

    /// Complete every pending auction with `bids_for(code)` per unit.
    pub(crate) fn complete_all(&self, bids_for: impl Fn(&str) -> Vec<Bid>) {
        self.finish(false, bids_for);
    }

    pub(crate) fn time_out_all(&self) {
        self.finish(true, |_| Vec::new());
    }

    fn finish(&self, timed_out: bool, bids_for: impl Fn(&str) -> Vec<Bid>) {
        let pending: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for (codes, on_complete) in pending {
            self.counter.set(self.counter.get() + 1);
            let bids_by_unit: HashMap<String, Vec<Bid>> =
                codes.iter().map(|code| (code.clone(), bids_for(code))).collect();
            let auction_id = format!("auction-{}", self.counter.get());
            on_complete(AuctionOutcome { bids_by_unit, timed_out, auction_id });
        }
    }
}

impl BiddingEngine for MockBidding {
    fn auction(&self, units: Vec<AdUnit>, on_complete: AuctionCallback) -> Result<(), CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::new("bidding", "not initialized"));
        }
        let codes: Vec<String> = units.into_iter().map(|u| u.code).collect();
        self.auctioned.borrow_mut().push(codes.clone());
        self.pending.borrow_mut().push((codes, on_complete));
        Ok(())
    }

    fn apply_targeting(&self, unit_codes: &[String], _slots_by_code: &HashMap<String, SlotHandle>) {
        self.targeted.borrow_mut().push(unit_codes.to_vec());
    }
}

/// Page with a fixed set of containers; records `(container id, cpm)` per render.
pub(crate) struct MockPage {
    containers: Vec<String>,
    rendered: RefCell<Vec<(String, f64)>>,
}

impl MockPage {
    pub(crate) fn with_containers(ids: &[&str]) -> Self {
        Self { containers: ids.iter().map(|s| s.to_string()).collect(), rendered: RefCell::new(Vec::new()) }
    }

    pub(crate) fn rendered(&self) -> Vec<(String, f64)> {
        self.rendered.borrow().clone()
    }
}

impl PageRenderer for MockPage {
    fn find_container(&self, id: &str) -> Option<Container> {
        self.containers.iter().any(|c| c == id).then(|| Container { id: id.to_string() })
    }

    fn render_creative(&self, target: &Container, bid: &Bid) -> Result<(), CollaboratorError> {
        self.rendered.borrow_mut().push((target.id.clone(), bid.cpm));
        Ok(())
    }
}

/// A fresh, usable bid for `code`.
pub(crate) fn bid(code: &str, cpm: f64) -> Bid {
    Bid {
        bidder: "mock".to_string(),
        ad_unit_code: code.to_string(),
        cpm,
        width: 300,
        height: 250,
        ad_id: format!("{code}-{cpm}"),
        ttl: 300,
        response_timestamp: Utc::now().timestamp_millis(),
        status: BidStatus::Available,
    }
}

/// A named-slot match that already carries a unit with `code`.
pub(crate) fn matched(code: &str) -> MatchObject {
    let unit = AdUnit {
        code: code.to_string(),
        media_types: None,
        bids: None,
        ortb2_imp: None,
        transaction_id: format!("tid-{code}"),
        extra: Map::new(),
    };
    MatchObject { unit: Some(unit), ..MatchObject::unmatched(TransactionObject::slot(format!("/1/{code}"))) }
}

pub(crate) fn unmatched(slot: &str) -> MatchObject {
    MatchObject::unmatched(TransactionObject::slot(slot))
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().map_err(|_| io::Error::other("log buffer poisoned"))?.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a thread-local subscriber and return its output alongside
/// everything logged at `DEBUG` and above.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().map(|b| b.clone()).unwrap_or_default();
    (result, String::from_utf8_lossy(&bytes).into_owned())
}
