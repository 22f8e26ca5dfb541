use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[macro_use]
mod macros;
mod api;
mod collaborators;
mod engine;
mod error;
mod submodules;

#[cfg(test)]
mod testing;

pub use api::{Collaborators, Engine, EngineConfig};
pub use collaborators::{
    AdSlot, AuctionCallback, AuctionOutcome, BiddingEngine, Container, PageRenderer, SlotDirectory, SlotHandle,
    SlotSize,
};
pub use engine::{
    AdUnitPattern, AdmissionHook, AdmissionReport, AuctionTracker, ClaimSet, GLOBAL_SIZE_MAPPING_KEY, LimitOrigin,
    LimitSizes, MatchContext, PatternId, PatternSpec, PatternStore, SizeMappings, Submodule, SubmoduleKind,
    SubmoduleRegistry, assign, build_unit, looks_like_pattern, resolve_limit_sizes, resolve_pattern_sizes,
};
pub use error::{CollaboratorError, ConfigError, PatternError, RegistryError, ValidationError};
pub use submodules::{
    AuctionSource, CacheDestination, CacheSource, CallbackDestination, DestinationSubmodule, InventorySubmodule,
    PatternInventory, ReadyCallback, RefreshSlotDestination, RenderDestination, SourceSubmodule, names,
};

// --- Sizes ------------------------------------------------------------------

/// A `[width, height]` pair. Serializes as a two-element JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size(pub u32, pub u32);

impl Size {
    pub fn width(self) -> u32 {
        self.0
    }

    pub fn height(self) -> u32 {
        self.1
    }

    pub fn area(self) -> u64 {
        u64::from(self.0) * u64::from(self.1)
    }

    /// Read a `[w, h]` JSON pair. Anything else (wrong arity, negative or
    /// fractional numbers, strings) is not a size.
    pub(crate) fn from_json(value: &Value) -> Option<Size> {
        let pair = value.as_array()?;
        if pair.len() != 2 {
            return None;
        }
        let w = u32::try_from(pair[0].as_u64()?).ok()?;
        let h = u32::try_from(pair[1].as_u64()?).ok()?;
        Some(Size(w, h))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.0, self.1)
    }
}

/// Current page viewport used for responsive size narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when `min` fits entirely inside this viewport.
    pub fn fits(self, min: Size) -> bool {
        self.width >= min.0 && self.height >= min.1
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1024, height: 768 }
    }
}

/// A `(minimum viewport, allowed sizes)` band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsiveSizeBand {
    #[serde(rename = "minViewPort")]
    pub min_viewport: Size,
    pub sizes: Vec<Size>,
}

// --- Media types ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTypes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(default)]
    pub sizes: Vec<Size>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responsive_sizes: Vec<ResponsiveSizeBand>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// --- Requests ---------------------------------------------------------------

/// The inventory variants a request can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryKind {
    Slot,
    Div,
    SlotObject,
    AutoSlots,
}

impl InventoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InventoryKind::Slot => "slot",
            InventoryKind::Div => "div",
            InventoryKind::SlotObject => "slotObject",
            InventoryKind::AutoSlots => "autoSlots",
        }
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Set of inventory kinds an inventory submodule accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InventoryKinds: u8 {
        const SLOT        = 1 << 0;
        const DIV         = 1 << 1;
        const SLOT_OBJECT = 1 << 2;
        const AUTO_SLOTS  = 1 << 3;
    }
}

impl From<InventoryKind> for InventoryKinds {
    fn from(kind: InventoryKind) -> Self {
        match kind {
            InventoryKind::Slot => InventoryKinds::SLOT,
            InventoryKind::Div => InventoryKinds::DIV,
            InventoryKind::SlotObject => InventoryKinds::SLOT_OBJECT,
            InventoryKind::AutoSlots => InventoryKinds::AUTO_SLOTS,
        }
    }
}

/// Where a request wants inventory from.
#[derive(Clone)]
pub enum InventoryTarget {
    /// Named ad-server slot path, e.g. `/1234/site/top`.
    Slot { name: String },
    /// Page container id.
    Div { name: String },
    /// A slot that already exists in the slot directory.
    SlotObject { slot: SlotHandle },
    /// Expand into one `SlotObject` request per existing slot.
    AutoSlots,
}

impl InventoryTarget {
    pub fn kind(&self) -> InventoryKind {
        match self {
            InventoryTarget::Slot { .. } => InventoryKind::Slot,
            InventoryTarget::Div { .. } => InventoryKind::Div,
            InventoryTarget::SlotObject { .. } => InventoryKind::SlotObject,
            InventoryTarget::AutoSlots => InventoryKind::AutoSlots,
        }
    }
}

impl fmt::Debug for InventoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryTarget::Slot { name } => f.debug_struct("Slot").field("name", name).finish(),
            InventoryTarget::Div { name } => f.debug_struct("Div").field("name", name).finish(),
            InventoryTarget::SlotObject { slot } => f
                .debug_struct("SlotObject")
                .field("path", &slot.path())
                .field("element_id", &slot.element_id())
                .finish(),
            InventoryTarget::AutoSlots => f.write_str("AutoSlots"),
        }
    }
}

/// Caller-supplied function invoked by the callback destination.
#[derive(Clone)]
pub struct MatchCallback(Rc<dyn Fn(&MatchObject)>);

impl MatchCallback {
    pub fn new(f: impl Fn(&MatchObject) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, match_object: &MatchObject) {
        (self.0)(match_object)
    }
}

impl fmt::Debug for MatchCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MatchCallback(<function>)")
    }
}

/// What happens to a request once bids are available.
#[derive(Debug, Clone)]
pub enum DestinationTarget {
    /// Paint the winning creative into a page container.
    Render { div: Option<String> },
    /// Set targeting on (or create) an ad-server slot and refresh it.
    RefreshSlot { div: Option<String>, targeting: BTreeMap<String, Vec<String>> },
    /// Hand the match to a caller-supplied function.
    Callback(MatchCallback),
    /// Leave the bids in the cache.
    Cache,
    /// A destination registered under a custom name.
    Custom { name: String, values: Value },
}

impl DestinationTarget {
    /// Registry key of the destination submodule this target needs.
    pub fn name(&self) -> &str {
        match self {
            DestinationTarget::Render { .. } => names::DESTINATION_RENDER,
            DestinationTarget::RefreshSlot { .. } => names::DESTINATION_REFRESH_SLOT,
            DestinationTarget::Callback(_) => names::DESTINATION_CALLBACK,
            DestinationTarget::Cache => names::DESTINATION_CACHE,
            DestinationTarget::Custom { name, .. } => name,
        }
    }

    /// Explicit target container id, if the destination carries one.
    pub fn div(&self) -> Option<&str> {
        match self {
            DestinationTarget::Render { div } | DestinationTarget::RefreshSlot { div, .. } => {
                div.as_deref().filter(|d| !d.is_empty())
            }
            _ => None,
        }
    }
}

/// One desired placement submitted by the host page.
#[derive(Debug, Clone)]
pub struct TransactionObject {
    pub inventory: InventoryTarget,
    /// Size override exactly as the host supplied it (`[[w,h],..]` or a bare
    /// `[w,h]`). Normalized in place by request validation.
    pub sizes: Option<Value>,
    /// First-party data (`ortb2Imp`) copied onto the built unit.
    pub first_party_data: Option<Value>,
    pub source: String,
    pub destination: DestinationTarget,
    /// Set by validation; a request carrying an error is terminal.
    pub error: Option<String>,
}

impl TransactionObject {
    pub fn new(inventory: InventoryTarget) -> Self {
        Self {
            inventory,
            sizes: None,
            first_party_data: None,
            source: names::SOURCE_AUCTION.to_string(),
            destination: DestinationTarget::Cache,
            error: None,
        }
    }

    pub fn slot(name: impl Into<String>) -> Self {
        Self::new(InventoryTarget::Slot { name: name.into() })
    }

    pub fn div(name: impl Into<String>) -> Self {
        Self::new(InventoryTarget::Div { name: name.into() })
    }

    pub fn slot_object(slot: SlotHandle) -> Self {
        Self::new(InventoryTarget::SlotObject { slot })
    }

    pub fn auto_slots() -> Self {
        Self::new(InventoryTarget::AutoSlots)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_destination(mut self, destination: DestinationTarget) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_sizes(mut self, sizes: Value) -> Self {
        self.sizes = Some(sizes);
        self
    }

    pub fn with_first_party_data(mut self, data: Value) -> Self {
        self.first_party_data = Some(data);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Explicit size override. `Some(vec![])` is an intentional "no sizes"
    /// and is distinct from `None` (no override). Malformed entries are
    /// skipped; a non-array value reads as no override.
    pub fn size_override(&self) -> Option<Vec<Size>> {
        let raw = self.sizes.as_ref()?;
        engine::parse_size_list(raw).map(|list| list.sizes)
    }
}

// --- Bids and results -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BidStatus {
    #[default]
    Available,
    Rendered,
}

/// A bid returned by the bidding engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub bidder: String,
    pub ad_unit_code: String,
    pub cpm: f64,
    pub width: u32,
    pub height: u32,
    pub ad_id: String,
    /// Time to live, in seconds.
    pub ttl: u32,
    /// Epoch milliseconds at which the bid arrived.
    pub response_timestamp: i64,
    #[serde(default)]
    pub status: BidStatus,
}

impl Bid {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.response_timestamp.saturating_add(i64::from(self.ttl).saturating_mul(1000)) <= now_ms
    }

    /// Present, unexpired, unrendered and positively priced.
    pub fn is_usable(&self, now_ms: i64) -> bool {
        self.cpm > 0.0 && self.status == BidStatus::Available && !self.is_expired(now_ms)
    }
}

/// Outcome of the latest auction for one unit code.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuctionResult {
    pub bids: Vec<Bid>,
    pub timed_out: bool,
    pub auction_id: String,
}

impl AuctionResult {
    pub fn highest_bid(&self) -> Option<&Bid> {
        self.bids.iter().filter(|b| b.cpm > 0.0).max_by(|a, b| a.cpm.total_cmp(&b.cpm))
    }
}

/// The concrete unit handed to the bidding engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdUnit {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_types: Option<MediaTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bids: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ortb2_imp: Option<Value>,
    pub transaction_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdUnit {
    /// Final banner sizes, sorted descending by area, width, height.
    pub fn sizes(&self) -> &[Size] {
        self.media_types.as_ref().and_then(|m| m.banner.as_ref()).map(|b| b.sizes.as_slice()).unwrap_or(&[])
    }
}

/// A request paired with its (optional) claimed unit, plus bids once the
/// source stage attaches them.
#[derive(Debug, Clone)]
pub struct MatchObject {
    pub request: TransactionObject,
    pub unit: Option<AdUnit>,
    pub values: Option<AuctionResult>,
    /// Container id the result belongs in (may be empty).
    pub div_id: String,
    /// Ad-server slot path for the result (may be empty).
    pub slot_name: String,
}

impl MatchObject {
    pub fn unmatched(request: TransactionObject) -> Self {
        Self { request, unit: None, values: None, div_id: String::new(), slot_name: String::new() }
    }

    pub fn is_matched(&self) -> bool {
        self.unit.is_some()
    }
}
