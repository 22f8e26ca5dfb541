use crate::collaborators::{BiddingEngine, PageRenderer, SlotDirectory};
use crate::engine::{
    self, AdUnitPattern, AdmissionHook, AdmissionReport, AuctionTracker, MatchContext, PatternStore, SizeMappings,
    Submodule, SubmoduleRegistry,
};
use crate::error::{ConfigError, RegistryError};
use crate::submodules::{
    AuctionSource, CacheDestination, CacheSource, CallbackDestination, PatternInventory, RefreshSlotDestination,
    RenderDestination, SourceSubmodule,
};
use crate::{MatchObject, MediaTypes, ResponsiveSizeBand, TransactionObject, Viewport};
use serde::Deserialize;
use serde_json::Value;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{error, info, warn};

/// Initial engine state.
///
/// Every field is optional in JSON:
///
/// ```json
/// {
///   "viewport": {"width": 1280, "height": 800},
///   "sizeMappings": {"div-top": [{"minViewPort": [0, 0], "sizes": [[320, 50]]}]},
///   "mediaTypeConfigs": {"1234": {"banner": {"sizes": [[300, 250]]}}},
///   "patterns": [{"slotPattern": "^/1/top$", "mtoRevId": 1234}]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub viewport: Option<Viewport>,
    pub size_mappings: HashMap<String, Vec<ResponsiveSizeBand>>,
    pub media_type_configs: HashMap<u64, MediaTypes>,
    /// Raw patterns; each is validated on admission, invalid ones are dropped.
    pub patterns: Vec<Value>,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Host-side implementations the default submodules drive.
///
/// Without a slot directory there is no `refresh-slot` destination and
/// `autoSlots` requests expand to nothing; without a page renderer there is
/// no `render` destination.
pub struct Collaborators {
    pub bidding: Rc<dyn BiddingEngine>,
    pub slots: Option<Rc<dyn SlotDirectory>>,
    pub page: Option<Rc<dyn PageRenderer>>,
}

/// The placement engine.
///
/// Owns every piece of long-lived state: patterns, size mappings, the
/// admission hook, the submodule registry and the auction tracker. Claims are
/// per call: a pattern claimed by one `request_bids` is free again in the next.
///
/// # Example
/// ```
/// use placement_engine::{Engine, EngineConfig, TransactionObject};
///
/// let config = EngineConfig::from_json(r#"{"patterns": [{"code": "top", "slotPattern": "^/1/top$"}]}"#).unwrap();
/// let engine = Engine::from_config(config);
/// assert_eq!(engine.patterns().len(), 1);
///
/// // No submodules registered: the request is rejected, not dropped.
/// let results = engine.request_bids(vec![TransactionObject::slot("/1/top")]);
/// assert!(results[0].request.error.is_some());
/// ```
pub struct Engine {
    patterns: PatternStore,
    size_mappings: SizeMappings,
    hook: Option<AdmissionHook>,
    viewport: Viewport,
    registry: SubmoduleRegistry,
    tracker: Rc<AuctionTracker>,
    matched_once: Cell<bool>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An empty engine with no patterns and no submodules.
    pub fn new() -> Self {
        Self {
            patterns: PatternStore::new(),
            size_mappings: SizeMappings::new(),
            hook: None,
            viewport: Viewport::default(),
            registry: SubmoduleRegistry::new(),
            tracker: Rc::new(AuctionTracker::new()),
            matched_once: Cell::new(false),
        }
    }

    /// Apply `config` to an empty engine. Media-type configs go in before the
    /// patterns that reference them.
    pub fn from_config(config: EngineConfig) -> Self {
        let mut engine = Self::new();
        if let Some(viewport) = config.viewport {
            engine.viewport = viewport;
        }
        engine.set_size_mappings(config.size_mappings);
        engine.add_media_type_configs(config.media_type_configs);
        let report = engine.add_placement_patterns(config.patterns);
        info!(admitted = report.admitted.len(), rejected = report.rejected.len(), "engine configured");
        engine
    }

    /// [`from_config`](Self::from_config) plus the built-in submodules:
    /// pattern inventory, `auction` and `cache` sources, `callback` and
    /// `cache` destinations, and `render` / `refresh-slot` when the matching
    /// collaborator is supplied.
    pub fn with_default_submodules(config: EngineConfig, collaborators: Collaborators) -> Self {
        let mut engine = Self::from_config(config);
        let Collaborators { bidding, slots, page } = collaborators;

        let auction: Rc<dyn SourceSubmodule> =
            Rc::new(AuctionSource::new(Rc::clone(&bidding), Rc::clone(&engine.tracker)));
        let cache = Rc::new(CacheSource::new(Rc::clone(&engine.tracker), Rc::clone(&auction)));

        let mut defaults = vec![
            Submodule::Inventory(Box::new(PatternInventory::new(slots.clone()))),
            Submodule::Source(auction),
            Submodule::Source(cache),
            Submodule::Destination(Rc::new(CallbackDestination)),
            Submodule::Destination(Rc::new(CacheDestination)),
        ];
        if let Some(page) = page {
            defaults.push(Submodule::Destination(Rc::new(RenderDestination::new(page, Rc::clone(&engine.tracker)))));
        }
        if let Some(slots) = slots {
            defaults.push(Submodule::Destination(Rc::new(RefreshSlotDestination::new(slots, bidding))));
        }

        for submodule in defaults {
            let name = submodule.name().to_string();
            if let Err(err) = engine.register_submodule(submodule) {
                error!(%name, %err, "failed to register default submodule");
            }
        }
        engine
    }

    /// Validate and store `patterns` in order. Invalid entries are logged,
    /// reported, and skipped; they never block valid ones.
    pub fn add_placement_patterns(&mut self, patterns: impl IntoIterator<Item = Value>) -> AdmissionReport {
        self.patterns.add_patterns(patterns)
    }

    /// Register media-type configs by revision id for patterns that carry
    /// `mtoRevId` instead of `mediaTypes`.
    pub fn add_media_type_configs(&mut self, configs: HashMap<u64, MediaTypes>) {
        self.patterns.add_media_type_configs(configs);
    }

    /// Merge a size-mapping table (container id → viewport bands). Use
    /// [`GLOBAL_SIZE_MAPPING_KEY`](crate::GLOBAL_SIZE_MAPPING_KEY) for the fallback entry.
    pub fn set_size_mappings(&mut self, table: HashMap<String, Vec<ResponsiveSizeBand>>) {
        self.size_mappings.extend(table);
    }

    /// Install the admission predicate consulted after identity and size
    /// tests. Replaces any previous hook.
    pub fn set_admission_hook(&mut self, hook: impl Fn(&TransactionObject, &AdUnitPattern) -> bool + 'static) {
        if self.matched_once.get() {
            warn!("admission hook set after matching already ran; earlier results may differ");
        }
        self.hook = Some(Rc::new(hook));
    }

    pub fn register_submodule(&mut self, submodule: Submodule) -> Result<(), RegistryError> {
        self.registry.register(submodule)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn patterns(&self) -> &PatternStore {
        &self.patterns
    }

    pub fn size_mappings(&self) -> &SizeMappings {
        &self.size_mappings
    }

    pub fn registry(&self) -> &SubmoduleRegistry {
        &self.registry
    }

    /// Shared handle to the latest-auction cache.
    pub fn tracker(&self) -> Rc<AuctionTracker> {
        Rc::clone(&self.tracker)
    }

    /// Match, build and dispatch `requests`.
    ///
    /// Returns one entry per request (per expanded slot for `autoSlots`):
    /// rejected requests first, carrying their `error`, then each
    /// (source, destination) group in first-appearance order. The result
    /// reflects matching only; bids reach destinations through the source,
    /// possibly after this returns.
    pub fn request_bids(&self, requests: Vec<TransactionObject>) -> Vec<MatchObject> {
        self.matched_once.set(true);
        let ctx = MatchContext::new(&self.patterns, &self.size_mappings, self.hook.as_ref(), self.viewport);
        engine::request_bids(&ctx, &self.registry, requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ClaimSet;
    use crate::submodules::InventorySubmodule;
    use crate::testing::{MockBidding, MockDirectory, MockPage, MockSlot, bid, capture_logs};
    use crate::{
        DestinationTarget, InventoryKind, InventoryKinds, MatchCallback, Size, SlotHandle, ValidationError, names,
    };
    use serde_json::json;
    use std::cell::RefCell;

    struct Harness {
        engine: Engine,
        bidding: Rc<MockBidding>,
        directory: Rc<MockDirectory>,
        page: Rc<MockPage>,
    }

    fn harness(config: EngineConfig) -> Harness {
        let bidding = Rc::new(MockBidding::new());
        let directory = Rc::new(MockDirectory::new());
        let page = Rc::new(MockPage::with_containers(&["div-1", "div-2"]));
        let engine = Engine::with_default_submodules(
            config,
            Collaborators {
                bidding: Rc::clone(&bidding) as Rc<dyn BiddingEngine>,
                slots: Some(Rc::clone(&directory) as Rc<dyn SlotDirectory>),
                page: Some(Rc::clone(&page) as Rc<dyn PageRenderer>),
            },
        );
        Harness { engine, bidding, directory, page }
    }

    fn collecting_callback() -> (DestinationTarget, Rc<RefCell<Vec<MatchObject>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let callback = MatchCallback::new(move |m: &MatchObject| sink.borrow_mut().push(m.clone()));
        (DestinationTarget::Callback(callback), seen)
    }

    #[test]
    fn patterns_without_identity_never_enter_the_store() {
        let mut engine = Engine::new();
        engine.add_placement_patterns(vec![json!({"slotPattern": "^a$"})]);
        let report = engine.add_placement_patterns(vec![
            json!({"code": "no-identity"}),
            json!({"slotPattern": "", "mediaTypes": {"banner": {"sizes": [[1, 1]]}}}),
        ]);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(engine.patterns().len(), 1);
    }

    struct SlotOnly(PatternInventory);

    impl InventorySubmodule for SlotOnly {
        fn name(&self) -> &str {
            "slot-only"
        }

        fn supported_kinds(&self) -> InventoryKinds {
            InventoryKinds::SLOT
        }

        fn create_units(
            &self,
            ctx: &MatchContext<'_>,
            requests: Vec<TransactionObject>,
            claims: &mut ClaimSet,
        ) -> Vec<MatchObject> {
            self.0.create_units(ctx, requests, claims)
        }
    }

    #[test]
    fn unsupported_inventory_kind_is_rejected_before_matching() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({"divPattern": ".*", "slotPattern": ".*"})]);
        h.engine.register_submodule(Submodule::Inventory(Box::new(SlotOnly(PatternInventory::new(None))))).unwrap();

        let results = h.engine.request_bids(vec![TransactionObject::div("ad"), TransactionObject::slot("/1/a")]);
        let expected =
            ValidationError::UnsupportedInventory { kind: InventoryKind::Div, inventory: "slot-only".into() };
        assert_eq!(results[0].request.error, Some(expected.to_string()));
        assert!(results[0].unit.is_none());
        assert!(results[1].is_matched());
    }

    #[test]
    fn first_registered_pattern_wins_with_a_warning() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![
            json!({"code": "first", "slotPattern": "^/1/a$"}),
            json!({"code": "second", "slotPattern": "^/1/.*$"}),
        ]);

        let (results, logs) = capture_logs(|| h.engine.request_bids(vec![TransactionObject::slot("/1/a")]));
        assert_eq!(results[0].unit.as_ref().map(|u| u.code.as_str()), Some("first"));
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("more than one placement pattern matched"), "{logs}");
    }

    #[test]
    fn batch_order_decides_who_claims_a_shared_pattern() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({"code": "shared", "divPattern": "^div-\\d$"})]);

        let run = |ids: [&str; 2]| -> Vec<(String, bool)> {
            h.engine
                .request_bids(ids.iter().map(|id| TransactionObject::div(*id)).collect())
                .into_iter()
                .map(|m| (m.div_id.clone(), m.is_matched()))
                .collect()
        };
        assert_eq!(run(["div-1", "div-2"]), vec![("div-1".to_string(), true), (String::new(), false)]);
        assert_eq!(run(["div-2", "div-1"]), vec![("div-2".to_string(), true), (String::new(), false)]);
    }

    #[test]
    fn size_precedence_is_override_then_mapping_then_native() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({
            "slotPattern": "^/1/a$",
            "mediaTypes": {"banner": {"sizes": [[1, 1], [2, 2], [3, 3]]}}
        })]);
        let slot: SlotHandle = Rc::new(MockSlot::new("/1/a", "div-a", sizes![[3, 3]]));

        let unit_sizes = |engine: &Engine, request: TransactionObject| -> Vec<Size> {
            let results = engine.request_bids(vec![request]);
            results[0].unit.as_ref().map(|u| u.sizes().to_vec()).unwrap_or_default()
        };

        assert_eq!(unit_sizes(&h.engine, TransactionObject::slot_object(Rc::clone(&slot))), sizes![[3, 3]]);

        h.engine.set_size_mappings(HashMap::from([(
            "div-a".to_string(),
            vec![ResponsiveSizeBand { min_viewport: Size(0, 0), sizes: sizes![[1, 1]] }],
        )]));
        assert_eq!(unit_sizes(&h.engine, TransactionObject::slot_object(Rc::clone(&slot))), sizes![[1, 1]]);

        let with_override = TransactionObject::slot_object(Rc::clone(&slot)).with_sizes(json!([[2, 2]]));
        assert_eq!(unit_sizes(&h.engine, with_override), sizes![[2, 2]]);
    }

    #[test]
    fn generated_code_is_reproducible_across_calls() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({
            "slotPattern": "^/1/a$",
            "mediaTypes": {"banner": {"sizes": [[300, 250], [300, 600]]}}
        })]);
        let code = |engine: &Engine| {
            engine.request_bids(vec![TransactionObject::slot("/1/a")])[0].unit.clone().unwrap().code
        };
        assert_eq!(code(&h.engine), code(&h.engine));
    }

    #[test]
    fn cache_source_forwards_hits_then_fallback_once() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![
            json!({"code": "cached", "slotPattern": "^/1/cached$"}),
            json!({"code": "fresh-1", "slotPattern": "^/1/fresh-1$"}),
            json!({"code": "fresh-2", "slotPattern": "^/1/fresh-2$"}),
        ]);
        h.engine.tracker().set_latest_auction(
            "cached",
            crate::AuctionResult { bids: vec![bid("cached", 1.0)], timed_out: false, auction_id: "old".into() },
        );

        let deliveries = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&deliveries);
        let callback = MatchCallback::new(move |m: &MatchObject| sink.borrow_mut().push(m.unit.clone().unwrap().code));
        let requests = ["/1/cached", "/1/fresh-1", "/1/fresh-2"]
            .into_iter()
            .map(|path| {
                TransactionObject::slot(path)
                    .with_source(names::SOURCE_CACHE)
                    .with_destination(DestinationTarget::Callback(callback.clone()))
            })
            .collect();

        let results = h.engine.request_bids(requests);
        assert_eq!(results.len(), 3);
        assert_eq!(*deliveries.borrow(), vec!["cached".to_string()]);
        assert_eq!(h.bidding.auctioned_codes(), vec![vec!["fresh-1".to_string(), "fresh-2".to_string()]]);

        h.bidding.complete_all(|_| Vec::new());
        assert_eq!(*deliveries.borrow(), vec!["cached".to_string(), "fresh-1".to_string(), "fresh-2".to_string()]);
    }

    #[test]
    fn cache_miss_falls_back_to_auction_end_to_end() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({
            "slotPattern": "^tag-0$",
            "mediaTypes": {"banner": {"sizes": [[300, 250], [300, 600]]}}
        })]);
        let (target, seen) = collecting_callback();

        let results = h.engine.request_bids(vec![
            TransactionObject::slot("tag-0").with_source(names::SOURCE_CACHE).with_destination(target),
        ]);
        let code = results[0].unit.as_ref().unwrap().code.clone();
        assert_eq!(h.bidding.auctioned_codes(), vec![vec![code.clone()]]);
        assert!(seen.borrow().is_empty());

        h.bidding.complete_all(|_| vec![bid("tag-0", 1.5)]);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        let values = seen[0].values.as_ref().unwrap();
        assert_eq!(values.bids.len(), 1);
        assert_eq!(values.bids[0].cpm, 1.5);
        assert!(h.engine.tracker().latest_auction(&code).is_some());
    }

    #[test]
    fn explicit_code_declared_later_does_not_win() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![
            json!({"slotPattern": "^/1/a$", "mediaTypes": {"banner": {"sizes": [[300, 250]]}}}),
            json!({"code": "p2", "slotPattern": "^/1/a$", "mediaTypes": {"banner": {"sizes": [[300, 250]]}}}),
        ]);
        let results = h.engine.request_bids(vec![TransactionObject::slot("/1/a")]);
        let code = results[0].unit.as_ref().unwrap().code.clone();
        assert_ne!(code, "p2");
        assert!(u32::from_str_radix(&code, 16).is_ok());
    }

    #[test]
    fn claims_reset_between_calls() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({"code": "only", "slotPattern": "^/1/a$"})]);
        assert!(h.engine.request_bids(vec![TransactionObject::slot("/1/a")])[0].is_matched());
        assert!(h.engine.request_bids(vec![TransactionObject::slot("/1/a")])[0].is_matched());
    }

    #[test]
    fn invalid_requests_come_first_then_groups_in_order() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({"slotPattern": ".*"}), json!({"divPattern": ".*"})]);
        let (target, _) = collecting_callback();
        let results = h.engine.request_bids(vec![
            TransactionObject::slot("/1/a").with_destination(target.clone()),
            TransactionObject::slot("/1/b").with_source("unknown"),
            TransactionObject::div("div-1"),
            TransactionObject::slot("/1/c").with_destination(target),
        ]);
        let order: Vec<String> = results
            .iter()
            .map(|m| match &m.request.inventory {
                crate::InventoryTarget::Slot { name } | crate::InventoryTarget::Div { name } => name.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(order, vec!["/1/b", "/1/a", "/1/c", "div-1"]);
        assert!(results[0].request.error.is_some());
    }

    #[test]
    fn late_hook_logs_a_warning_and_applies_next_call() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({"code": "p", "slotPattern": "^/1/a$"})]);
        assert!(h.engine.request_bids(vec![TransactionObject::slot("/1/a")])[0].is_matched());

        let ((), logs) = capture_logs(|| h.engine.set_admission_hook(|_, _| false));
        assert!(logs.contains("admission hook set after matching already ran"), "{logs}");
        assert!(!h.engine.request_bids(vec![TransactionObject::slot("/1/a")])[0].is_matched());
    }

    #[test]
    fn render_destination_paints_highest_bid() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({"slotPattern": "^/1/a$", "divPattern": "div-1"})]);

        let results = h.engine.request_bids(vec![
            TransactionObject::slot("/1/a").with_destination(DestinationTarget::Render { div: None }),
        ]);
        assert_eq!(results[0].div_id, "div-1");

        h.bidding.complete_all(|code| vec![bid(code, 0.5), bid(code, 2.5)]);
        assert_eq!(h.page.rendered(), vec![("div-1".to_string(), 2.5)]);
    }

    #[test]
    fn rendered_bid_is_not_served_again_from_cache() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({"slotPattern": "^/1/a$", "divPattern": "div-1"})]);
        let render = || TransactionObject::slot("/1/a").with_destination(DestinationTarget::Render { div: None });

        h.engine.request_bids(vec![render()]);
        h.bidding.complete_all(|code| vec![bid(code, 2.0)]);
        assert_eq!(h.page.rendered(), vec![("div-1".to_string(), 2.0)]);

        h.engine.request_bids(vec![render().with_source(names::SOURCE_CACHE)]);
        assert_eq!(h.page.rendered().len(), 1);
        assert_eq!(h.bidding.auctioned_codes().len(), 2);

        h.bidding.complete_all(|code| vec![bid(code, 3.0)]);
        assert_eq!(h.page.rendered(), vec![("div-1".to_string(), 2.0), ("div-1".to_string(), 3.0)]);
    }

    #[test]
    fn refresh_destination_creates_and_refreshes_slot() {
        let mut h = harness(EngineConfig::default());
        h.engine.add_placement_patterns(vec![json!({
            "slotPattern": "/1/home",
            "divPattern": "^div-home$",
            "mediaTypes": {"banner": {"sizes": [[728, 90]]}}
        })]);

        h.engine.request_bids(vec![TransactionObject::div("div-home").with_destination(
            DestinationTarget::RefreshSlot { div: None, targeting: Default::default() },
        )]);
        h.bidding.complete_all(|_| Vec::new());

        assert_eq!(h.directory.created(), vec![("/1/home".to_string(), sizes![[728, 90]], "div-home".to_string())]);
        assert_eq!(h.directory.refreshed(), vec![vec!["div-home".to_string()]]);
        assert_eq!(h.bidding.targeted_codes().len(), 1);
    }

    #[test]
    fn auto_slots_expand_through_the_engine() {
        let mut h = harness(EngineConfig::default());
        h.directory.add_slot(MockSlot::new("/1/x", "div-x", sizes![[300, 250]]).with_fluid());
        h.directory.add_slot(MockSlot::new("/1/y", "div-y", sizes![[728, 90]]));
        h.engine.add_placement_patterns(vec![json!({"slotPattern": "^/1/x$"}), json!({"slotPattern": "^/1/y$"})]);

        let results = h.engine.request_bids(vec![TransactionObject::auto_slots()]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(MatchObject::is_matched));
        assert_eq!(results[0].unit.as_ref().unwrap().sizes(), sizes![[300, 250]].as_slice());
    }

    #[test]
    fn config_loads_from_json() {
        let config = EngineConfig::from_json(
            r#"{
                "viewport": {"width": 400, "height": 800},
                "sizeMappings": {"__global__": [{"minViewPort": [0, 0], "sizes": [[320, 50]]}]},
                "mediaTypeConfigs": {"7": {"banner": {"sizes": [[320, 50], [728, 90]]}}},
                "patterns": [{"slotPattern": "^/1/a$", "mtoRevId": 7}, {"code": "broken"}]
            }"#,
        )
        .unwrap();
        let h = harness(config);
        assert_eq!(h.engine.viewport(), Viewport::new(400, 800));
        assert_eq!(h.engine.patterns().len(), 1);

        let results = h.engine.request_bids(vec![TransactionObject::slot("/1/a")]);
        assert_eq!(results[0].unit.as_ref().unwrap().sizes(), sizes![[320, 50]].as_slice());
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(EngineConfig::from_json("{\"patterns\": 3}"), Err(ConfigError::Json(_))));
    }
}
