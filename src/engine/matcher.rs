//! Candidate search for one request.
//!
//! Every stored pattern is tested in registration order; the output keeps
//! that order, which is what gives "first registered wins" its meaning in
//! `assign.rs`.
//!
//! ```text
//! pattern ── identity ──── slot:       slotPattern ~ path        (required)
//!                    │     div:        divPattern  ~ id          (required)
//!                    │     slotObject: both, when present
//!         ── sizes ─────── limit ∩ pattern ≠ ∅   (or either side absent)
//!         ── hook ──────── caller's predicate has the final word
//! ```

use super::patterns::{AdUnitPattern, PatternStore};
use super::sizes::{SizeMappings, intersect, resolve_limit_sizes, resolve_pattern_sizes};
use crate::{InventoryTarget, TransactionObject, Viewport};
use std::rc::Rc;
use tracing::{debug, error};

/// Caller-supplied admission predicate, consulted after identity and size
/// tests pass.
pub type AdmissionHook = Rc<dyn Fn(&TransactionObject, &AdUnitPattern) -> bool>;

/// Read-only view of the engine state matching needs.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    patterns: &'a PatternStore,
    size_mappings: &'a SizeMappings,
    hook: Option<&'a AdmissionHook>,
    viewport: Viewport,
}

impl<'a> MatchContext<'a> {
    pub fn new(
        patterns: &'a PatternStore,
        size_mappings: &'a SizeMappings,
        hook: Option<&'a AdmissionHook>,
        viewport: Viewport,
    ) -> Self {
        Self { patterns, size_mappings, hook, viewport }
    }

    pub fn patterns(&self) -> &'a PatternStore {
        self.patterns
    }

    pub fn size_mappings(&self) -> &'a SizeMappings {
        self.size_mappings
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// All patterns that accept `request`, in registration order.
    pub fn find_candidates(&self, request: &TransactionObject) -> Vec<&'a AdUnitPattern> {
        self.patterns
            .patterns()
            .iter()
            .filter(|pattern| self.identity_matches(request, pattern))
            .filter(|pattern| self.sizes_compatible(request, pattern))
            .filter(|pattern| self.hook_admits(request, pattern))
            .collect()
    }

    fn identity_matches(&self, request: &TransactionObject, pattern: &AdUnitPattern) -> bool {
        match &request.inventory {
            InventoryTarget::Slot { name } => pattern.test_slot(name).unwrap_or(false),
            InventoryTarget::Div { name } => pattern.test_div(name).unwrap_or(false),
            InventoryTarget::SlotObject { slot } => {
                pattern.test_div(&slot.element_id()).unwrap_or(true) && pattern.test_slot(&slot.path()).unwrap_or(true)
            }
            InventoryTarget::AutoSlots => {
                error!(pattern = %pattern.label(), "autoSlots request reached matching unexpanded; excluded");
                false
            }
        }
    }

    fn sizes_compatible(&self, request: &TransactionObject, pattern: &AdUnitPattern) -> bool {
        if pattern.has_unresolved_media_types() {
            error!(
                pattern = %pattern.label(),
                mto_rev_id = ?pattern.spec().mto_rev_id,
                "no media type config registered for pattern"
            );
        }

        let Some(limit) = resolve_limit_sizes(request, Some(pattern), self.size_mappings, self.viewport) else {
            return true;
        };
        let pattern_sizes = resolve_pattern_sizes(pattern, self.viewport);
        if pattern_sizes.is_empty() {
            return true;
        }

        let compatible = !intersect(&pattern_sizes, &limit.sizes).is_empty();
        if !compatible {
            debug!(pattern = %pattern.label(), origin = ?limit.origin, "pattern sizes do not fit request");
        }
        compatible
    }

    fn hook_admits(&self, request: &TransactionObject, pattern: &AdUnitPattern) -> bool {
        match self.hook {
            Some(hook) => {
                let admitted = hook(request, pattern);
                if !admitted {
                    debug!(pattern = %pattern.label(), "admission hook rejected pattern");
                }
                admitted
            }
            None => true,
        }
    }
}
