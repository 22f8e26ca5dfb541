//! Size negotiation.
//!
//! Two questions get answered here for every (request, pattern) pair:
//!
//! - **Limit sizes** (`resolve_limit_sizes`): what the request side allows.
//!   First hit wins:
//!
//!   ```text
//!   explicit override on the request      (even an empty list)
//!     └─ else size-mapping band for the container id (or "__global__")
//!          └─ else native sizes of the existing slot (non-empty only)
//!               └─ else no constraint
//!   ```
//!
//! - **Pattern sizes** (`resolve_pattern_sizes`): the pattern's canonical
//!   banner sizes, narrowed by its responsive band for the current viewport.
//!
//! `None` limit sizes mean "no constraint". `Some(vec![])` is an intentional
//! exclusion and must never be collapsed into `None`.
//!
//! Band selection and final unit sizes share one ordering: descending by
//! area, then width, then height.

use super::patterns::AdUnitPattern;
use crate::collaborators::SlotSize;
use crate::{InventoryTarget, ResponsiveSizeBand, Size, TransactionObject, Viewport};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Size-mapping key consulted when the container id is missing, unknown, or
/// itself a pattern.
pub const GLOBAL_SIZE_MAPPING_KEY: &str = "__global__";

/// Viewport-keyed size bands per container id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeMappings {
    by_container: HashMap<String, Vec<ResponsiveSizeBand>>,
}

impl SizeMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `table` into the mappings; entries for an existing container id
    /// are replaced.
    pub fn extend(&mut self, table: HashMap<String, Vec<ResponsiveSizeBand>>) {
        self.by_container.extend(table);
    }

    pub fn get(&self, container_id: &str) -> Option<&[ResponsiveSizeBand]> {
        self.by_container.get(container_id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_container.is_empty()
    }

    /// Allowed sizes for `container_id` at `viewport`, or `None` if no table
    /// applies or no band fits.
    pub fn lookup(&self, container_id: Option<&str>, viewport: Viewport) -> Option<Vec<Size>> {
        if self.by_container.is_empty() {
            return None;
        }
        let key = match container_id {
            Some(id) if !id.is_empty() && !looks_like_pattern(id) => id,
            _ => GLOBAL_SIZE_MAPPING_KEY,
        };
        let bands = self.get(key).or_else(|| self.get(GLOBAL_SIZE_MAPPING_KEY))?;
        select_band(bands, viewport).map(|band| band.sizes.clone())
    }
}

/// Where a set of limit sizes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitOrigin {
    Override,
    SizeMapping,
    SlotNative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitSizes {
    pub sizes: Vec<Size>,
    pub origin: LimitOrigin,
}

/// Whether an identity value is a regex rather than a concrete id.
///
/// A value is regex-like iff it contains any of `^ $ * + ? ( ) [ ] { } | \`.
/// A lone `.` does not count: slot paths routinely contain domain names.
pub fn looks_like_pattern(value: &str) -> bool {
    regex!(r"[\^$*+?()\[\]{}|\\]").is_match(value)
}

/// Descending by area, then width, then height.
pub(crate) fn compare_desc(a: Size, b: Size) -> Ordering {
    b.area().cmp(&a.area()).then(b.0.cmp(&a.0)).then(b.1.cmp(&a.1))
}

/// Stable in-place sort, largest first.
pub(crate) fn sort_sizes(sizes: &mut [Size]) {
    sizes.sort_by(|a, b| compare_desc(*a, *b));
}

/// Entries of `current` that also appear in `allowed`, in `current` order.
pub(crate) fn intersect(current: &[Size], allowed: &[Size]) -> Vec<Size> {
    current.iter().copied().filter(|s| allowed.contains(s)).collect()
}

/// Largest band (by minimum viewport) that fits inside `viewport`.
pub(crate) fn select_band(bands: &[ResponsiveSizeBand], viewport: Viewport) -> Option<&ResponsiveSizeBand> {
    let mut ordered: Vec<&ResponsiveSizeBand> = bands.iter().collect();
    ordered.sort_by(|a, b| compare_desc(a.min_viewport, b.min_viewport));
    ordered.into_iter().find(|band| viewport.fits(band.min_viewport))
}

/// A size list read from host-supplied JSON.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct SizeList {
    pub sizes: Vec<Size>,
    pub malformed: Vec<Value>,
}

/// Read `[[w,h], ...]`, coercing a bare `[w,h]` into a one-element list.
/// Malformed entries are collected rather than failing the whole list.
/// Returns `None` when `value` is not an array at all.
pub(crate) fn parse_size_list(value: &Value) -> Option<SizeList> {
    let entries = value.as_array()?;
    if entries.first().is_some_and(Value::is_number) {
        return Some(match Size::from_json(value) {
            Some(size) => SizeList { sizes: vec![size], malformed: Vec::new() },
            None => SizeList { sizes: Vec::new(), malformed: vec![value.clone()] },
        });
    }

    let mut list = SizeList::default();
    for entry in entries {
        match Size::from_json(entry) {
            Some(size) => list.sizes.push(size),
            None => list.malformed.push(entry.clone()),
        }
    }
    Some(list)
}

/// Container id used as the size-mapping key: the destination's explicit div,
/// else the inventory's own container, else the pattern's div predicate.
pub(crate) fn container_id(request: &TransactionObject, pattern: Option<&AdUnitPattern>) -> Option<String> {
    if let Some(div) = request.destination.div() {
        return Some(div.to_string());
    }
    match &request.inventory {
        InventoryTarget::Div { name } => Some(name.clone()),
        InventoryTarget::SlotObject { slot } => Some(slot.element_id()),
        _ => pattern.and_then(|p| p.div_pattern()).map(str::to_string),
    }
}

/// Fixed native sizes of an existing slot; fluid sizes are skipped.
pub(crate) fn native_slot_sizes(request: &TransactionObject) -> Option<Vec<Size>> {
    let InventoryTarget::SlotObject { slot } = &request.inventory else {
        return None;
    };
    let sizes: Vec<Size> = slot
        .native_sizes()
        .into_iter()
        .filter_map(|s| match s {
            SlotSize::Fixed(size) => Some(size),
            SlotSize::Fluid => {
                debug!(slot = %slot.path(), "skipping fluid size of existing slot");
                None
            }
        })
        .collect();
    (!sizes.is_empty()).then_some(sizes)
}

/// What the request side allows, with its origin.
pub fn resolve_limit_sizes(
    request: &TransactionObject,
    pattern: Option<&AdUnitPattern>,
    mappings: &SizeMappings,
    viewport: Viewport,
) -> Option<LimitSizes> {
    if let Some(sizes) = request.size_override() {
        return Some(LimitSizes { sizes, origin: LimitOrigin::Override });
    }

    let container = container_id(request, pattern);
    if let Some(sizes) = mappings.lookup(container.as_deref(), viewport) {
        return Some(LimitSizes { sizes, origin: LimitOrigin::SizeMapping });
    }

    native_slot_sizes(request).map(|sizes| LimitSizes { sizes, origin: LimitOrigin::SlotNative })
}

/// The pattern's canonical banner sizes, narrowed to its responsive band for
/// `viewport`. Empty when the pattern declares no sizes.
pub fn resolve_pattern_sizes(pattern: &AdUnitPattern, viewport: Viewport) -> Vec<Size> {
    let Some(banner) = pattern.spec().media_types.as_ref().and_then(|m| m.banner.as_ref()) else {
        return Vec::new();
    };
    if banner.responsive_sizes.is_empty() {
        return banner.sizes.clone();
    }
    match select_band(&banner.responsive_sizes, viewport) {
        Some(band) => intersect(&banner.sizes, &band.sizes),
        None => {
            warn!(
                pattern = %pattern.label(),
                width = viewport.width,
                height = viewport.height,
                "no responsive band fits the viewport; using canonical sizes"
            );
            banner.sizes.clone()
        }
    }
}
