//! Unit construction.
//!
//! Turns a claimed pattern plus its request into the concrete [`AdUnit`]
//! handed to the bidding engine, and derives the container id / slot path a
//! match belongs to.
//!
//! Order matters: sizes are final and sorted before the generated code is
//! hashed, so identical inputs always yield the identical code.

use super::matcher::MatchContext;
use super::patterns::{AdUnitPattern, PatternSpec};
use super::sizes::{LimitOrigin, intersect, looks_like_pattern, resolve_limit_sizes, resolve_pattern_sizes, sort_sizes};
use crate::{AdUnit, Banner, InventoryKind, InventoryTarget, MatchObject, MediaTypes, Size, TransactionObject};
use serde_json::{Map, Value, json};
use tracing::{debug, error};
use uuid::Uuid;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-16 code units of `input`.
pub(crate) fn fnv1a_32(input: &str) -> u32 {
    input.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME))
}

/// Pair a request with its claimed pattern, building the unit if there is one.
pub(crate) fn build_match(
    ctx: &MatchContext<'_>,
    request: TransactionObject,
    pattern: Option<&AdUnitPattern>,
) -> MatchObject {
    let unit = pattern.and_then(|pattern| match build_unit(ctx, pattern, &request) {
        Ok(unit) => Some(unit),
        Err(err) => {
            error!(pattern = %pattern.label(), %err, "error building unit from placement pattern");
            None
        }
    });
    let div_id = div_id(&request, pattern);
    let slot_name = slot_name(&request, pattern);
    MatchObject { request, unit, values: None, div_id, slot_name }
}

/// Materialize the unit for `pattern` serving `request`.
pub fn build_unit(
    ctx: &MatchContext<'_>,
    pattern: &AdUnitPattern,
    request: &TransactionObject,
) -> Result<AdUnit, serde_json::Error> {
    let mut spec = pattern.spec().clone();
    let sizes = final_sizes(ctx, pattern, request);

    let media_types = spec.media_types.get_or_insert_with(MediaTypes::default);
    if media_types.banner.is_some() || media_types.video.is_none() {
        media_types.banner.get_or_insert_with(Banner::default).sizes = sizes;
    }

    let code = match spec.code.take() {
        Some(code) => code,
        None => format!("{:x}", fnv1a_32(&serde_json::to_string(&spec)?)),
    };

    let PatternSpec { media_types, bids, mut extra, .. } = spec;
    let transaction_id = match extra.remove("transactionId") {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    };

    let mut unit = AdUnit { code, media_types, bids, ortb2_imp: None, transaction_id, extra };
    apply_first_party_data(&mut unit, request, Some(pattern));
    debug!(code = %unit.code, sizes = ?unit.sizes(), "built unit");
    Ok(unit)
}

fn final_sizes(ctx: &MatchContext<'_>, pattern: &AdUnitPattern, request: &TransactionObject) -> Vec<Size> {
    let pattern_sizes = resolve_pattern_sizes(pattern, ctx.viewport());
    let limit = resolve_limit_sizes(request, Some(pattern), ctx.size_mappings(), ctx.viewport());

    let mut sizes = match limit {
        Some(limit) if !limit.sizes.is_empty() => {
            let named = matches!(request.inventory.kind(), InventoryKind::Slot | InventoryKind::Div);
            if pattern_sizes.is_empty() || (named && limit.origin == LimitOrigin::Override) {
                limit.sizes
            } else {
                intersect(&pattern_sizes, &limit.sizes)
            }
        }
        _ => pattern_sizes,
    };
    sort_sizes(&mut sizes);
    sizes
}

/// Copy the request's `ortb2Imp` onto the unit and annotate it with the
/// resolved ad-server slot path.
fn apply_first_party_data(unit: &mut AdUnit, request: &TransactionObject, pattern: Option<&AdUnitPattern>) {
    if let Some(data) = &request.first_party_data {
        unit.ortb2_imp = Some(data.clone());
    }

    let slot = slot_name(request, pattern);
    if slot.is_empty() {
        return;
    }
    let ortb2_imp = unit.ortb2_imp.get_or_insert_with(|| Value::Object(Map::new()));
    deep_set(ortb2_imp, &["ext", "data", "pbadslot"], Value::String(slot.clone()));
    deep_set(ortb2_imp, &["ext", "data", "adserver"], json!({"name": "gam", "adslot": slot}));
}

/// Set `path` inside `target`, replacing non-object intermediates.
fn deep_set(target: &mut Value, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *target = value;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        deep_set(map.entry(first.to_string()).or_insert(Value::Null), rest, value);
    }
}

/// Page container the result of `request` belongs in; empty when unknown.
pub(crate) fn div_id(request: &TransactionObject, pattern: Option<&AdUnitPattern>) -> String {
    if let InventoryTarget::SlotObject { slot } = &request.inventory {
        return slot.element_id();
    }
    let Some(pattern) = pattern else {
        return String::new();
    };
    if let InventoryTarget::Div { name } = &request.inventory {
        return name.clone();
    }
    concrete(pattern.div_pattern())
}

/// Ad-server slot path for `request`; empty when unknown.
pub(crate) fn slot_name(request: &TransactionObject, pattern: Option<&AdUnitPattern>) -> String {
    match &request.inventory {
        InventoryTarget::Slot { name } => name.clone(),
        InventoryTarget::SlotObject { slot } => slot.path(),
        InventoryTarget::Div { .. } => concrete(pattern.and_then(AdUnitPattern::slot_pattern)),
        InventoryTarget::AutoSlots => String::new(),
    }
}

fn concrete(value: Option<&str>) -> String {
    value.filter(|v| !looks_like_pattern(v)).unwrap_or_default().to_string()
}
