//! Batch dispatch.
//!
//! ```text
//! requests ── validate ──┬─ invalid ──> result (carrying `error`)
//!                        └─ valid ───> group by (source, destination), first-appearance order
//!                                         │  one ClaimSet for the whole call
//!                                         v
//!                           inventory.create_units ──> result
//!                                         │
//!                           source.request_bids(matches, on_ready = destination.send)
//! ```
//!
//! The returned list reflects matching only; bids and delivery arrive later
//! through the source's callback.

use super::assign::ClaimSet;
use super::matcher::MatchContext;
use super::registry::SubmoduleRegistry;
use super::sizes::parse_size_list;
use crate::error::ValidationError;
use crate::submodules::ReadyCallback;
use crate::{InventoryKinds, MatchObject, TransactionObject};
use serde_json::Value;
use std::rc::Rc;
use tracing::{debug, error, warn};

pub(crate) fn request_bids(
    ctx: &MatchContext<'_>,
    registry: &SubmoduleRegistry,
    requests: Vec<TransactionObject>,
) -> Vec<MatchObject> {
    let mut results = Vec::with_capacity(requests.len());
    let mut groups: Vec<((String, String), Vec<TransactionObject>)> = Vec::new();

    for mut request in requests {
        if let Err(err) = validate(registry, &mut request) {
            warn!(inventory = ?request.inventory, %err, "invalid transaction object");
            request.error = Some(err.to_string());
            results.push(MatchObject::unmatched(request));
            continue;
        }
        let key = (request.source.clone(), request.destination.name().to_string());
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(request),
            None => groups.push((key, vec![request])),
        }
    }

    let Some(inventory) = registry.inventory() else {
        return results;
    };

    let mut claims = ClaimSet::new();
    for ((source_name, destination_name), members) in groups {
        // Both were checked during validation and the registry is not touched since.
        let (Some(source), Some(destination)) = (registry.source(&source_name), registry.destination(&destination_name))
        else {
            error!(source = %source_name, destination = %destination_name, "submodule disappeared during dispatch");
            continue;
        };

        debug!(source = %source_name, destination = %destination_name, requests = members.len(), "dispatching group");
        let matches = inventory.create_units(ctx, members, &mut claims);
        results.extend(matches.iter().cloned());

        let on_ready: ReadyCallback = Rc::new(move |ready: Vec<MatchObject>| destination.send(ready));
        source.request_bids(matches, on_ready);
    }

    results
}

/// Check `request` against the registry, normalizing its size override in place.
fn validate(registry: &SubmoduleRegistry, request: &mut TransactionObject) -> Result<(), ValidationError> {
    let inventory = registry.inventory().ok_or(ValidationError::NoInventory)?;
    let kind = request.inventory.kind();
    if !inventory.supported_kinds().contains(InventoryKinds::from(kind)) {
        return Err(ValidationError::UnsupportedInventory { kind, inventory: inventory.name().to_string() });
    }
    inventory.validate(request)?;

    if let Some(raw) = &request.sizes {
        let list = parse_size_list(raw).ok_or(ValidationError::SizesNotArray)?;
        for bad in &list.malformed {
            warn!(size = %bad, "dropping malformed size from request override");
        }
        let normalized = list.sizes.iter().map(|s| Value::from(vec![s.width(), s.height()])).collect();
        request.sizes = Some(Value::Array(normalized));
    }

    let source =
        registry.source(&request.source).ok_or_else(|| ValidationError::UnknownSource(request.source.clone()))?;
    source
        .validate(request)
        .map_err(|reason| ValidationError::Rejected { submodule: source.name().to_string(), reason })?;

    let destination_name = request.destination.name();
    let destination = registry
        .destination(destination_name)
        .ok_or_else(|| ValidationError::UnknownDestination(destination_name.to_string()))?;
    destination
        .validate(request)
        .map_err(|reason| ValidationError::Rejected { submodule: destination.name().to_string(), reason })?;

    Ok(())
}
