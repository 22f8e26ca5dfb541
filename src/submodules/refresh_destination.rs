//! Set targeting on ad-server slots and refresh them.
//!
//! Runs inside the slot directory's command queue. For each match:
//!
//! ```text
//! target div = destination div, else derived div id      (none → skip)
//! slot       = existing slot in that div                 (path / size mismatches logged)
//!              else create(slot name, sizes, div)        (no slot name → skip)
//! sizes      = non-empty request override, else unit sizes
//! ```
//!
//! Custom targeting goes on every collected slot, bid targeting only on slots
//! whose match built a unit, then everything is refreshed in one call.

use super::{DestinationSubmodule, names};
use crate::collaborators::{BiddingEngine, SlotDirectory, SlotHandle, SlotSize};
use crate::{DestinationTarget, MatchObject, Size};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, error, warn};

pub struct RefreshSlotDestination {
    slots: Rc<dyn SlotDirectory>,
    bidding: Rc<dyn BiddingEngine>,
}

impl RefreshSlotDestination {
    pub fn new(slots: Rc<dyn SlotDirectory>, bidding: Rc<dyn BiddingEngine>) -> Self {
        Self { slots, bidding }
    }
}

impl DestinationSubmodule for RefreshSlotDestination {
    fn name(&self) -> &str {
        names::DESTINATION_REFRESH_SLOT
    }

    fn send(&self, matches: Vec<MatchObject>) {
        let slots = Rc::clone(&self.slots);
        let bidding = Rc::clone(&self.bidding);
        self.slots.enqueue(Box::new(move || refresh(slots.as_ref(), bidding.as_ref(), &matches)));
    }
}

fn refresh(directory: &dyn SlotDirectory, bidding: &dyn BiddingEngine, matches: &[MatchObject]) {
    let mut by_div: HashMap<String, SlotHandle> = match directory.list_slots() {
        Ok(slots) => slots.into_iter().map(|slot| (slot.element_id(), slot)).collect(),
        Err(err) => {
            error!(%err, "could not list existing slots");
            HashMap::new()
        }
    };

    let mut to_refresh: Vec<SlotHandle> = Vec::new();
    let mut unit_codes = Vec::new();
    let mut slots_by_code = HashMap::new();

    for m in matches {
        let div = m.request.destination.div().unwrap_or(m.div_id.as_str()).to_string();
        if div.is_empty() {
            error!(inventory = ?m.request.inventory, "unable to find target div id");
            continue;
        }
        let sizes = match m.request.size_override() {
            Some(sizes) if !sizes.is_empty() => sizes,
            _ => m.unit.as_ref().map(|u| u.sizes().to_vec()).unwrap_or_default(),
        };

        let slot = match by_div.get(&div) {
            Some(slot) => {
                if m.unit.is_some() {
                    check_existing_slot(slot, &m.slot_name, &sizes, &div);
                }
                Rc::clone(slot)
            }
            None => {
                if m.slot_name.is_empty() {
                    error!(div = %div, "unable to find slot path for transaction object");
                    continue;
                }
                match directory.create_slot(&m.slot_name, &sizes, &div) {
                    Ok(Some(slot)) => {
                        by_div.insert(div.clone(), Rc::clone(&slot));
                        slot
                    }
                    Ok(None) => {
                        warn!(div = %div, path = %m.slot_name, "slot directory declined to create slot");
                        continue;
                    }
                    Err(err) => {
                        error!(div = %div, path = %m.slot_name, %err, "error creating slot");
                        continue;
                    }
                }
            }
        };

        if let DestinationTarget::RefreshSlot { targeting, .. } = &m.request.destination {
            for (key, values) in targeting {
                slot.set_targeting(key, values);
            }
        }

        if !to_refresh.iter().any(|s| Rc::ptr_eq(s, &slot)) {
            to_refresh.push(Rc::clone(&slot));
        }
        if let Some(unit) = &m.unit {
            unit_codes.push(unit.code.clone());
            slots_by_code.insert(unit.code.clone(), slot);
        }
    }

    if !unit_codes.is_empty() {
        bidding.apply_targeting(&unit_codes, &slots_by_code);
    }
    if to_refresh.is_empty() {
        debug!("no slots to refresh");
        return;
    }
    if let Err(err) = directory.refresh(&to_refresh) {
        error!(%err, slots = to_refresh.len(), "slot refresh failed");
    }
}

fn check_existing_slot(slot: &SlotHandle, expected_path: &str, unit_sizes: &[Size], div: &str) {
    let path = slot.path();
    if !expected_path.is_empty() && path != expected_path {
        error!(div, path = %path, expected = expected_path, "target div holds a slot with a different path");
    }

    let native: HashSet<Size> = slot
        .native_sizes()
        .into_iter()
        .filter_map(|s| match s {
            SlotSize::Fixed(size) => Some(size),
            SlotSize::Fluid => None,
        })
        .collect();
    let wanted: HashSet<Size> = unit_sizes.iter().copied().collect();
    if native != wanted {
        warn!(
            div,
            slot_sizes = ?native,
            unit_sizes = ?wanted,
            "target div holds a slot whose sizes differ from the unit"
        );
    }
}
