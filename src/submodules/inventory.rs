//! Pattern-based inventory: expand, claim, build.

use super::InventorySubmodule;
use crate::collaborators::SlotDirectory;
use crate::engine::{ClaimSet, MatchContext, assign, build_match};
use crate::error::ValidationError;
use crate::{InventoryKinds, InventoryTarget, MatchObject, TransactionObject};
use std::rc::Rc;
use tracing::{error, info, warn};

/// The default inventory, backed by the engine's placement patterns.
///
/// The slot directory is only needed to expand `autoSlots` requests.
pub struct PatternInventory {
    slots: Option<Rc<dyn SlotDirectory>>,
}

impl PatternInventory {
    pub const NAME: &'static str = "patterns";

    pub fn new(slots: Option<Rc<dyn SlotDirectory>>) -> Self {
        Self { slots }
    }

    /// One existing-slot request per slot in the directory, inheriting
    /// source, destination and first-party data.
    fn expand_auto_slots(&self, request: &TransactionObject) -> Vec<TransactionObject> {
        let Some(directory) = &self.slots else {
            warn!("autoSlots request without a slot directory; nothing to expand");
            return Vec::new();
        };
        let slots = match directory.list_slots() {
            Ok(slots) => slots,
            Err(err) => {
                error!(%err, "could not list existing slots");
                return Vec::new();
            }
        };
        if slots.is_empty() {
            info!("autoSlots request found no existing slots");
        }
        slots
            .into_iter()
            .map(|slot| TransactionObject {
                inventory: InventoryTarget::SlotObject { slot },
                sizes: None,
                first_party_data: request.first_party_data.clone(),
                source: request.source.clone(),
                destination: request.destination.clone(),
                error: None,
            })
            .collect()
    }
}

impl InventorySubmodule for PatternInventory {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supported_kinds(&self) -> InventoryKinds {
        InventoryKinds::all()
    }

    fn validate(&self, request: &TransactionObject) -> Result<(), ValidationError> {
        match &request.inventory {
            InventoryTarget::Slot { name } | InventoryTarget::Div { name } if name.is_empty() => {
                Err(ValidationError::MissingName(request.inventory.kind()))
            }
            _ => Ok(()),
        }
    }

    fn create_units(
        &self,
        ctx: &MatchContext<'_>,
        requests: Vec<TransactionObject>,
        claims: &mut ClaimSet,
    ) -> Vec<MatchObject> {
        let mut expanded = Vec::with_capacity(requests.len());
        for request in requests {
            if matches!(request.inventory, InventoryTarget::AutoSlots) {
                expanded.extend(self.expand_auto_slots(&request));
            } else {
                expanded.push(request);
            }
        }

        assign(ctx, expanded, claims)
            .into_iter()
            .map(|(request, pattern)| build_match(ctx, request, pattern))
            .collect()
    }
}
