//! Paint the winning creative straight into a page container.

use super::{DestinationSubmodule, names};
use crate::collaborators::PageRenderer;
use crate::engine::AuctionTracker;
use crate::{AuctionResult, MatchObject};
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Renders the highest bid of each match, then marks it rendered in the
/// tracker so a later cache request can't paint it again.
pub struct RenderDestination {
    page: Rc<dyn PageRenderer>,
    tracker: Rc<AuctionTracker>,
}

impl RenderDestination {
    pub fn new(page: Rc<dyn PageRenderer>, tracker: Rc<AuctionTracker>) -> Self {
        Self { page, tracker }
    }

    fn render(&self, m: &MatchObject) {
        let Some(unit) = &m.unit else {
            warn!(inventory = ?m.request.inventory, "unit not created for transaction object");
            return;
        };
        let Some(bid) = m.values.as_ref().and_then(AuctionResult::highest_bid) else {
            warn!(code = %unit.code, "no bid for unit");
            return;
        };

        let target = m.request.destination.div().unwrap_or(m.div_id.as_str());
        let Some(container) = Some(target).filter(|t| !t.is_empty()).and_then(|t| self.page.find_container(t)) else {
            error!(div = %target, code = %unit.code, "container not found");
            return;
        };

        match self.page.render_creative(&container, bid) {
            Ok(()) => {
                debug!(div = %container.id, ad_id = %bid.ad_id, cpm = bid.cpm, "creative rendered");
                if !self.tracker.mark_rendered(&unit.code, &bid.ad_id) {
                    debug!(code = %unit.code, ad_id = %bid.ad_id, "rendered bid is not in the latest auction");
                }
            }
            Err(err) => error!(div = %container.id, ad_id = %bid.ad_id, %err, "render failed"),
        }
    }
}

impl DestinationSubmodule for RenderDestination {
    fn name(&self) -> &str {
        names::DESTINATION_RENDER
    }

    fn send(&self, matches: Vec<MatchObject>) {
        for m in &matches {
            self.render(m);
        }
    }
}
