//! Hand each match to the caller's function.

use super::{DestinationSubmodule, names};
use crate::{DestinationTarget, MatchObject, TransactionObject};
use tracing::{error, warn};

pub struct CallbackDestination;

impl DestinationSubmodule for CallbackDestination {
    fn name(&self) -> &str {
        names::DESTINATION_CALLBACK
    }

    fn validate(&self, request: &TransactionObject) -> Result<(), String> {
        match request.destination {
            DestinationTarget::Callback(_) => Ok(()),
            _ => Err("callback destination requires a callback function".to_string()),
        }
    }

    fn send(&self, matches: Vec<MatchObject>) {
        for m in &matches {
            let DestinationTarget::Callback(callback) = &m.request.destination else {
                error!(inventory = ?m.request.inventory, "callback is not a function");
                continue;
            };
            if !m.is_matched() {
                warn!(inventory = ?m.request.inventory, "unit not created for transaction object");
            }
            callback.call(m);
        }
    }
}
