//! Named submodule slots.

use crate::error::RegistryError;
use crate::submodules::{DestinationSubmodule, InventorySubmodule, SourceSubmodule};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmoduleKind {
    Inventory,
    Source,
    Destination,
}

impl SubmoduleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmoduleKind::Inventory => "inventory",
            SubmoduleKind::Source => "source",
            SubmoduleKind::Destination => "destination",
        }
    }
}

impl fmt::Display for SubmoduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submodule ready for registration.
pub enum Submodule {
    Inventory(Box<dyn InventorySubmodule>),
    Source(Rc<dyn SourceSubmodule>),
    Destination(Rc<dyn DestinationSubmodule>),
}

impl Submodule {
    pub fn kind(&self) -> SubmoduleKind {
        match self {
            Submodule::Inventory(_) => SubmoduleKind::Inventory,
            Submodule::Source(_) => SubmoduleKind::Source,
            Submodule::Destination(_) => SubmoduleKind::Destination,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Submodule::Inventory(m) => m.name(),
            Submodule::Source(m) => m.name(),
            Submodule::Destination(m) => m.name(),
        }
    }
}

impl fmt::Debug for Submodule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submodule").field("kind", &self.kind()).field("name", &self.name()).finish()
    }
}

/// One inventory, any number of sources and destinations.
///
/// Registration is late-bound: names are only resolved when a request is
/// validated, so the order of registration never matters.
#[derive(Default)]
pub struct SubmoduleRegistry {
    inventory: Option<Box<dyn InventorySubmodule>>,
    sources: HashMap<String, Rc<dyn SourceSubmodule>>,
    destinations: HashMap<String, Rc<dyn DestinationSubmodule>>,
}

impl SubmoduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `submodule`, replacing any previous one of the same kind and name.
    pub fn register(&mut self, submodule: Submodule) -> Result<(), RegistryError> {
        let kind = submodule.kind();
        let name = submodule.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName(kind.as_str()));
        }

        let replaced = match submodule {
            Submodule::Inventory(m) => self.inventory.replace(m).is_some(),
            Submodule::Source(m) => self.sources.insert(name.clone(), m).is_some(),
            Submodule::Destination(m) => self.destinations.insert(name.clone(), m).is_some(),
        };
        if replaced {
            warn!(%kind, %name, "replacing previously registered submodule");
        } else {
            info!(%kind, %name, "submodule registered");
        }
        Ok(())
    }

    pub fn inventory(&self) -> Option<&dyn InventorySubmodule> {
        self.inventory.as_deref()
    }

    pub fn source(&self, name: &str) -> Option<Rc<dyn SourceSubmodule>> {
        self.sources.get(name).cloned()
    }

    pub fn destination(&self, name: &str) -> Option<Rc<dyn DestinationSubmodule>> {
        self.destinations.get(name).cloned()
    }
}

impl fmt::Debug for SubmoduleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<&String> = self.sources.keys().collect();
        sources.sort();
        let mut destinations: Vec<&String> = self.destinations.keys().collect();
        destinations.sort();
        f.debug_struct("SubmoduleRegistry")
            .field("inventory", &self.inventory.as_ref().map(|m| m.name()))
            .field("sources", &sources)
            .field("destinations", &destinations)
            .finish()
    }
}
