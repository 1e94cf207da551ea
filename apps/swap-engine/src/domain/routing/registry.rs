//! Venue registry: fixed id -> adapter lookup built once at startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{Dex, VenueId};

/// Registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two adapters claimed the same venue id.
    #[error("venue '{0}' registered more than once")]
    DuplicateVenue(VenueId),
}

/// Ordered set of venue adapters.
///
/// Iteration order is registration order; the router relies on it to break
/// ties deterministically.
#[derive(Clone, Default)]
pub struct DexRegistry {
    dexes: Vec<Arc<dyn Dex>>,
    index: HashMap<VenueId, usize>,
}

impl DexRegistry {
    /// Build a registry from adapters in priority order.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateVenue` if two adapters share an id.
    pub fn new(dexes: Vec<Arc<dyn Dex>>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(dexes.len());
        for (position, dex) in dexes.iter().enumerate() {
            if index.insert(dex.id(), position).is_some() {
                return Err(RegistryError::DuplicateVenue(dex.id()));
            }
        }
        Ok(Self { dexes, index })
    }

    /// All adapters in registration order.
    #[must_use]
    pub fn dexes(&self) -> &[Arc<dyn Dex>] {
        &self.dexes
    }

    /// Look up an adapter by venue id.
    #[must_use]
    pub fn with_id(&self, id: VenueId) -> Option<Arc<dyn Dex>> {
        self.index.get(&id).map(|&i| Arc::clone(&self.dexes[i]))
    }

    /// Number of registered venues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dexes.len()
    }

    /// Whether no venues are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dexes.is_empty()
    }
}

impl fmt::Debug for DexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.dexes.iter().map(|dex| dex.id()))
            .finish()
    }
}
