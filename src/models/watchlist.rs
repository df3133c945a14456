use std::collections::HashSet;
use std::sync::Arc;

use super::Address;
use crate::logging::LogContext;

/// Immutable set of watched addresses, frozen for one scan cycle.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct WatchlistSnapshot {
    addresses: Arc<HashSet<Address>>,
}

impl WatchlistSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse registry entries, dropping any that are not hex addresses
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut addresses = HashSet::new();
        for entry in entries {
            let entry = entry.as_ref();
            match entry.parse::<Address>() {
                Ok(address) => {
                    addresses.insert(address);
                }
                Err(e) => {
                    LogContext::new("watchlist", "parse_entry")
                        .with_address(entry)
                        .warn(&format!("Ignoring watchlist entry: {}", e));
                }
            }
        }
        Self {
            addresses: Arc::new(addresses),
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl FromIterator<Address> for WatchlistSnapshot {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        Self {
            addresses: Arc::new(iter.into_iter().collect()),
        }
    }
}
