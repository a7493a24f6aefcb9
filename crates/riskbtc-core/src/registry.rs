//! Lookup of addresses whose private keys are known to have leaked.
//!
//! The vulnerability scorer only asks "is this address listed?". Where the
//! list comes from is the caller's business: the default registry knows
//! nothing, and `AddressListRegistry` reads a plain text file.

use std::collections::HashSet;
use std::path::Path;

use crate::error::CoreError;

pub trait CompromisedKeyRegistry: Send + Sync {
    fn contains(&self, address: &str) -> bool;
}

/// A registry with no entries. Every lookup is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegistry;

impl CompromisedKeyRegistry for NoRegistry {
    fn contains(&self, _address: &str) -> bool {
        false
    }
}

/// An in-memory set of compromised addresses.
#[derive(Debug, Clone, Default)]
pub struct AddressListRegistry {
    addresses: HashSet<String>,
}

impl AddressListRegistry {
    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse one address per line. Surrounding whitespace is trimmed; blank
    /// lines and lines starting with `#` are ignored.
    pub fn parse(content: &str) -> Self {
        Self::from_addresses(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let registry = Self::parse(&content);
        tracing::info!(
            path = %path.display(),
            entries = registry.len(),
            "loaded compromised address list"
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl CompromisedKeyRegistry for AddressListRegistry {
    fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }
}
