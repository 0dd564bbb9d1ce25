//! Physical headers: rows of pin names and position lookup.
//!
//! Headers are held in a [`ResourceRegistry`] like every other resource
//! kind. Pins are referenced by canonical name.

use crate::registry::{RegistryError, ResourceRegistry};
use serde::Serialize;
use std::sync::Arc;

/// One physical connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Header name, e.g. "P1".
    pub name: String,
    /// Canonical pin names, row-major.
    pub rows: Vec<Vec<String>>,
}

impl Header {
    /// 1-based row-major index of `pin` on this header.
    pub fn index_of(&self, pin: &str) -> Option<usize> {
        self.rows
            .iter()
            .flatten()
            .position(|p| p == pin)
            .map(|i| i + 1)
    }

    /// Pin at the 1-based row-major `index`.
    pub fn pin_at(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.rows.iter().flatten().nth(i))
            .map(String::as_str)
    }

    /// Total number of positions.
    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Whether the header has no positions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a pin sits on a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderPosition {
    /// Header name.
    pub header: String,
    /// 1-based row-major index.
    pub index: usize,
}

/// Registry of physical headers.
#[derive(Debug)]
pub struct HeaderRegistry {
    headers: ResourceRegistry<Arc<Header>>,
}

impl HeaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            headers: ResourceRegistry::new("header"),
        }
    }

    /// Register a header under `name`.
    pub fn register(
        &self,
        name: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<Arc<Header>, RegistryError> {
        let header = Arc::new(Header {
            name: name.to_string(),
            rows,
        });
        self.headers.register(name, Arc::clone(&header))?;
        Ok(header)
    }

    /// Remove a header.
    pub fn unregister(&self, name: &str) -> Result<Arc<Header>, RegistryError> {
        self.headers.unregister(name)
    }

    /// Look up a header by name.
    pub fn by_name(&self, name: &str) -> Option<Arc<Header>> {
        self.headers.by_name(name)
    }

    /// Snapshot of every header, sorted by name.
    pub fn all(&self) -> Vec<Arc<Header>> {
        self.headers.all().into_iter().map(|(_, h)| h).collect()
    }

    /// First header position of `pin`. `None` means the pin is on no
    /// known header.
    pub fn position(&self, pin: &str) -> Option<HeaderPosition> {
        self.all().into_iter().find_map(|header| {
            header.index_of(pin).map(|index| HeaderPosition {
                header: header.name.clone(),
                index,
            })
        })
    }

    /// Whether `pin` appears on any header.
    pub fn is_connected(&self, pin: &str) -> bool {
        self.position(pin).is_some()
    }
}

impl Default for HeaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
