//! Resource registry: name and alias lookup for one resource kind.
//!
//! The same type backs pins, I2C buses, SPI ports, 1-Wire buses and
//! physical headers. Aliases are flattened when they are registered, so a
//! lookup is at most one hop and never recurses.
//!
//! Each registry holds one mutex guarding both tables. Reads copy the
//! resource out; the lock is never held while caller code runs.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Registry error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is already used as a canonical name or an alias.
    #[error("name already registered: {0}")]
    DuplicateName(String),

    /// The name is neither a canonical name nor an alias.
    #[error("unknown name: {0}")]
    UnknownName(String),

    /// Empty names are never valid.
    #[error("name cannot be empty")]
    EmptyName,
}

#[derive(Debug)]
struct Tables<T> {
    /// Canonical name → resource.
    resources: BTreeMap<String, T>,
    /// Alias → canonical name (always one hop).
    aliases: BTreeMap<String, String>,
}

impl<T> Tables<T> {
    fn is_used(&self, name: &str) -> bool {
        self.resources.contains_key(name) || self.aliases.contains_key(name)
    }

    fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.resources.contains_key(name) {
            return Some(name);
        }
        self.aliases.get(name).map(String::as_str)
    }
}

/// Name-indexed, alias-resolving lookup table for one resource kind.
///
/// Constructed explicitly and passed around by reference, so tests can
/// build isolated instances.
#[derive(Debug)]
pub struct ResourceRegistry<T> {
    kind: &'static str,
    tables: Mutex<Tables<T>>,
}

impl<T: Clone> ResourceRegistry<T> {
    /// Create an empty registry. `kind` is only used in log output.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            tables: Mutex::new(Tables {
                resources: BTreeMap::new(),
                aliases: BTreeMap::new(),
            }),
        }
    }

    /// Resource kind this registry holds.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register `resource` under the canonical `name`.
    ///
    /// # Errors
    /// `DuplicateName` if `name` collides with any canonical name or alias;
    /// the registry is left unchanged.
    pub fn register(&self, name: &str, resource: T) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut tables = self.tables.lock();
        if tables.is_used(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        tables.resources.insert(name.to_string(), resource);
        debug!(kind = self.kind, name, "registered");
        Ok(())
    }

    /// Register `alias` as another name for `target`.
    ///
    /// `target` may itself be an alias; the stored mapping always points at
    /// the canonical name.
    ///
    /// # Errors
    /// `DuplicateName` if `alias` is already used, `UnknownName` if `target`
    /// does not resolve.
    pub fn register_alias(&self, alias: &str, target: &str) -> Result<(), RegistryError> {
        if alias.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut tables = self.tables.lock();
        if tables.is_used(alias) {
            return Err(RegistryError::DuplicateName(alias.to_string()));
        }
        let canonical = tables
            .resolve(target)
            .ok_or_else(|| RegistryError::UnknownName(target.to_string()))?
            .to_string();
        debug!(kind = self.kind, alias, canonical = %canonical, "registered alias");
        tables.aliases.insert(alias.to_string(), canonical);
        Ok(())
    }

    /// Remove the resource `name` resolves to, along with every alias
    /// pointing at it. The name may be re-registered afterwards.
    ///
    /// # Errors
    /// `UnknownName` if `name` does not resolve.
    pub fn unregister(&self, name: &str) -> Result<T, RegistryError> {
        let mut tables = self.tables.lock();
        let canonical = tables
            .resolve(name)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))?
            .to_string();
        tables.aliases.retain(|_, target| *target != canonical);
        let resource = tables
            .resources
            .remove(&canonical)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))?;
        debug!(kind = self.kind, name = %canonical, "unregistered");
        Ok(resource)
    }

    /// Resolve a canonical name or alias. Returns `None` rather than failing.
    pub fn by_name(&self, name: &str) -> Option<T> {
        let tables = self.tables.lock();
        let canonical = tables.resolve(name)?;
        tables.resources.get(canonical).cloned()
    }

    /// Canonical name `name` resolves to.
    pub fn canonical_name(&self, name: &str) -> Option<String> {
        self.tables.lock().resolve(name).map(str::to_string)
    }

    /// Whether `name` is registered as a canonical name or alias.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.lock().is_used(name)
    }

    /// Aliases currently pointing at the resource `name` resolves to.
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let tables = self.tables.lock();
        let Some(canonical) = tables.resolve(name) else {
            return Vec::new();
        };
        tables
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.clone())
            .collect()
    }

    /// Snapshot of every resource, sorted by canonical name.
    ///
    /// The returned vector is an independent copy: the caller may
    /// register or unregister while iterating it.
    pub fn all(&self) -> Vec<(String, T)> {
        self.tables
            .lock()
            .resources
            .iter()
            .map(|(name, resource)| (name.clone(), resource.clone()))
            .collect()
    }

    /// Snapshot of the alias table as `(alias, canonical)` pairs.
    pub fn aliases(&self) -> Vec<(String, String)> {
        self.tables
            .lock()
            .aliases
            .iter()
            .map(|(alias, canonical)| (alias.clone(), canonical.clone()))
            .collect()
    }

    /// Number of canonical entries.
    pub fn len(&self) -> usize {
        self.tables.lock().resources.len()
    }

    /// Whether the registry holds no resources.
    pub fn is_empty(&self) -> bool {
        self.tables.lock().resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn register_then_lookup() {
        let reg = ResourceRegistry::new("test");
        reg.register("PA0", 1u32).unwrap();
        assert_eq!(reg.by_name("PA0"), Some(1));
        assert_eq!(reg.by_name("PA1"), None);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_canonical_is_rejected_and_keeps_original() {
        let reg = ResourceRegistry::new("test");
        reg.register("PA0", 1u32).unwrap();
        assert_eq!(
            reg.register("PA0", 2),
            Err(RegistryError::DuplicateName("PA0".to_string()))
        );
        assert_eq!(reg.by_name("PA0"), Some(1));
    }

    #[test]
    fn canonical_name_cannot_shadow_alias() {
        let reg = ResourceRegistry::new("test");
        reg.register("PA0", 1u32).unwrap();
        reg.register_alias("GPIO0", "PA0").unwrap();
        assert!(matches!(
            reg.register("GPIO0", 2),
            Err(RegistryError::DuplicateName(_))
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn alias_to_unknown_target_fails() {
        let reg: ResourceRegistry<u32> = ResourceRegistry::new("test");
        assert_eq!(
            reg.register_alias("P1_3", "PA12"),
            Err(RegistryError::UnknownName("PA12".to_string()))
        );
    }

    #[test]
    fn alias_chain_is_flattened() {
        let reg = ResourceRegistry::new("test");
        reg.register("PA12", 12u32).unwrap();
        reg.register_alias("GPIO12", "PA12").unwrap();
        reg.register_alias("P1_3", "GPIO12").unwrap();
        assert_eq!(
            reg.aliases(),
            vec![
                ("GPIO12".to_string(), "PA12".to_string()),
                ("P1_3".to_string(), "PA12".to_string()),
            ]
        );
        assert_eq!(reg.canonical_name("P1_3").as_deref(), Some("PA12"));
    }

    #[test]
    fn unregister_removes_aliases_and_allows_reuse() {
        let reg = ResourceRegistry::new("test");
        reg.register("I2C1", 1u32).unwrap();
        reg.register_alias("/dev/i2c-1", "I2C1").unwrap();

        assert_eq!(reg.unregister("I2C1"), Ok(1));
        assert_eq!(reg.by_name("I2C1"), None);
        assert_eq!(reg.by_name("/dev/i2c-1"), None);
        assert!(reg.aliases().is_empty());

        reg.register("I2C1", 3).unwrap();
        assert_eq!(reg.by_name("I2C1"), Some(3));
    }

    #[test]
    fn unregister_through_alias() {
        let reg = ResourceRegistry::new("test");
        reg.register("SPI0.0", 0u32).unwrap();
        reg.register_alias("/dev/spidev0.0", "SPI0.0").unwrap();
        assert_eq!(reg.unregister("/dev/spidev0.0"), Ok(0));
        assert!(reg.is_empty());
    }

    #[test]
    fn unregister_unknown_fails() {
        let reg: ResourceRegistry<u32> = ResourceRegistry::new("test");
        assert_eq!(
            reg.unregister("nope"),
            Err(RegistryError::UnknownName("nope".to_string()))
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        let reg = ResourceRegistry::new("test");
        assert_eq!(reg.register("", 0u32), Err(RegistryError::EmptyName));
        reg.register("A", 0).unwrap();
        assert_eq!(reg.register_alias("", "A"), Err(RegistryError::EmptyName));
    }

    #[test]
    fn all_is_a_snapshot() {
        let reg = ResourceRegistry::new("test");
        reg.register("B", 2u32).unwrap();
        reg.register("A", 1).unwrap();

        let snapshot = reg.all();
        for (name, _) in &snapshot {
            reg.unregister(name).unwrap();
        }
        assert_eq!(
            snapshot,
            vec![("A".to_string(), 1), ("B".to_string(), 2)]
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn aliases_of_lists_every_alias() {
        let reg = ResourceRegistry::new("test");
        reg.register("PA11", 11u32).unwrap();
        reg.register_alias("GPIO11", "PA11").unwrap();
        reg.register_alias("P1_5", "GPIO11").unwrap();
        assert_eq!(reg.aliases_of("P1_5"), vec!["GPIO11", "P1_5"]);
        assert!(reg.aliases_of("missing").is_empty());
    }

    #[test]
    fn concurrent_registration_is_all_or_nothing() {
        let reg = Arc::new(ResourceRegistry::new("test"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.register("shared", i).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(reg.len(), 1);
    }
}
