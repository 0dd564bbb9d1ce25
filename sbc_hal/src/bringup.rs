//! Driver bring-up scheduler.
//!
//! Drivers are registered once at startup and initialized once, in
//! dependency order:
//!
//! 1. `prerequisites` form hard edges; `after` only breaks ties between
//!    drivers that are ready at the same time, then registration order.
//! 2. A cycle aborts bring-up with `HalError::Configuration` before any
//!    `init` runs.
//! 3. A driver whose prerequisite is unknown, skipped or failed is skipped
//!    without calling `init`.
//! 4. Individual failures never stop the remaining drivers.
//!
//! Running again returns the report of the first run.

use sbc_common::hal::driver::{BringupReport, Driver, DriverOutcome, DriverState, HalError};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    NotStarted,
    Running,
    Done(DriverState),
}

struct Slot<C: ?Sized> {
    driver: Box<dyn Driver<C>>,
    state: RunState,
}

/// Ordered, run-once initialization of a set of drivers.
///
/// Constructed at startup and owned by the HAL context; no global state.
pub struct Bringup<C: ?Sized> {
    slots: Vec<Slot<C>>,
    report: Option<BringupReport>,
}

impl<C: ?Sized> Bringup<C> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            report: None,
        }
    }

    /// Add a driver.
    ///
    /// # Errors
    /// `Configuration` if the name is empty or already taken,
    /// `AlreadyInitialized` once bring-up has run.
    pub fn register(&mut self, driver: Box<dyn Driver<C>>) -> Result<(), HalError> {
        if self.report.is_some() {
            return Err(HalError::AlreadyInitialized);
        }
        let name = driver.name();
        if name.is_empty() {
            return Err(HalError::Configuration(
                "driver name cannot be empty".to_string(),
            ));
        }
        if self.slots.iter().any(|s| s.driver.name() == name) {
            return Err(HalError::Configuration(format!(
                "driver '{name}' registered twice"
            )));
        }
        debug!("Registered driver '{}'", name);
        self.slots.push(Slot {
            driver,
            state: RunState::NotStarted,
        });
        Ok(())
    }

    /// Registered driver names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.driver.name()).collect()
    }

    /// Number of registered drivers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no driver is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Report of the completed run, if any.
    pub fn report(&self) -> Option<&BringupReport> {
        self.report.as_ref()
    }

    /// Run bring-up once.
    ///
    /// # Errors
    /// Only `Configuration`, for a prerequisite cycle. Driver errors are
    /// recorded in the report.
    pub fn run(&mut self, ctx: &C) -> Result<BringupReport, HalError> {
        if let Some(report) = &self.report {
            debug!("Bring-up already performed, returning cached report");
            return Ok(report.clone());
        }

        let index: HashMap<&'static str, usize> = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.driver.name(), i))
            .collect();
        let order = self.order(&index)?;
        info!(
            "Bring-up order: {}",
            order
                .iter()
                .map(|&i| self.slots[i].driver.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut report = BringupReport::default();
        for i in order {
            let name = self.slots[i].driver.name();

            let blocked = self.slots[i]
                .driver
                .prerequisites()
                .iter()
                .find_map(|p| match index.get(p) {
                    None => Some(format!("missing prerequisite '{p}'")),
                    Some(&j) if self.slots[j].state != RunState::Done(DriverState::Loaded) => {
                        Some(format!("dependency not satisfied: '{p}'"))
                    }
                    Some(_) => None,
                });
            if let Some(reason) = blocked {
                info!("Driver '{}' skipped: {}", name, reason);
                self.slots[i].state = RunState::Done(DriverState::Skipped);
                report.skipped.push(outcome(name, reason));
                continue;
            }

            debug!("Initializing driver '{}'", name);
            self.slots[i].state = RunState::Running;
            let state = match self.slots[i].driver.init(ctx) {
                Ok(true) => {
                    info!("Driver '{}' loaded", name);
                    report.loaded.push(name.to_string());
                    DriverState::Loaded
                }
                Ok(false) => {
                    info!("Driver '{}' skipped: hardware not present", name);
                    report
                        .skipped
                        .push(outcome(name, "hardware not present".to_string()));
                    DriverState::Skipped
                }
                Err(HalError::NotApplicable(reason)) => {
                    info!("Driver '{}' skipped: {}", name, reason);
                    report.skipped.push(outcome(name, reason));
                    DriverState::Skipped
                }
                Err(e) => {
                    warn!("Driver '{}' failed: {}", name, e);
                    report.failed.push(outcome(name, e.to_string()));
                    DriverState::Failed
                }
            };
            self.slots[i].state = RunState::Done(state);
        }

        info!(
            "Bring-up complete: {} loaded, {} skipped, {} failed",
            report.loaded.len(),
            report.skipped.len(),
            report.failed.len()
        );
        self.report = Some(report.clone());
        Ok(report)
    }

    /// Topological order over hard edges. Among ready drivers the first
    /// (in registration order) whose known `after` targets already ran
    /// wins; otherwise the first ready driver.
    fn order(&self, index: &HashMap<&'static str, usize>) -> Result<Vec<usize>, HalError> {
        let n = self.slots.len();
        let mut pending = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, slot) in self.slots.iter().enumerate() {
            for p in slot.driver.prerequisites() {
                if let Some(&j) = index.get(p) {
                    dependents[j].push(i);
                    pending[i] += 1;
                }
            }
        }

        let mut done = vec![false; n];
        let mut order = Vec::with_capacity(n);
        while order.len() < n {
            let ready: Vec<usize> = (0..n).filter(|&i| !done[i] && pending[i] == 0).collect();
            let Some(&first) = ready.first() else {
                let stuck: Vec<&str> = (0..n)
                    .filter(|&i| !done[i])
                    .map(|i| self.slots[i].driver.name())
                    .collect();
                return Err(HalError::Configuration(format!(
                    "driver prerequisites form a cycle among: {}",
                    stuck.join(", ")
                )));
            };
            let pick = ready
                .iter()
                .copied()
                .find(|&i| {
                    self.slots[i]
                        .driver
                        .after()
                        .iter()
                        .filter_map(|a| index.get(a))
                        .all(|&j| j == i || done[j])
                })
                .unwrap_or(first);

            done[pick] = true;
            order.push(pick);
            for &d in &dependents[pick] {
                pending[d] -= 1;
            }
        }
        Ok(order)
    }
}

impl<C: ?Sized> Default for Bringup<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome(driver: &str, reason: String) -> DriverOutcome {
    DriverOutcome {
        driver: driver.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Log = Mutex<Vec<&'static str>>;

    struct Scripted {
        name: &'static str,
        prerequisites: &'static [&'static str],
        after: &'static [&'static str],
        result: fn() -> Result<bool, HalError>,
    }

    impl Driver<Log> for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn prerequisites(&self) -> &[&'static str] {
            self.prerequisites
        }

        fn after(&self) -> &[&'static str] {
            self.after
        }

        fn init(&mut self, log: &Log) -> Result<bool, HalError> {
            log.lock().push(self.name);
            (self.result)()
        }
    }

    fn driver(
        name: &'static str,
        prerequisites: &'static [&'static str],
        after: &'static [&'static str],
    ) -> Box<dyn Driver<Log>> {
        Box::new(Scripted {
            name,
            prerequisites,
            after,
            result: || Ok(true),
        })
    }

    #[test]
    fn prerequisites_run_first() {
        let mut bringup = Bringup::new();
        bringup.register(driver("b", &["a"], &[])).unwrap();
        bringup.register(driver("a", &[], &[])).unwrap();
        let log = Log::default();
        let report = bringup.run(&log).unwrap();
        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert_eq!(report.loaded, vec!["a", "b"]);
    }

    #[test]
    fn after_breaks_ties() {
        let mut bringup = Bringup::new();
        bringup.register(driver("x", &[], &["y"])).unwrap();
        bringup.register(driver("y", &[], &[])).unwrap();
        bringup.register(driver("z", &[], &[])).unwrap();
        let log = Log::default();
        bringup.run(&log).unwrap();
        assert_eq!(*log.lock(), vec!["y", "x", "z"]);
    }

    #[test]
    fn after_never_blocks() {
        // "after" pointing at a driver that depends on us cannot be honored.
        let mut bringup = Bringup::new();
        bringup.register(driver("a", &[], &["b"])).unwrap();
        bringup.register(driver("b", &["a"], &[])).unwrap();
        let log = Log::default();
        bringup.run(&log).unwrap();
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[test]
    fn unknown_after_is_ignored() {
        let mut bringup = Bringup::new();
        bringup.register(driver("a", &[], &["ghost"])).unwrap();
        let report = bringup.run(&Log::default()).unwrap();
        assert_eq!(report.loaded, vec!["a"]);
    }

    #[test]
    fn cycle_aborts_before_any_init() {
        let mut bringup = Bringup::new();
        bringup.register(driver("free", &[], &[])).unwrap();
        bringup.register(driver("a", &["b"], &[])).unwrap();
        bringup.register(driver("b", &["a"], &[])).unwrap();
        let log = Log::default();
        let err = bringup.run(&log).unwrap_err();
        assert!(matches!(err, HalError::Configuration(ref m) if m.contains("a, b")));
        assert!(log.lock().is_empty());
        assert!(bringup.report().is_none());
    }

    #[test]
    fn self_prerequisite_is_a_cycle() {
        let mut bringup = Bringup::new();
        bringup.register(driver("loop", &["loop"], &[])).unwrap();
        assert!(matches!(
            bringup.run(&Log::default()),
            Err(HalError::Configuration(_))
        ));
    }

    #[test]
    fn skip_propagates_down_the_chain() {
        let mut bringup = Bringup::new();
        bringup
            .register(Box::new(Scripted {
                name: "root",
                prerequisites: &[],
                after: &[],
                result: || Ok(false),
            }))
            .unwrap();
        bringup.register(driver("mid", &["root"], &[])).unwrap();
        bringup.register(driver("leaf", &["mid"], &[])).unwrap();
        let log = Log::default();
        let report = bringup.run(&log).unwrap();

        assert_eq!(*log.lock(), vec!["root"]);
        assert_eq!(report.reason_of("root"), Some("hardware not present"));
        assert_eq!(report.state_of("leaf"), Some(DriverState::Skipped));
        assert_eq!(report.reason_of("leaf"), Some("dependency not satisfied: 'mid'"));
    }

    #[test]
    fn not_applicable_is_a_skip() {
        let mut bringup = Bringup::new();
        bringup
            .register(Box::new(Scripted {
                name: "wrong-soc",
                prerequisites: &[],
                after: &[],
                result: || Err(HalError::NotApplicable("not an h3".to_string())),
            }))
            .unwrap();
        let report = bringup.run(&Log::default()).unwrap();
        assert_eq!(report.state_of("wrong-soc"), Some(DriverState::Skipped));
        assert_eq!(report.reason_of("wrong-soc"), Some("not an h3"));
        assert!(!report.has_failures());
    }

    #[test]
    fn duplicate_and_empty_names_rejected() {
        let mut bringup = Bringup::new();
        bringup.register(driver("a", &[], &[])).unwrap();
        assert!(matches!(
            bringup.register(driver("a", &[], &[])),
            Err(HalError::Configuration(_))
        ));
        assert!(matches!(
            bringup.register(driver("", &[], &[])),
            Err(HalError::Configuration(_))
        ));
        assert_eq!(bringup.names(), vec!["a"]);
    }

    #[test]
    fn second_run_returns_cached_report() {
        let mut bringup = Bringup::new();
        bringup.register(driver("a", &[], &[])).unwrap();
        let log = Log::default();
        let first = bringup.run(&log).unwrap();
        let second = bringup.run(&log).unwrap();
        assert_eq!(first, second);
        assert_eq!(*log.lock(), vec!["a"]);
        assert!(matches!(
            bringup.register(driver("late", &[], &[])),
            Err(HalError::AlreadyInitialized)
        ));
    }
}
