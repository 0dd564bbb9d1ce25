//! Bring-up scheduling through the public `Hal` API.
//!
//! Scripted drivers record their `init` calls in a shared log so ordering
//! and skipped calls can be asserted.

use parking_lot::Mutex;
use sbc_common::config::HalConfig;
use sbc_common::hal::driver::{Driver, DriverState, HalError};
use sbc_hal::{Hal, HalContext};
use std::sync::Arc;

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Scripted {
    name: &'static str,
    prerequisites: &'static [&'static str],
    after: &'static [&'static str],
    result: fn() -> Result<bool, HalError>,
    log: Log,
}

impl Driver<HalContext> for Scripted {
    fn name(&self) -> &'static str {
        self.name
    }

    fn prerequisites(&self) -> &[&'static str] {
        self.prerequisites
    }

    fn after(&self) -> &[&'static str] {
        self.after
    }

    fn init(&mut self, _ctx: &HalContext) -> Result<bool, HalError> {
        self.log.lock().push(self.name);
        (self.result)()
    }
}

fn scripted(
    log: &Log,
    name: &'static str,
    prerequisites: &'static [&'static str],
    after: &'static [&'static str],
    result: fn() -> Result<bool, HalError>,
) -> Box<dyn Driver<HalContext>> {
    Box::new(Scripted {
        name,
        prerequisites,
        after,
        result,
        log: Arc::clone(log),
    })
}

fn loaded() -> Result<bool, HalError> {
    Ok(true)
}

fn denied() -> Result<bool, HalError> {
    Err(HalError::PermissionDenied("/dev/mem".to_string()))
}

fn absent() -> Result<bool, HalError> {
    Ok(false)
}

#[test]
fn failed_prerequisite_skips_dependents_only() {
    let log = Log::default();
    let mut hal = Hal::bare(HalConfig::default()).unwrap();
    hal.register(scripted(&log, "D", &["B"], &[], loaded)).unwrap();
    hal.register(scripted(&log, "C", &[], &["B"], loaded)).unwrap();
    hal.register(scripted(&log, "B", &["A"], &[], denied)).unwrap();
    hal.register(scripted(&log, "A", &[], &[], loaded)).unwrap();

    let report = hal.init().unwrap();
    assert_eq!(report.state_of("A"), Some(DriverState::Loaded));
    assert_eq!(report.state_of("B"), Some(DriverState::Failed));
    assert_eq!(report.state_of("C"), Some(DriverState::Loaded));
    assert_eq!(report.state_of("D"), Some(DriverState::Skipped));
    assert!(report.reason_of("B").unwrap().contains("try running as root"));
    assert!(report.reason_of("D").unwrap().contains("'B'"));

    let calls = log.lock().clone();
    assert!(!calls.contains(&"D"));
    let pos = |n| calls.iter().position(|c| *c == n).unwrap();
    assert!(pos("A") < pos("B"));
    assert!(pos("B") < pos("C"), "after hint honored: {calls:?}");
}

#[test]
fn missing_prerequisite_never_initializes() {
    let log = Log::default();
    let mut hal = Hal::bare(HalConfig::default()).unwrap();
    hal.register(scripted(&log, "orphan", &["missing"], &[], loaded))
        .unwrap();
    hal.register(scripted(&log, "other", &[], &["missing"], loaded))
        .unwrap();

    let report = hal.init().unwrap();
    assert_eq!(report.state_of("orphan"), Some(DriverState::Skipped));
    assert!(report.reason_of("orphan").unwrap().contains("missing"));
    assert_eq!(report.state_of("other"), Some(DriverState::Loaded));
    assert_eq!(*log.lock(), vec!["other"]);
}

#[test]
fn absent_hardware_is_skipped_not_failed() {
    let log = Log::default();
    let mut hal = Hal::bare(HalConfig::default()).unwrap();
    hal.register(scripted(&log, "family", &[], &[], absent)).unwrap();
    hal.register(scripted(&log, "bank", &["family"], &[], loaded))
        .unwrap();

    let report = hal.init().unwrap();
    assert!(!report.has_failures());
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(*log.lock(), vec!["family"]);
}

#[test]
fn cycle_aborts_before_any_init() {
    let log = Log::default();
    let mut hal = Hal::bare(HalConfig::default()).unwrap();
    hal.register(scripted(&log, "free", &[], &[], loaded)).unwrap();
    hal.register(scripted(&log, "x", &["y"], &[], loaded)).unwrap();
    hal.register(scripted(&log, "y", &["x"], &[], loaded)).unwrap();

    let err = hal.init().unwrap_err();
    assert!(matches!(err, HalError::Configuration(ref m) if m.contains("cycle")));
    assert!(log.lock().is_empty());
    assert!(hal.report().is_none());
}

#[test]
fn init_runs_once() {
    let log = Log::default();
    let mut hal = Hal::bare(HalConfig::default()).unwrap();
    hal.register(scripted(&log, "only", &[], &[], loaded)).unwrap();

    let first = hal.init().unwrap();
    let second = hal.init().unwrap();
    assert_eq!(first, second);
    assert_eq!(*log.lock(), vec!["only"]);

    let late = hal.register(scripted(&log, "late", &[], &[], loaded));
    assert!(matches!(late, Err(HalError::AlreadyInitialized)));
}

#[test]
fn duplicate_driver_names_rejected() {
    let log = Log::default();
    let mut hal = Hal::bare(HalConfig::default()).unwrap();
    hal.register(scripted(&log, "twin", &[], &[], loaded)).unwrap();
    let err = hal
        .register(scripted(&log, "twin", &[], &[], loaded))
        .unwrap_err();
    assert!(matches!(err, HalError::Configuration(_)));
    assert_eq!(hal.driver_names(), vec!["twin"]);
}
