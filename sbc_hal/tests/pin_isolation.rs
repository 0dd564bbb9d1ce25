//! Pins sharing one register group never disturb each other.

use proptest::prelude::*;
use sbc_common::hal::types::{Direction, Function, Level, Pull};
use sbc_hal::{Pin, PinSpec};
use sbc_mmio::MappedGroups;
use std::sync::Arc;
use std::thread;

fn pin(groups: &Arc<MappedGroups>, offset: u32) -> Arc<Pin> {
    let spec = PinSpec {
        name: format!("PA{offset}"),
        group: 0,
        offset,
        alternates: ["UART_TX", "UART_RX", "", "", "PA_EINT"],
    };
    let pin = Arc::new(Pin::registers(&spec, 0, true, Pull::Float, None));
    pin.attach(Arc::clone(groups));
    pin
}

#[derive(Debug, Clone)]
enum Op {
    Input(Pull),
    Output(Level),
    Alternate(&'static str),
    Disable,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop_oneof![Just(Pull::Float), Just(Pull::Up), Just(Pull::Down)].prop_map(Op::Input),
        any::<bool>().prop_map(|b| Op::Output(Level::from(b))),
        prop_oneof![Just("UART_TX"), Just("UART_RX"), Just("PA_EINT")].prop_map(Op::Alternate),
        Just(Op::Disable),
    ]
}

fn apply(pin: &Pin, op: &Op) -> Function {
    match op {
        Op::Input(pull) => {
            pin.set_direction(Direction::In(*pull)).unwrap();
            Function::In {
                pull: *pull,
                edge: Default::default(),
            }
        }
        Op::Output(level) => {
            pin.set_direction(Direction::Out(*level)).unwrap();
            Function::Out { level: *level }
        }
        Op::Alternate(role) => {
            pin.set_alternate(role).unwrap();
            let index = match *role {
                "UART_TX" => 1,
                "UART_RX" => 2,
                _ => 5,
            };
            Function::Alternate { index, role: *role }
        }
        Op::Disable => {
            pin.disable().unwrap();
            Function::Disabled
        }
    }
}

proptest! {
    #[test]
    fn each_pin_keeps_its_last_function(
        ops in prop::collection::vec((0u32..32, op()), 1..64)
    ) {
        let groups = Arc::new(MappedGroups::anonymous(1).unwrap());
        let pins: Vec<Arc<Pin>> = (0..32).map(|o| pin(&groups, o)).collect();
        let mut expected: Vec<Option<Function>> = vec![None; 32];

        for (offset, op) in &ops {
            expected[*offset as usize] = Some(apply(&pins[*offset as usize], op));
        }
        for (offset, want) in expected.iter().enumerate() {
            if let Some(want) = want {
                prop_assert_eq!(&pins[offset].function(), want);
            }
        }
    }
}

#[test]
fn concurrent_direction_changes_on_siblings() {
    let groups = Arc::new(MappedGroups::anonymous(1).unwrap());
    let left = pin(&groups, 4);
    let right = pin(&groups, 5);

    let handles: Vec<_> = [
        (Arc::clone(&left), Level::High),
        (Arc::clone(&right), Level::Low),
    ]
    .into_iter()
    .map(|(pin, level)| {
        thread::spawn(move || {
            for i in 0..5_000 {
                if i % 2 == 0 {
                    pin.set_direction(Direction::Out(level)).unwrap();
                } else {
                    pin.set_direction(Direction::In(Pull::Up)).unwrap();
                }
            }
            pin.set_direction(Direction::Out(level)).unwrap();
        })
    })
    .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(left.function(), Function::Out { level: Level::High });
    assert_eq!(right.function(), Function::Out { level: Level::Low });
    assert_eq!(left.pull(), Pull::Up);
    assert_eq!(right.pull(), Pull::Up);
}
