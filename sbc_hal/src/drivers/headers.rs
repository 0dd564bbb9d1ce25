//! Physical headers of known boards.
//!
//! A known board is identified by its device-tree `model` and needs the
//! CPU family detected by the register driver. Headers listed in the
//! configuration work on any board and replace a known header of the same
//! name. Each position gets a pin alias `{header}_{index}` (1-based,
//! row-major), e.g. `P1_3`.

use super::allwinner::read_devicetree;
use crate::context::HalContext;
use crate::pin::Pin;
use sbc_common::hal::driver::{Driver, HalError};
use sbc_common::registry::RegistryError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Names of positions that carry no GPIO.
pub const POWER_PINS: &[&str] = &["GROUND", "V3_3", "V5", "V1_8", "DC_IN", "NC"];

struct Board {
    model: &'static str,
    family: &'static str,
    header: &'static str,
    rows: &'static [[&'static str; 2]],
}

static BOARDS: &[Board] = &[
    Board {
        model: "Orange Pi PC",
        family: "h3",
        header: "P1",
        rows: &[
            ["V3_3", "V5"],
            ["PA12", "V5"],
            ["PA11", "GROUND"],
            ["PA6", "PA13"],
            ["GROUND", "PA14"],
            ["PA1", "PD14"],
            ["PA0", "GROUND"],
            ["PA3", "PC4"],
            ["V3_3", "PC7"],
            ["PC0", "GROUND"],
            ["PC1", "PA2"],
            ["PC2", "PC3"],
            ["GROUND", "PA21"],
            ["PA19", "PA18"],
            ["PA7", "GROUND"],
            ["PA8", "PG8"],
            ["PA9", "GROUND"],
            ["PA10", "PG9"],
            ["PA20", "PG6"],
            ["GROUND", "PG7"],
        ],
    },
    Board {
        model: "Pine64",
        family: "a64",
        header: "P1",
        rows: &[
            ["V3_3", "V5"],
            ["PH3", "V5"],
            ["PH2", "GROUND"],
            ["PL10", "PB0"],
            ["GROUND", "PB1"],
            ["PC7", "PC8"],
            ["PC9", "GROUND"],
            ["PC12", "PC13"],
            ["V3_3", "PC14"],
            ["PC0", "GROUND"],
            ["PC1", "PC15"],
            ["PC2", "PC3"],
            ["GROUND", "PH7"],
            ["PL9", "PL8"],
            ["PH5", "GROUND"],
            ["PH6", "PC4"],
            ["PC5", "GROUND"],
            ["PC6", "PC16"],
            ["PD4", "PC10"],
            ["GROUND", "PC11"],
        ],
    },
];

/// Header driver.
#[derive(Debug, Default)]
pub struct BoardHeaders;

impl BoardHeaders {
    fn known_board(ctx: &HalContext) -> Option<(String, Vec<Vec<String>>)> {
        let family = ctx.family()?.name;
        let model = read_devicetree(ctx, "model")?;
        let board = BOARDS
            .iter()
            .find(|b| model.contains(b.model) && b.family == family)?;
        info!("board '{}'", board.model);
        let rows = board
            .rows
            .iter()
            .map(|row| row.iter().map(|p| p.to_string()).collect())
            .collect();
        Some((board.header.to_string(), rows))
    }
}

impl Driver<HalContext> for BoardHeaders {
    fn name(&self) -> &'static str {
        "board-headers"
    }

    fn after(&self) -> &[&'static str] {
        &["allwinner-gpio", "allwinner-gpio-pl"]
    }

    fn init(&mut self, ctx: &HalContext) -> Result<bool, HalError> {
        let mut headers: Vec<(String, Vec<Vec<String>>)> = ctx
            .config()
            .headers
            .iter()
            .map(|h| (h.name.clone(), h.rows.clone()))
            .collect();
        if let Some((name, rows)) = Self::known_board(ctx) {
            if headers.iter().any(|(n, _)| *n == name) {
                info!("configured header '{name}' replaces the board's");
            } else {
                headers.insert(0, (name, rows));
            }
        }
        if headers.is_empty() {
            return Ok(false);
        }

        let registries = ctx.registries();
        let mut names = HashSet::new();
        for (name, _) in &headers {
            if !names.insert(name.as_str()) {
                return Err(HalError::Configuration(format!(
                    "header '{name}' configured twice"
                )));
            }
            if registries.headers.by_name(name).is_some() {
                return Err(RegistryError::DuplicateName(name.clone()).into());
            }
        }

        for (name, rows) in headers {
            for pin in rows.iter().flatten() {
                if POWER_PINS.contains(&pin.as_str()) && !registries.pins.contains(pin) {
                    registries.pins.register(pin, Arc::new(Pin::power(pin)))?;
                }
            }

            let rows = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|p| registries.pins.canonical_name(&p).unwrap_or(p))
                        .collect()
                })
                .collect();
            let header = registries.headers.register(&name, rows)?;
            for (index, pin) in header.rows.iter().flatten().enumerate() {
                let alias = format!("{}_{}", header.name, index + 1);
                if registries.pins.contains(pin) {
                    registries.pins.register_alias(&alias, pin)?;
                } else {
                    warn!("{alias}: unknown pin '{pin}'");
                }
            }
            debug!("header {} with {} positions", header.name, header.len());
        }
        Ok(true)
    }
}

/// Factory function to create the header driver.
pub fn create_driver() -> Box<dyn Driver<HalContext>> {
    Box::new(BoardHeaders)
}
