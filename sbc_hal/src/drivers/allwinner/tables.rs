//! Pin tables of the supported Allwinner SoCs.
//!
//! Alternate function names follow the datasheets with the bus controllers
//! renamed to their Linux names (`TWIn` becomes `I2Cn`, `SPIn_CS` becomes
//! `SPIn_CS0`). Slot `i` of an entry is function code `i + 2`.

use super::{Bank, FamilyTable};

const PIO_BASE: u64 = 0x01C2_0800;
const R_PIO_BASE: u64 = 0x01F0_2C00;

/// Port L index; its pins are numbered from 352.
const PORT_L: usize = 11;

type Alternates = (&'static str, [&'static str; 5]);

const H3_ALTERNATES: &[Alternates] = &[
    ("PA0", ["UART2_TX", "JTAG_MS", "", "", "PA_EINT0"]),
    ("PA1", ["UART2_RX", "JTAG_CK", "", "", "PA_EINT1"]),
    ("PA2", ["UART2_RTS", "JTAG_DO", "", "", "PA_EINT2"]),
    ("PA3", ["UART2_CTS", "JTAG_DI", "", "", "PA_EINT3"]),
    ("PA4", ["UART0_TX", "", "", "", "PA_EINT4"]),
    ("PA5", ["UART0_RX", "PWM0", "", "", "PA_EINT5"]),
    ("PA6", ["SIM_PWREN", "PWM1", "", "", "PA_EINT6"]),
    ("PA11", ["I2C0_SCL", "DI_TX", "", "", "PA_EINT11"]),
    ("PA12", ["I2C0_SDA", "DI_RX", "", "", "PA_EINT12"]),
    ("PA13", ["SPI1_CS0", "UART3_TX", "", "", "PA_EINT13"]),
    ("PA14", ["SPI1_CLK", "UART3_RX", "", "", "PA_EINT14"]),
    ("PA15", ["SPI1_MOSI", "UART3_RTS", "", "", "PA_EINT15"]),
    ("PA16", ["SPI1_MISO", "UART3_CTS", "", "", "PA_EINT16"]),
    ("PA18", ["PCM0_SYNC", "I2C1_SCL", "", "", "PA_EINT18"]),
    ("PA19", ["PCM0_CLK", "I2C1_SDA", "", "", "PA_EINT19"]),
    ("PC0", ["NAND_WE", "SPI0_MOSI", "", "", ""]),
    ("PC1", ["NAND_ALE", "SPI0_MISO", "", "", ""]),
    ("PC2", ["NAND_CLE", "SPI0_CLK", "", "", ""]),
    ("PC3", ["NAND_CE1", "SPI0_CS0", "", "", ""]),
    ("PE12", ["CSI_SCK", "I2C2_SCL", "", "", ""]),
    ("PE13", ["CSI_SDA", "I2C2_SDA", "", "", ""]),
    ("PG6", ["UART1_TX", "", "", "", "PG_EINT6"]),
    ("PG7", ["UART1_RX", "", "", "", "PG_EINT7"]),
];

const H3_PL_ALTERNATES: &[Alternates] = &[
    ("PL0", ["S_I2C_SCL", "", "", "", "S_PL_EINT0"]),
    ("PL1", ["S_I2C_SDA", "", "", "", "S_PL_EINT1"]),
    ("PL2", ["S_UART_TX", "", "", "", "S_PL_EINT2"]),
    ("PL3", ["S_UART_RX", "", "", "", "S_PL_EINT3"]),
];

const A64_ALTERNATES: &[Alternates] = &[
    ("PB0", ["UART2_TX", "", "JTAG_MS0", "", "PB_EINT0"]),
    ("PB1", ["UART2_RX", "", "JTAG_CK0", "SIM_PWREN", "PB_EINT1"]),
    ("PC0", ["NAND_WE", "", "SPI0_MOSI", "", ""]),
    ("PC1", ["NAND_ALE", "MMC2_DS", "SPI0_MISO", "", ""]),
    ("PC2", ["NAND_CLE", "", "SPI0_CLK", "", ""]),
    ("PC3", ["NAND_CE1", "", "SPI0_CS0", "", ""]),
    ("PD0", ["LCD_D2", "UART3_TX", "SPI1_CS0", "CCIR_CLK", ""]),
    ("PD1", ["LCD_D3", "UART3_RX", "SPI1_CLK", "CCIR_DE", ""]),
    ("PD2", ["LCD_D4", "UART4_TX", "SPI1_MOSI", "CCIR_HSYNC", ""]),
    ("PD3", ["LCD_D5", "UART4_RX", "SPI1_MISO", "CCIR_VSYNC", ""]),
    ("PH0", ["I2C0_SCL", "", "", "", "PH_EINT0"]),
    ("PH1", ["I2C0_SDA", "", "", "", "PH_EINT1"]),
    ("PH2", ["I2C1_SCL", "", "", "", "PH_EINT2"]),
    ("PH3", ["I2C1_SDA", "", "", "", "PH_EINT3"]),
];

const A64_PL_ALTERNATES: &[Alternates] = &[
    ("PL0", ["S_RSB_SCK", "S_I2C_SCL", "", "", "S_PL_EINT0"]),
    ("PL1", ["S_RSB_SDA", "S_I2C_SDA", "", "", "S_PL_EINT1"]),
    ("PL2", ["S_UART_TX", "", "", "", "S_PL_EINT2"]),
    ("PL3", ["S_UART_RX", "", "", "", "S_PL_EINT3"]),
];

/// Allwinner H3 and H2+.
pub static H3: FamilyTable = FamilyTable {
    name: "h3",
    compatible: &["allwinner,sun8i-h3", "allwinner,sun8i-h2-plus"],
    main: Bank {
        base: PIO_BASE,
        first_group: 0,
        ports: &[(0, 22), (2, 19), (3, 18), (4, 16), (5, 7), (6, 14)],
        alternates: H3_ALTERNATES,
    },
    pl: Some(Bank {
        base: R_PIO_BASE,
        first_group: PORT_L,
        ports: &[(PORT_L, 12)],
        alternates: H3_PL_ALTERNATES,
    }),
    missing: &[],
};

/// Allwinner A64.
pub static A64: FamilyTable = FamilyTable {
    name: "a64",
    compatible: &["allwinner,sun50i-a64"],
    main: Bank {
        base: PIO_BASE,
        first_group: 0,
        ports: &[
            (1, 10),
            (2, 17),
            (3, 25),
            (4, 18),
            (5, 7),
            (6, 14),
            (7, 12),
        ],
        alternates: A64_ALTERNATES,
    },
    pl: Some(Bank {
        base: R_PIO_BASE,
        first_group: PORT_L,
        ports: &[(PORT_L, 13)],
        alternates: A64_PL_ALTERNATES,
    }),
    missing: &[],
};

/// Every supported family, probed in order.
pub static FAMILIES: &[&FamilyTable] = &[&H3, &A64];
