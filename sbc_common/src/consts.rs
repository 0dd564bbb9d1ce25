//! Default locations and names.

/// Canonical service name used by the diagnostic binary.
pub const HAL_SERVICE_NAME: &str = "sbc_hal";

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sbc/hal.toml";

/// Root of the sysfs tree.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Root of the device node tree.
pub const DEFAULT_DEV_ROOT: &str = "/dev";

/// Root of procfs (device tree lives below `device-tree/`).
pub const DEFAULT_PROCFS_ROOT: &str = "/proc";

/// Physical memory device.
pub const DEFAULT_MEM_DEVICE: &str = "/dev/mem";

/// Number of pins covered by one register group.
pub const PINS_PER_GROUP: u32 = 32;
