use super::{detect_family, map_bank, register_bank};
use crate::context::HalContext;
use sbc_common::hal::driver::{Driver, HalError};
use tracing::info;

/// Main PIO bank of an Allwinner SoC.
///
/// Pins are published before the registers are mapped, so a denied
/// mapping leaves them registered for read-only sysfs queries while the
/// driver itself is reported failed.
#[derive(Debug, Default)]
pub struct AllwinnerGpio;

impl AllwinnerGpio {
    /// Create the driver.
    pub fn new() -> Self {
        Self
    }
}

impl Driver<HalContext> for AllwinnerGpio {
    fn name(&self) -> &'static str {
        "allwinner-gpio"
    }

    fn after(&self) -> &[&'static str] {
        &["sysfs-gpio"]
    }

    fn init(&mut self, ctx: &HalContext) -> Result<bool, HalError> {
        let Some(family) = detect_family(ctx)? else {
            return Ok(false);
        };
        ctx.set_family(family);
        info!("Allwinner {} detected", family.name);

        let pins = register_bank(ctx, family, &family.main)?;
        map_bank(ctx, &family.main, &pins)?;
        Ok(true)
    }
}

/// Always-on R_PIO bank (port L).
#[derive(Debug, Default)]
pub struct AllwinnerGpioPl;

impl AllwinnerGpioPl {
    /// Create the driver.
    pub fn new() -> Self {
        Self
    }
}

impl Driver<HalContext> for AllwinnerGpioPl {
    fn name(&self) -> &'static str {
        "allwinner-gpio-pl"
    }

    fn prerequisites(&self) -> &[&'static str] {
        &["allwinner-gpio"]
    }

    fn init(&mut self, ctx: &HalContext) -> Result<bool, HalError> {
        let Some(family) = ctx.family() else {
            return Ok(false);
        };
        let Some(bank) = &family.pl else {
            return Ok(false);
        };
        let pins = register_bank(ctx, family, bank)?;
        map_bank(ctx, bank, &pins)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbc_common::config::HalConfig;
    use sbc_common::hal::types::{Direction, Level};
    use std::fs::File;
    use std::path::Path;
    use tempfile::TempDir;

    /// Sparse stand-in for `/dev/mem` covering both PIO banks.
    fn fake_mem(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("mem");
        File::create(&path).unwrap().set_len(0x0200_0000).unwrap();
        path
    }

    fn h3_context(tmp: &TempDir) -> HalContext {
        let mut config = HalConfig::default();
        config.paths.sysfs_root = tmp.path().join("sys");
        config.paths.procfs_root = tmp.path().join("proc");
        config.paths.mem_device = fake_mem(tmp.path());
        config.drivers.family = Some("h3".to_string());
        HalContext::new(config)
    }

    #[test]
    fn wrong_hardware_is_not_used() {
        let tmp = TempDir::new().unwrap();
        let mut config = HalConfig::default();
        config.paths.sysfs_root = tmp.path().join("sys");
        config.paths.procfs_root = tmp.path().join("proc");
        config.paths.mem_device = tmp.path().join("no-such-mem");
        let ctx = HalContext::new(config);

        assert!(!AllwinnerGpio::new().init(&ctx).unwrap());
        assert!(ctx.registries().pins.is_empty());
        assert!(!AllwinnerGpioPl::new().init(&ctx).unwrap());
    }

    #[test]
    fn maps_main_bank() {
        let tmp = TempDir::new().unwrap();
        let ctx = h3_context(&tmp);
        assert!(AllwinnerGpio::new().init(&ctx).unwrap());
        assert_eq!(ctx.family().unwrap().name, "h3");

        let pin = ctx.registries().pin("GPIO12").unwrap();
        assert_eq!(pin.name(), "PA12");
        assert!(pin.is_mapped());
        pin.set_direction(Direction::Out(Level::High)).unwrap();
        assert_eq!(pin.read().unwrap(), Level::High);

        let sibling = ctx.registries().pin("PA11").unwrap();
        sibling.set_direction(Direction::Out(Level::Low)).unwrap();
        assert_eq!(pin.read().unwrap(), Level::High);
        assert_eq!(sibling.read().unwrap(), Level::Low);
    }

    #[test]
    fn maps_pl_bank() {
        let tmp = TempDir::new().unwrap();
        let ctx = h3_context(&tmp);
        AllwinnerGpio::new().init(&ctx).unwrap();
        assert!(AllwinnerGpioPl::new().init(&ctx).unwrap());

        let pin = ctx.registries().pin("GPIO352").unwrap();
        assert_eq!(pin.name(), "PL0");
        assert!(pin.is_mapped());
        pin.set_alternate("S_I2C_SCL").unwrap();
        assert_eq!(pin.function().to_string(), "S_I2C_SCL");
    }

    #[test]
    fn failed_mapping_keeps_pins() {
        let tmp = TempDir::new().unwrap();
        let mut config = HalConfig::default();
        config.paths.sysfs_root = tmp.path().join("sys");
        config.paths.mem_device = tmp.path().join("no-such-mem");
        config.drivers.family = Some("a64".to_string());
        let ctx = HalContext::new(config);

        assert!(AllwinnerGpio::new().init(&ctx).is_err());
        let pin = ctx.registries().pin("PH2").unwrap();
        assert!(!pin.is_mapped());
        assert!(matches!(
            pin.set_direction(Direction::Out(Level::High)),
            Err(HalError::PermissionDenied(_))
        ));
    }

    #[test]
    fn denied_mapping_is_permission_error() {
        use std::os::unix::fs::PermissionsExt;

        // root ignores file modes
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let ctx = h3_context(&tmp);
        let mem = &ctx.paths().mem_device;
        std::fs::set_permissions(mem, std::fs::Permissions::from_mode(0o000)).unwrap();

        let err = AllwinnerGpio::new().init(&ctx).unwrap_err();
        assert!(matches!(err, HalError::PermissionDenied(_)));
        assert!(err.to_string().contains("try running as root"));
    }
}
