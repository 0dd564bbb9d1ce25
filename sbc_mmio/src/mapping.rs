//! Physical memory mapping and typed overlays

use crate::error::{MmioError, MmioResult};
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::NonNull;
use tracing::{debug, info};

/// Marker for register layouts that may be overlaid on a mapping.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or transparent) and made only of
/// atomic words, so that concurrent access through shared references is
/// sound and every bit pattern is a valid value.
pub unsafe trait RegisterBlock: Sync {}

unsafe impl RegisterBlock for std::sync::atomic::AtomicU32 {}

/// A window of physical (or anonymous) memory mapped into the process.
///
/// Held for the process lifetime by the driver that created it; register
/// overlays borrow from it.
pub struct PhysicalMapping {
    /// Owner of the mapping; unmapped on drop
    _mmap: MmapMut,
    /// First byte of the requested window
    base: NonNull<u8>,
    /// Requested window length
    len: usize,
    /// Physical address of `base` (0 for anonymous mappings)
    phys_addr: u64,
    /// Where the memory came from, for diagnostics
    source: String,
}

// SAFETY: the mapping is only reachable through `RegisterBlock` overlays,
// which are made of atomics.
unsafe impl Send for PhysicalMapping {}
unsafe impl Sync for PhysicalMapping {}

impl PhysicalMapping {
    /// Map `len` bytes of physical memory starting at `phys_addr`.
    ///
    /// The device (normally `/dev/mem`) is opened read-write with `O_SYNC`
    /// and the page-aligned window covering the range is mapped.
    ///
    /// # Errors
    /// `PermissionDenied` when opening or mapping is refused, `NotFound`
    /// when the device is missing, `InvalidRange` for an empty range.
    pub fn open(device: &Path, phys_addr: u64, len: usize) -> MmioResult<Self> {
        if len == 0 {
            return Err(MmioError::InvalidRange {
                offset: 0,
                len,
                size: 0,
            });
        }

        let page = page_size() as u64;
        let aligned = phys_addr & !(page - 1);
        let in_page = (phys_addr - aligned) as usize;
        let map_len = round_up(in_page + len, page as usize);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(device)
            .map_err(|e| MmioError::from_io(e, device))?;

        let mut mmap = unsafe {
            MmapOptions::new()
                .offset(aligned)
                .len(map_len)
                .map_mut(&file)
                .map_err(|e| MmioError::from_io(e, device))?
        };

        let base = window_start(&mut mmap, in_page)?;
        info!(
            "Mapped {} bytes of {} at physical {:#x}",
            len,
            device.display(),
            phys_addr
        );

        Ok(Self {
            _mmap: mmap,
            base,
            len,
            phys_addr,
            source: device.display().to_string(),
        })
    }

    /// Zero-filled private mapping of `len` bytes.
    ///
    /// Used for simulation and tests; behaves like a physical mapping.
    pub fn anonymous(len: usize) -> MmioResult<Self> {
        if len == 0 {
            return Err(MmioError::InvalidRange {
                offset: 0,
                len,
                size: 0,
            });
        }
        let mut mmap = MmapOptions::new()
            .len(round_up(len, page_size()))
            .map_anon()?;
        let base = window_start(&mut mmap, 0)?;
        debug!("Created anonymous mapping of {} bytes", len);

        Ok(Self {
            _mmap: mmap,
            base,
            len,
            phys_addr: 0,
            source: "anonymous".to_string(),
        })
    }

    /// Typed view of `T` at byte `offset` into the window.
    ///
    /// # Errors
    /// `InvalidRange` if `T` does not fit, `AlignmentError` if the address
    /// is not aligned for `T`.
    pub fn overlay<T: RegisterBlock>(&self, offset: usize) -> MmioResult<&T> {
        let ptr = self.checked_ptr::<T>(offset, 1)?;
        // SAFETY: in bounds, aligned, and T is made of atomics.
        Ok(unsafe { &*ptr })
    }

    /// Typed view of `count` consecutive `T`s at byte `offset`.
    pub fn overlay_slice<T: RegisterBlock>(&self, offset: usize, count: usize) -> MmioResult<&[T]> {
        let ptr = self.checked_ptr::<T>(offset, count)?;
        // SAFETY: as for `overlay`, for `count` elements.
        Ok(unsafe { std::slice::from_raw_parts(ptr, count) })
    }

    fn checked_ptr<T>(&self, offset: usize, count: usize) -> MmioResult<*const T> {
        let bytes = std::mem::size_of::<T>()
            .checked_mul(count)
            .and_then(|b| b.checked_add(offset));
        match bytes {
            Some(end) if end <= self.len => {}
            _ => {
                return Err(MmioError::InvalidRange {
                    offset,
                    len: std::mem::size_of::<T>().saturating_mul(count),
                    size: self.len,
                });
            }
        }

        // SAFETY: offset is within the window checked above.
        let ptr = unsafe { self.base.as_ptr().add(offset) };
        let alignment = std::mem::align_of::<T>();
        if (ptr as usize) % alignment != 0 {
            return Err(MmioError::AlignmentError {
                address: ptr as usize,
                alignment,
            });
        }
        Ok(ptr as *const T)
    }

    /// Length of the requested window in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the window is empty (never true for a constructed mapping).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Physical address of the window start (0 for anonymous mappings).
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    /// Device the memory came from, or "anonymous".
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for PhysicalMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalMapping")
            .field("source", &self.source)
            .field("phys_addr", &format_args!("{:#x}", self.phys_addr))
            .field("len", &self.len)
            .finish()
    }
}

fn window_start(mmap: &mut MmapMut, in_page: usize) -> MmioResult<NonNull<u8>> {
    // SAFETY: in_page < page size <= mapping length.
    let ptr = unsafe { mmap.as_mut_ptr().add(in_page) };
    NonNull::new(ptr).ok_or(MmioError::AlignmentError {
        address: 0,
        alignment: 1,
    })
}

/// System page size.
pub fn page_size() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as usize } else { 4096 }
}

fn round_up(value: usize, to: usize) -> usize {
    value.div_ceil(to) * to
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn anonymous_mapping_is_zeroed_and_writable() {
        let mapping = PhysicalMapping::anonymous(64).unwrap();
        let word: &AtomicU32 = mapping.overlay(8).unwrap();
        assert_eq!(word.load(Ordering::Acquire), 0);
        word.store(0xDEAD_BEEF, Ordering::Release);

        let again: &AtomicU32 = mapping.overlay(8).unwrap();
        assert_eq!(again.load(Ordering::Acquire), 0xDEAD_BEEF);
        assert_eq!(mapping.source(), "anonymous");
        assert_eq!(mapping.phys_addr(), 0);
    }

    #[test]
    fn overlay_outside_window_fails() {
        let mapping = PhysicalMapping::anonymous(16).unwrap();
        assert!(matches!(
            mapping.overlay::<AtomicU32>(16),
            Err(MmioError::InvalidRange { .. })
        ));
        assert!(matches!(
            mapping.overlay_slice::<AtomicU32>(4, 4),
            Err(MmioError::InvalidRange { .. })
        ));
        assert_eq!(mapping.overlay_slice::<AtomicU32>(0, 4).unwrap().len(), 4);
    }

    #[test]
    fn misaligned_overlay_fails() {
        let mapping = PhysicalMapping::anonymous(16).unwrap();
        assert!(matches!(
            mapping.overlay::<AtomicU32>(2),
            Err(MmioError::AlignmentError { alignment: 4, .. })
        ));
    }

    #[test]
    fn empty_mapping_rejected() {
        assert!(matches!(
            PhysicalMapping::anonymous(0),
            Err(MmioError::InvalidRange { .. })
        ));
    }

    #[test]
    fn missing_device_is_not_found() {
        let err = PhysicalMapping::open(Path::new("/nonexistent/mem"), 0x01C2_0800, 0x400)
            .unwrap_err();
        assert!(matches!(err, MmioError::NotFound { .. }));
    }

    #[test]
    fn regular_file_can_back_a_mapping() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(2 * page_size() as u64).unwrap();

        let phys = page_size() as u64 + 0x800;
        let mapping = PhysicalMapping::open(file.path(), phys, 0x24).unwrap();
        let word: &AtomicU32 = mapping.overlay(0x10).unwrap();
        word.store(0x1234, Ordering::Release);
        assert_eq!(mapping.phys_addr(), phys);
        assert_eq!(mapping.len(), 0x24);
        assert_eq!(word.load(Ordering::Acquire), 0x1234);
    }

    #[test]
    fn round_up_to_page() {
        assert_eq!(round_up(1, 4096), 4096);
        assert_eq!(round_up(4096, 4096), 4096);
        assert_eq!(round_up(4097, 4096), 8192);
    }
}
