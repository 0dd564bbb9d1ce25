//! GPIO register group layout and masked bit-field access.
//!
//! ## Layout
//!
//! One group covers up to 32 pins and is 0x24 bytes:
//!
//! | Offset | Words | Field width | Content |
//! |--------|-------|-------------|---------|
//! | 0x00 | `cfg[0..4]` | 4 bits/pin | function select |
//! | 0x10 | `data` | 1 bit/pin | level |
//! | 0x14 | `drv[0..2]` | 2 bits/pin | drive strength |
//! | 0x1C | `pull[0..2]` | 2 bits/pin | pull resistor |
//!
//! `function = (cfg[p / 8] >> 4*(p % 8)) & 0xF`,
//! `level = (data >> p) & 1`, `pull = (pull[p / 16] >> 2*(p % 16)) & 0x3`.
//!
//! ## Concurrency
//!
//! Groups are shared by every pin they cover and are never locked. Each
//! field update is two atomic operations on one word: OR the field mask
//! in (all-ones, the disabled sentinel), then AND out the bits that must
//! be zero. A field therefore only ever holds its previous value, the
//! sentinel, or its new value, and sibling fields in the same word are
//! never touched.

use crate::error::{MmioError, MmioResult};
use crate::mapping::{PhysicalMapping, RegisterBlock};
use static_assertions::const_assert_eq;
use std::sync::atomic::{AtomicU32, Ordering};

/// Function field value meaning "disconnected". Also the transient value
/// every function write passes through.
pub const FUNCTION_SENTINEL: u32 = 0xF;

/// Size in bytes of one register group.
pub const GROUP_SIZE: usize = 0x24;

/// Hardware register block for up to 32 pins.
#[repr(C)]
pub struct RegisterGroup {
    cfg: [AtomicU32; 4],
    data: AtomicU32,
    drv: [AtomicU32; 2],
    pull: [AtomicU32; 2],
}

const_assert_eq!(std::mem::size_of::<RegisterGroup>(), GROUP_SIZE);

// SAFETY: repr(C), atomics only.
unsafe impl RegisterBlock for RegisterGroup {}

impl RegisterGroup {
    /// 4-bit function code of pin `offset` (0..32).
    #[inline]
    pub fn function(&self, offset: u32) -> u32 {
        let (word, shift) = cfg_slot(offset);
        read_field(&self.cfg[word], 0xF, shift)
    }

    /// Select function `code` for pin `offset`.
    #[inline]
    pub fn set_function(&self, offset: u32, code: u32) {
        let (word, shift) = cfg_slot(offset);
        masked_write(&self.cfg[word], 0xF, shift, code);
    }

    /// Level bit of pin `offset`.
    #[inline]
    pub fn level(&self, offset: u32) -> bool {
        (self.data.load(Ordering::Acquire) >> (offset & 31)) & 1 == 1
    }

    /// Set or clear the level bit of pin `offset`.
    #[inline]
    pub fn set_level(&self, offset: u32, high: bool) {
        let bit = 1u32 << (offset & 31);
        if high {
            self.data.fetch_or(bit, Ordering::AcqRel);
        } else {
            self.data.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    /// 2-bit pull code of pin `offset`.
    #[inline]
    pub fn pull(&self, offset: u32) -> u32 {
        let (word, shift) = two_bit_slot(offset);
        read_field(&self.pull[word], 0x3, shift)
    }

    /// Write pull code for pin `offset`.
    #[inline]
    pub fn set_pull(&self, offset: u32, code: u32) {
        let (word, shift) = two_bit_slot(offset);
        masked_write(&self.pull[word], 0x3, shift, code);
    }

    /// 2-bit drive strength code of pin `offset`.
    #[inline]
    pub fn drive(&self, offset: u32) -> u32 {
        let (word, shift) = two_bit_slot(offset);
        read_field(&self.drv[word], 0x3, shift)
    }

    /// Write drive strength code for pin `offset`.
    #[inline]
    pub fn set_drive(&self, offset: u32, code: u32) {
        let (word, shift) = two_bit_slot(offset);
        masked_write(&self.drv[word], 0x3, shift, code);
    }

    /// Raw config word `index` (0..4).
    pub fn cfg_word(&self, index: usize) -> u32 {
        self.cfg[index & 3].load(Ordering::Acquire)
    }

    /// Raw data word.
    pub fn data_word(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for RegisterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let words = |w: &[AtomicU32]| -> Vec<String> {
            w.iter()
                .map(|v| format!("{:#010x}", v.load(Ordering::Relaxed)))
                .collect()
        };
        f.debug_struct("RegisterGroup")
            .field("cfg", &words(&self.cfg[..]))
            .field("data", &format_args!("{:#010x}", self.data_word()))
            .field("drv", &words(&self.drv[..]))
            .field("pull", &words(&self.pull[..]))
            .finish()
    }
}

#[inline]
fn cfg_slot(offset: u32) -> (usize, u32) {
    let offset = offset & 31;
    ((offset / 8) as usize, 4 * (offset % 8))
}

#[inline]
fn two_bit_slot(offset: u32) -> (usize, u32) {
    let offset = offset & 31;
    ((offset / 16) as usize, 2 * (offset % 16))
}

#[inline]
fn read_field(word: &AtomicU32, field: u32, shift: u32) -> u32 {
    (word.load(Ordering::Acquire) >> shift) & field
}

/// Two-step update of one bit-field: force the field to all-ones, then
/// clear exactly the bits that are zero in `code`.
#[inline]
fn masked_write(word: &AtomicU32, field: u32, shift: u32, code: u32) {
    let mask = field << shift;
    let zeros = ((code & field) << shift) ^ mask;
    word.fetch_or(mask, Ordering::AcqRel);
    word.fetch_and(!zeros, Ordering::AcqRel);
}

/// A mapping holding `count` register groups at a fixed stride.
#[derive(Debug)]
pub struct MappedGroups {
    mapping: PhysicalMapping,
    first: usize,
    stride: usize,
    count: usize,
}

impl MappedGroups {
    /// Wrap `mapping`, with group 0 at byte `first` and `count` groups
    /// `stride` bytes apart. Every group is validated up front.
    pub fn new(
        mapping: PhysicalMapping,
        first: usize,
        stride: usize,
        count: usize,
    ) -> MmioResult<Self> {
        if stride < GROUP_SIZE {
            return Err(MmioError::InvalidRange {
                offset: first,
                len: stride,
                size: GROUP_SIZE,
            });
        }
        for index in 0..count {
            mapping.overlay::<RegisterGroup>(first + index * stride)?;
        }
        Ok(Self {
            mapping,
            first,
            stride,
            count,
        })
    }

    /// Anonymous, zeroed groups for simulation and tests.
    pub fn anonymous(count: usize) -> MmioResult<Self> {
        let mapping = PhysicalMapping::anonymous(count.max(1) * GROUP_SIZE)?;
        Self::new(mapping, 0, GROUP_SIZE, count)
    }

    /// Register group `index`, if mapped.
    pub fn group(&self, index: usize) -> Option<&RegisterGroup> {
        if index >= self.count {
            return None;
        }
        self.mapping
            .overlay::<RegisterGroup>(self.first + index * self.stride)
            .ok()
    }

    /// Number of groups.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The underlying mapping.
    pub fn mapping(&self) -> &PhysicalMapping {
        &self.mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_field_layout() {
        let groups = MappedGroups::anonymous(1).unwrap();
        let group = groups.group(0).unwrap();

        group.set_function(9, 0x3);
        assert_eq!(group.cfg_word(1), 0x3 << 4);
        assert_eq!(group.function(9), 0x3);

        group.set_function(15, 0x1);
        assert_eq!(group.cfg_word(1), (0x1 << 28) | (0x3 << 4));
        assert_eq!(group.function(9), 0x3);
    }

    #[test]
    fn function_write_replaces_previous_code() {
        let groups = MappedGroups::anonymous(1).unwrap();
        let group = groups.group(0).unwrap();
        group.set_function(0, 0x6);
        group.set_function(0, 0x1);
        assert_eq!(group.function(0), 0x1);
        group.set_function(0, 0x0);
        assert_eq!(group.cfg_word(0), 0);
    }

    #[test]
    fn pull_and_drive_fields() {
        let groups = MappedGroups::anonymous(1).unwrap();
        let group = groups.group(0).unwrap();
        group.set_pull(17, 2);
        group.set_drive(17, 3);
        assert_eq!(group.pull(17), 2);
        assert_eq!(group.drive(17), 3);
        assert_eq!(group.pull(16), 0);
        assert_eq!(group.pull(18), 0);
        group.set_pull(17, 1);
        assert_eq!(group.pull(17), 1);
    }

    #[test]
    fn level_bits() {
        let groups = MappedGroups::anonymous(1).unwrap();
        let group = groups.group(0).unwrap();
        group.set_level(31, true);
        group.set_level(0, true);
        assert_eq!(group.data_word(), 0x8000_0001);
        group.set_level(31, false);
        assert!(!group.level(31));
        assert!(group.level(0));
    }

    #[test]
    fn group_bounds() {
        let groups = MappedGroups::anonymous(3).unwrap();
        assert!(groups.group(2).is_some());
        assert!(groups.group(3).is_none());
        assert_eq!(groups.count(), 3);
    }

    #[test]
    fn groups_do_not_overlap() {
        let groups = MappedGroups::anonymous(2).unwrap();
        groups.group(0).unwrap().set_level(4, true);
        assert_eq!(groups.group(1).unwrap().data_word(), 0);
    }

    #[test]
    fn stride_smaller_than_group_rejected() {
        let mapping = PhysicalMapping::anonymous(0x100).unwrap();
        assert!(matches!(
            MappedGroups::new(mapping, 0, 0x10, 2),
            Err(MmioError::InvalidRange { .. })
        ));
    }

    #[test]
    fn groups_past_mapping_end_rejected() {
        let mapping = PhysicalMapping::anonymous(0x30).unwrap();
        assert!(matches!(
            MappedGroups::new(mapping, 0, GROUP_SIZE, 2),
            Err(MmioError::InvalidRange { .. })
        ));
    }
}
