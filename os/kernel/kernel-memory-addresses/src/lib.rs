//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for the 32-bit addresses handled by the memory
//! layer of a TLB-refilled (MIPS r3000 style) machine.
//!
//! ## Overview
//!
//! The machine has a single page size of 4 KiB and no hardware page-table
//! walker; every translation the CPU performs comes out of a software-managed
//! TLB. Physical and virtual addresses are both plain 32-bit values, which
//! makes it very easy to mix them up. This crate keeps them apart at the type
//! level while remaining zero-cost wrappers around `u32`:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | An address as seen by a process (translated through the TLB). |
//! | [`PhysicalAddress`] | A RAM address, as stored in a TLB `EntryLo` or in the coremap. |
//!
//! ## Page Arithmetic
//!
//! ```text
//! | 31 ‒ 12                 | 11 ‒ 0      |
//! | page / frame number     | page offset |
//! ```
//!
//! [`PAGE_FRAME`] masks an address down to its page; [`align_down`],
//! [`align_up`] and [`pages_for`] cover the rounding the loader and the
//! allocator need.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0040_1234);
//! assert_eq!(va.page_base(), VirtualAddress::new(0x0040_1000));
//! assert_eq!(va.page_offset(), 0x234);
//! assert_eq!(va.page_number(), 0x401);
//!
//! let pa = PhysicalAddress::from_frame_number(0x20);
//! assert_eq!(pa.as_u32(), 0x0002_0000);
//! assert!(pa.is_page_aligned());
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`,
//!   and `Hash`.
//! - All arithmetic is `const fn`; additions that may leave the 32-bit range
//!   have `checked_*` variants and the plain operators panic on overflow in
//!   debug builds.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod physical_address;
mod virtual_address;

pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::VirtualAddress;

/// Size of a page (and of a physical frame) in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// `log2(PAGE_SIZE)`; number of offset bits in an address.
pub const PAGE_SHIFT: u32 = 12;

/// Mask selecting the page-number bits of an address.
pub const PAGE_FRAME: u32 = !(PAGE_SIZE - 1);

const _: () = assert!(1 << PAGE_SHIFT == PAGE_SIZE);

/// Align `x` down to the nearest multiple of `a`.
///
/// `a` must be a non-zero power of two.
///
/// ```rust
/// # use kernel_memory_addresses::align_down;
/// assert_eq!(align_down(0,    4096), 0);
/// assert_eq!(align_down(4095, 4096), 0);
/// assert_eq!(align_down(8191, 4096), 4096);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_down(x: u32, a: u32) -> u32 {
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a`.
///
/// `a` must be a non-zero power of two. Returns `None` if the rounded value
/// does not fit into 32 bits.
///
/// ```rust
/// # use kernel_memory_addresses::align_up;
/// assert_eq!(align_up(0,    4096), Some(0));
/// assert_eq!(align_up(1,    4096), Some(4096));
/// assert_eq!(align_up(4097, 4096), Some(8192));
/// assert_eq!(align_up(u32::MAX, 4096), None);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(x: u32, a: u32) -> Option<u32> {
    match x.checked_add(a - 1) {
        Some(v) => Some(v & !(a - 1)),
        None => None,
    }
}

/// Number of whole pages needed to hold `bytes` bytes.
///
/// ```rust
/// # use kernel_memory_addresses::pages_for;
/// assert_eq!(pages_for(0), 0);
/// assert_eq!(pages_for(1), 1);
/// assert_eq!(pages_for(4096), 1);
/// assert_eq!(pages_for(4097), 2);
/// ```
#[inline(always)]
#[must_use]
pub const fn pages_for(bytes: u32) -> u32 {
    bytes.div_ceil(PAGE_SIZE)
}

/// Number of bytes covered by `npages` pages, or `None` on overflow.
#[inline(always)]
#[must_use]
pub const fn pages_to_bytes(npages: u32) -> Option<u32> {
    npages.checked_mul(PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_mask_matches_page_size() {
        assert_eq!(PAGE_FRAME, 0xFFFF_F000);
        assert_eq!(align_down(0xDEAD_BEEF, PAGE_SIZE), 0xDEAD_B000);
    }

    #[test]
    fn align_up_saturates_to_none_at_the_top() {
        assert_eq!(align_up(0xFFFF_F000, PAGE_SIZE), Some(0xFFFF_F000));
        assert_eq!(align_up(0xFFFF_F001, PAGE_SIZE), None);
    }

    #[test]
    fn pages_to_bytes_detects_overflow() {
        assert_eq!(pages_to_bytes(12), Some(12 * 4096));
        assert_eq!(pages_to_bytes(0x10_0000), None);
    }

    #[test]
    fn virtual_and_physical_do_not_mix_but_share_page_math() {
        let va = VirtualAddress::new(0x7FFF_EFFF);
        let pa = PhysicalAddress::new(0x0003_4FFF);
        assert_eq!(va.page_offset(), pa.page_offset());
        assert_eq!(va.page_base().as_u32(), 0x7FFF_E000);
        assert_eq!(pa.frame_number(), 0x34);
    }
}
