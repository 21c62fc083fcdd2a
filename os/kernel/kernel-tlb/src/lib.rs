//! # Software-Managed TLB
//!
//! The r3000 has no page-table walker: every user translation lives in one of
//! [`NUM_TLB`] fully associative TLB slots, and the kernel refills them from
//! its fault handler. This crate models that hardware.
//!
//! * [`EntryHi`] / [`EntryLo`] are the typed halves of a slot.
//! * [`Tlb`] is the register-level interface (`tlb_read`, `tlb_write`,
//!   `tlb_random`, `tlb_probe`).
//! * [`SoftTlb`] implements it in memory with a pluggable [`VictimPolicy`],
//!   which is also what hosted tests run against.
//! * [`invalidate_all`] wipes every slot; [`shootdown`] / [`shootdown_all`]
//!   are the cross-CPU hooks, which a single-CPU kernel never expects to see.
//!
//! ```text
//! slot:   0 ‥ 7        8 ‥ 63
//!         wired        replaceable (tlb_random picks from here)
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod entry;
mod soft;
mod victim;

pub use entry::{EntryHi, EntryLo, TlbEntry};
pub use soft::SoftTlb;
pub use victim::{RandomVictim, RoundRobinVictim, VictimPolicy};

use core::ops::Range;
use kernel_memory_addresses::VirtualAddress;
use log::trace;

/// Number of TLB slots.
pub const NUM_TLB: usize = 64;

/// Slots `0..TLB_WIRED` are never chosen by [`Tlb::write_random`].
pub const TLB_WIRED: usize = 8;

/// Slots eligible for random replacement.
pub const RANDOM_SLOTS: Range<usize> = TLB_WIRED..NUM_TLB;

const _: () = {
    assert!(TLB_WIRED < NUM_TLB);
    // invalid patterns must stay inside KSEG0
    assert!(NUM_TLB <= 0x2_0000);
};

/// Register-level access to a TLB.
pub trait Tlb {
    /// Number of slots.
    fn slots(&self) -> usize {
        NUM_TLB
    }

    /// Read slot `slot`.
    fn read(&self, slot: usize) -> TlbEntry;

    /// Overwrite slot `slot`.
    fn write(&mut self, slot: usize, entry: TlbEntry);

    /// Overwrite a slot chosen by the hardware replacement policy, returning
    /// the slot that was written. Wired slots are never chosen.
    fn write_random(&mut self, entry: TlbEntry) -> usize;

    /// Slot whose `EntryHi` matches `hi`, if any.
    fn probe(&self, hi: EntryHi) -> Option<usize> {
        (0..self.slots()).find(|&slot| self.read(slot).hi.matches(hi))
    }
}

/// Write the per-slot invalid pattern into every slot.
///
/// Callers must have interrupts masked on this CPU; an interrupt handler that
/// refills the TLB halfway through would leave a stale entry behind.
pub fn invalidate_all<T: Tlb + ?Sized>(tlb: &mut T) {
    trace!("tlb: invalidating {} slots", tlb.slots());
    for slot in 0..tlb.slots() {
        tlb.write(slot, TlbEntry::invalid(slot));
    }
}

/// Invalidate one page on every CPU.
///
/// # Panics
/// Always. Only one CPU ever holds translations for an address space.
#[track_caller]
pub fn shootdown(page: VirtualAddress) -> ! {
    panic!("tried to do tlb shootdown for {page:?}");
}

/// Invalidate everything on every CPU.
///
/// # Panics
/// Always, see [`shootdown`].
#[track_caller]
pub fn shootdown_all() -> ! {
    panic!("tried to do tlb shootdown?!");
}
