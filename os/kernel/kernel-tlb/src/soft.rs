use crate::entry::{EntryHi, TlbEntry};
use crate::victim::{RandomVictim, VictimPolicy};
use crate::{NUM_TLB, RANDOM_SLOTS, Tlb};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use log::trace;

/// In-memory TLB with the hardware's slot count and wiring.
///
/// Starts out fully invalidated, like the hardware after boot code has run.
#[derive(Debug, Clone)]
pub struct SoftTlb<P: VictimPolicy = RandomVictim> {
    entries: [TlbEntry; NUM_TLB],
    victim: P,
}

impl Default for SoftTlb<RandomVictim> {
    fn default() -> Self {
        Self::new(RandomVictim::default())
    }
}

impl<P: VictimPolicy> SoftTlb<P> {
    #[must_use]
    pub fn new(victim: P) -> Self {
        Self {
            entries: core::array::from_fn(TlbEntry::invalid),
            victim,
        }
    }

    /// All slots, in slot order.
    #[must_use]
    pub const fn entries(&self) -> &[TlbEntry; NUM_TLB] {
        &self.entries
    }

    /// Number of slots holding a valid mapping.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_valid()).count()
    }

    /// What a load or store to `va` would hit: the physical address and
    /// whether the mapping is writable.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<(PhysicalAddress, bool)> {
        let slot = self.probe(EntryHi::for_page(va))?;
        let lo = self.entries[slot].lo;
        lo.valid().then(|| {
            (
                PhysicalAddress::new(lo.frame().as_u32() | va.page_offset()),
                lo.dirty(),
            )
        })
    }
}

impl<P: VictimPolicy> Tlb for SoftTlb<P> {
    fn read(&self, slot: usize) -> TlbEntry {
        self.entries[slot]
    }

    fn write(&mut self, slot: usize, entry: TlbEntry) {
        self.entries[slot] = entry;
    }

    fn write_random(&mut self, entry: TlbEntry) -> usize {
        let slot = self.victim.choose(RANDOM_SLOTS);
        debug_assert!(RANDOM_SLOTS.contains(&slot), "victim {slot} outside random range");
        let evicted = core::mem::replace(&mut self.entries[slot], entry);
        if evicted.is_valid() {
            trace!("tlb: slot {slot} evicts {:?}", evicted.hi.page());
        }
        slot
    }
}
