use bitfield_struct::bitfield;
use kernel_info::memory::MIPS_KSEG0;
use kernel_memory_addresses::{PAGE_SHIFT, PhysicalAddress, VirtualAddress};

/// `EntryHi`: the tag half of a TLB slot.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct EntryHi {
    /// Bits 0–5: Reserved (must be 0).
    #[bits(6, default = 0)]
    _reserved_0_5: u8,

    /// Bits 6–11: Address space identifier.
    ///
    /// Unused: every activation flushes the whole TLB instead.
    #[bits(6)]
    pub asid: u8,

    /// Bits 12–31: Virtual page number.
    #[bits(20)]
    pub vpn: u32,
}

impl EntryHi {
    /// Tag for the page containing `va`.
    #[inline]
    #[must_use]
    pub const fn for_page(va: VirtualAddress) -> Self {
        Self::new().with_vpn(va.page_number())
    }

    /// Tag that parks slot `slot` on its own KSEG0 page.
    ///
    /// KSEG0 is never translated through the TLB, so the slot can never hit
    /// and no two slots share a tag.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn invalid(slot: usize) -> Self {
        Self::from_bits(MIPS_KSEG0 + ((slot as u32) << PAGE_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn page(&self) -> VirtualAddress {
        VirtualAddress::from_page_number(self.vpn())
    }

    /// Whether a lookup for `other` would hit this tag.
    #[inline]
    #[must_use]
    pub const fn matches(&self, other: Self) -> bool {
        self.vpn() == other.vpn()
    }
}

/// `EntryLo`: the data half of a TLB slot.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct EntryLo {
    /// Bits 0–7: Reserved (must be 0).
    #[bits(8, default = 0)]
    _reserved_0_7: u8,

    /// Bit 8: Global: ignore the ASID on lookup.
    pub global: bool,

    /// Bit 9: Valid: a hit on an invalid entry raises a TLB miss.
    pub valid: bool,

    /// Bit 10: Dirty: the page is writable. A store through a clean entry
    /// raises a read-only fault.
    pub dirty: bool,

    /// Bit 11: No-cache.
    pub nocache: bool,

    /// Bits 12–31: Physical frame number.
    #[bits(20)]
    pub pfn: u32,
}

impl EntryLo {
    /// A valid mapping onto the frame containing `pa`.
    #[inline]
    #[must_use]
    pub const fn mapping(pa: PhysicalAddress, writable: bool) -> Self {
        Self::new()
            .with_pfn(pa.frame_number())
            .with_valid(true)
            .with_dirty(writable)
    }

    #[inline]
    #[must_use]
    pub const fn invalid() -> Self {
        Self::new()
    }

    #[inline]
    #[must_use]
    pub const fn frame(&self) -> PhysicalAddress {
        PhysicalAddress::from_frame_number(self.pfn())
    }
}

/// One TLB slot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TlbEntry {
    pub hi: EntryHi,
    pub lo: EntryLo,
}

impl TlbEntry {
    #[inline]
    #[must_use]
    pub const fn new(hi: EntryHi, lo: EntryLo) -> Self {
        Self { hi, lo }
    }

    /// Translation of the page containing `va` onto the frame containing `pa`.
    #[inline]
    #[must_use]
    pub const fn mapping(va: VirtualAddress, pa: PhysicalAddress, writable: bool) -> Self {
        Self::new(EntryHi::for_page(va), EntryLo::mapping(pa, writable))
    }

    /// Invalid pattern for slot `slot`.
    #[inline]
    #[must_use]
    pub const fn invalid(slot: usize) -> Self {
        Self::new(EntryHi::invalid(slot), EntryLo::invalid())
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.lo.valid()
    }
}
