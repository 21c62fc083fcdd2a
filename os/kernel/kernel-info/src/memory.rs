//! # Memory Layout

use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, VirtualAddress};

/// Start of the TLB-mapped user segment.
pub const MIPS_KUSEG: u32 = 0x0000_0000;

/// Start of the direct-mapped, cached kernel segment.
///
/// Physical address `pa` is reachable at `MIPS_KSEG0 + pa`.
pub const MIPS_KSEG0: u32 = 0x8000_0000;

/// Start of the direct-mapped, uncached kernel segment.
pub const MIPS_KSEG1: u32 = 0xa000_0000;

/// Start of the TLB-mapped kernel segment.
pub const MIPS_KSEG2: u32 = 0xc000_0000;

/// End of userspace VA range; kernel space begins here.
pub const USERSPACE_TOP: u32 = MIPS_KSEG0;

/// Initial user stack pointer. The stack grows down from here.
pub const USERSTACK: u32 = USERSPACE_TOP;

/// Fixed size of every user stack, in pages.
pub const USER_STACK_PAGES: u32 = 12;

/// Lowest address of the user stack region.
pub const USER_STACK_BASE: u32 = USERSTACK - USER_STACK_PAGES * PAGE_SIZE;

/// Amount of physical memory reachable through KSEG0.
pub const KSEG0_SIZE: u32 = MIPS_KSEG1 - MIPS_KSEG0;

const _: () = {
    assert!(USER_STACK_BASE.is_multiple_of(PAGE_SIZE));
    assert!(USERSTACK.is_multiple_of(PAGE_SIZE));
    assert!(USER_STACK_BASE > MIPS_KUSEG);
    assert!(MIPS_KSEG1 > MIPS_KSEG0);
    assert!(MIPS_KSEG2 > MIPS_KSEG1);
};

/// Kernel-virtual (KSEG0) address of a physical address.
///
/// The caller must make sure `pa` lies below [`KSEG0_SIZE`]; RAM beyond the
/// first 512 MiB is not direct mapped.
///
/// ```rust
/// # use kernel_info::memory::paddr_to_kvaddr;
/// # use kernel_memory_addresses::PhysicalAddress;
/// let va = paddr_to_kvaddr(PhysicalAddress::new(0x0001_2000));
/// assert_eq!(va.as_u32(), 0x8001_2000);
/// ```
#[inline]
#[must_use]
pub const fn paddr_to_kvaddr(pa: PhysicalAddress) -> VirtualAddress {
    VirtualAddress::new(pa.as_u32() + MIPS_KSEG0)
}

/// Physical address behind a KSEG0 address, or `None` if `va` is not in KSEG0.
///
/// ```rust
/// # use kernel_info::memory::kvaddr_to_paddr;
/// # use kernel_memory_addresses::VirtualAddress;
/// assert_eq!(kvaddr_to_paddr(VirtualAddress::new(0x8001_2000)).map(|pa| pa.as_u32()), Some(0x1_2000));
/// assert_eq!(kvaddr_to_paddr(VirtualAddress::new(0x0040_0000)), None);
/// assert_eq!(kvaddr_to_paddr(VirtualAddress::new(0xa000_0000)), None);
/// ```
#[inline]
#[must_use]
pub const fn kvaddr_to_paddr(va: VirtualAddress) -> Option<PhysicalAddress> {
    let v = va.as_u32();
    if v >= MIPS_KSEG0 && v < MIPS_KSEG1 {
        Some(PhysicalAddress::new(v - MIPS_KSEG0))
    } else {
        None
    }
}

/// Whether `va` lies in the TLB-mapped user segment.
#[inline]
#[must_use]
pub const fn is_user_address(va: VirtualAddress) -> bool {
    va.as_u32() < USERSPACE_TOP
}
