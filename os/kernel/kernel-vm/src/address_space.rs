//! # Address-Space Descriptor
//!
//! A process's view of user memory: up to two regions (code, then data) plus
//! a fixed-size stack right below [`USERSTACK`]. Each is backed by a single
//! run of physically contiguous frames, so translating a user address is an
//! offset computation:
//!
//! ```text
//!  virtual                              physical
//!  ┌──────────────┐ code.vbase          ┌──────────────┐ code.pbase
//!  │ code         │ ──────────────────▶ │ run 1        │
//!  └──────────────┘                     └──────────────┘
//!  ┌──────────────┐ data.vbase          ┌──────────────┐ data.pbase
//!  │ data         │ ──────────────────▶ │ run 2        │
//!  └──────────────┘                     └──────────────┘
//!         ⋮
//!  ┌──────────────┐ USER_STACK_BASE     ┌──────────────┐ stack_pbase
//!  │ stack (12 p) │ ──────────────────▶ │ run 3        │
//!  └──────────────┘ USERSTACK           └──────────────┘
//! ```
//!
//! Lifecycle: [`create`](AddressSpace::create) →
//! [`define_region`](AddressSpace::define_region) (once or twice) →
//! [`prepare_load`](AddressSpace::prepare_load) → image loading →
//! [`complete_load`](AddressSpace::complete_load) →
//! [`define_stack`](AddressSpace::define_stack); then
//! [`copy`](AddressSpace::copy) on fork and
//! [`destroy`](AddressSpace::destroy) on exit.

use crate::cpu::Cpu;
use crate::error::VmError;
use crate::frame_alloc::FrameAllocator;
use crate::phys_mem::PhysMemory;
use bitflags::bitflags;
use kernel_info::memory::{USER_STACK_BASE, USER_STACK_PAGES, USERSTACK};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, VirtualAddress, align_up};
use kernel_sync::InterruptLevel;
use kernel_tlb::Tlb;
use log::{debug, error, trace, warn};

bitflags! {
    /// Permissions requested by the image loader.
    ///
    /// Recorded for diagnostics only: every mapped page is readable and
    /// writable until the load completes.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct RegionFlags: u8 {
        const READ = 0b100;
        const WRITE = 0b010;
        const EXEC = 0b001;
    }
}

/// A page-aligned, physically contiguous region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    vbase: VirtualAddress,
    pbase: PhysicalAddress,
    npages: u32,
    flags: RegionFlags,
}

impl Region {
    #[must_use]
    pub const fn vbase(&self) -> VirtualAddress {
        self.vbase
    }

    /// Physical base; null until the region is populated.
    #[must_use]
    pub const fn pbase(&self) -> PhysicalAddress {
        self.pbase
    }

    #[must_use]
    pub const fn npages(&self) -> u32 {
        self.npages
    }

    #[must_use]
    pub const fn flags(&self) -> RegionFlags {
        self.flags
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.npages == 0
    }

    #[must_use]
    pub const fn is_populated(&self) -> bool {
        !self.pbase.is_null()
    }

    /// Size in bytes.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.npages * PAGE_SIZE
    }

    /// One past the last virtual address.
    #[must_use]
    pub const fn vtop(&self) -> u32 {
        self.vbase.as_u32() + self.len()
    }

    /// Whether `va` falls inside the region. Empty regions contain nothing.
    #[must_use]
    pub const fn contains(&self, va: VirtualAddress) -> bool {
        va.as_u32() >= self.vbase.as_u32() && va.as_u32() < self.vtop()
    }

    /// Physical address backing `va`, if the region contains it.
    #[must_use]
    pub const fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        if self.contains(va) {
            Some(PhysicalAddress::new(
                self.pbase.as_u32() + (va.as_u32() - self.vbase.as_u32()),
            ))
        } else {
            None
        }
    }
}

/// Address-space descriptor of one process.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AddressSpace {
    regions: [Option<Region>; 2],
    stack_pbase: PhysicalAddress,
    load_complete: bool,
}

impl AddressSpace {
    /// Empty descriptor: no regions, nothing allocated, still loading.
    #[must_use]
    pub const fn create() -> Self {
        Self {
            regions: [None, None],
            stack_pbase: PhysicalAddress::zero(),
            load_complete: false,
        }
    }

    /// Region 1 (code).
    #[must_use]
    pub const fn code(&self) -> Option<&Region> {
        self.regions[0].as_ref()
    }

    /// Region 2 (data).
    #[must_use]
    pub const fn data(&self) -> Option<&Region> {
        self.regions[1].as_ref()
    }

    /// The stack as a region.
    #[must_use]
    pub const fn stack(&self) -> Region {
        Region {
            vbase: VirtualAddress::new(USER_STACK_BASE),
            pbase: self.stack_pbase,
            npages: USER_STACK_PAGES,
            flags: RegionFlags::READ.union(RegionFlags::WRITE),
        }
    }

    #[must_use]
    pub const fn is_load_complete(&self) -> bool {
        self.load_complete
    }

    /// Whether any frames have been allocated for this descriptor.
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        !self.stack_pbase.is_null() || self.defined().any(|r| r.is_populated())
    }

    fn defined(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().flatten()
    }

    /// Record a region of `size` bytes at `vaddr`.
    ///
    /// The region is widened to whole pages: `vaddr` is rounded down and the
    /// size grows by the cut-off offset, then rounds up. Only the first two
    /// calls are accepted.
    ///
    /// # Errors
    /// - [`VmError::InvalidArgument`] if the region would run past the end of
    ///   the 32-bit address space.
    /// - [`VmError::Unimplemented`] if both region slots are taken.
    pub fn define_region(
        &mut self,
        vaddr: VirtualAddress,
        size: u32,
        flags: RegionFlags,
    ) -> Result<(), VmError> {
        let vbase = vaddr.page_base();
        let len = size
            .checked_add(vaddr.page_offset())
            .and_then(|s| align_up(s, PAGE_SIZE))
            .ok_or(VmError::InvalidArgument)?;
        vbase.checked_add(len).ok_or(VmError::InvalidArgument)?;

        let Some(slot) = self.regions.iter_mut().find(|r| r.is_none()) else {
            warn!("vm: too many regions, ignoring {vaddr:?}+{size:#x}");
            return Err(VmError::Unimplemented("too many regions"));
        };
        let region = Region {
            vbase,
            pbase: PhysicalAddress::zero(),
            npages: len / PAGE_SIZE,
            flags,
        };
        debug!("vm: region {vbase:?} ({} pages, {flags:?})", region.npages);
        *slot = Some(region);
        Ok(())
    }

    /// Allocate and zero frames for both regions and the stack.
    ///
    /// Empty regions get no frames. On failure the runs acquired so far stay
    /// recorded, so [`destroy`](Self::destroy) returns them.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`] if any run cannot be allocated.
    ///
    /// # Panics
    /// If the descriptor already holds frames.
    pub fn prepare_load<M: PhysMemory>(
        &mut self,
        frames: &FrameAllocator,
        mem: &M,
    ) -> Result<(), VmError> {
        assert!(!self.is_prepared(), "address space prepared twice");

        for region in self.regions.iter_mut().flatten() {
            if !region.is_empty() {
                region.pbase = frames.acquire(region.npages)?;
            }
        }
        self.stack_pbase = frames.acquire(USER_STACK_PAGES)?;

        for region in self.defined().filter(|r| !r.is_empty()) {
            mem.fill(region.pbase, 0, region.len() as usize);
        }
        let stack = self.stack();
        mem.fill(stack.pbase, 0, stack.len() as usize);
        Ok(())
    }

    /// Mark the image as loaded; code pages become read-only from now on.
    pub const fn complete_load(&mut self) {
        self.load_complete = true;
    }

    /// Initial user stack pointer.
    ///
    /// # Panics
    /// If the stack has not been allocated.
    #[must_use]
    pub fn define_stack(&self) -> VirtualAddress {
        assert!(!self.stack_pbase.is_null(), "user stack not allocated");
        VirtualAddress::new(USERSTACK)
    }

    /// Duplicate this address space into freshly allocated frames.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`]; the partial copy is destroyed first.
    pub fn copy<M: PhysMemory>(
        &self,
        frames: &FrameAllocator,
        mem: &M,
    ) -> Result<Self, VmError> {
        self.check_geometry();

        let mut new = Self::create();
        for (dst, src) in new.regions.iter_mut().zip(&self.regions) {
            *dst = src.map(|r| Region {
                pbase: PhysicalAddress::zero(),
                ..r
            });
        }
        new.load_complete = self.load_complete;

        if let Err(e) = new.prepare_load(frames, mem) {
            debug!("vm: copy failed ({e}), releasing partial copy");
            new.destroy(frames);
            return Err(VmError::OutOfMemory);
        }

        for (dst, src) in new.defined().zip(self.defined()) {
            if !src.is_empty() {
                mem.copy(src.pbase, dst.pbase, src.len() as usize);
            }
        }
        mem.copy(self.stack_pbase, new.stack_pbase, self.stack().len() as usize);
        Ok(new)
    }

    /// Return every run to the allocator.
    pub fn destroy(self, frames: &FrameAllocator) {
        let bases = self
            .defined()
            .map(Region::pbase)
            .chain(core::iter::once(self.stack_pbase));
        for pbase in bases {
            if let Err(e) = frames.release(pbase) {
                error!("vm: could not release run at {pbase:?}: {e}");
            }
        }
    }

    /// Make this the address space the CPU translates for.
    ///
    /// Flushes the whole TLB; no ASIDs are used.
    pub fn activate<T: Tlb, I: InterruptLevel>(&self, cpu: &mut Cpu<T, I>) {
        trace!("vm: activate (stack at {:?})", self.stack_pbase);
        cpu.invalidate_tlb();
    }

    /// Counterpart of [`activate`](Self::activate). Nothing to do.
    #[allow(clippy::unused_self)]
    pub const fn deactivate<T: Tlb, I: InterruptLevel>(&self, _cpu: &mut Cpu<T, I>) {}

    /// Physical address backing `va`.
    ///
    /// Region 1, region 2, then the stack are tried in that order.
    ///
    /// # Errors
    /// [`VmError::SegmentationFault`] if no region contains `va`.
    pub fn translate(&self, va: VirtualAddress) -> Result<PhysicalAddress, VmError> {
        self.defined()
            .copied()
            .chain(core::iter::once(self.stack()))
            .find_map(|r| r.translate(va))
            .ok_or(VmError::SegmentationFault(va))
    }

    /// Whether a mapping for `va` may be written. Only code pages of a fully
    /// loaded image are read-only.
    #[must_use]
    pub fn is_writable(&self, va: VirtualAddress) -> bool {
        let in_code = self.code().is_some_and(|r| r.contains(va));
        !(in_code && self.load_complete)
    }

    /// Assert that the geometry is consistent: defined regions and the stack
    /// are page aligned, and everything non-empty has frames.
    ///
    /// # Panics
    /// On any violation; the descriptor is corrupt.
    pub fn check_geometry(&self) {
        for region in self.defined() {
            assert!(
                region.vbase.is_page_aligned() && region.pbase.is_page_aligned(),
                "unaligned region {region:?}"
            );
            assert!(
                region.is_empty() || region.is_populated(),
                "unpopulated region {region:?}"
            );
        }
        assert!(
            !self.stack_pbase.is_null() && self.stack_pbase.is_page_aligned(),
            "bad user stack base {:?}",
            self.stack_pbase
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_region_widens_to_pages() {
        let mut aspace = AddressSpace::create();
        aspace
            .define_region(VirtualAddress::new(0x0040_0123), 0x1000, RegionFlags::READ | RegionFlags::EXEC)
            .unwrap();
        let code = aspace.code().unwrap();
        assert_eq!(code.vbase(), VirtualAddress::new(0x0040_0000));
        // 0x123 + 0x1000 bytes straddle two pages
        assert_eq!(code.npages(), 2);
        assert!(!code.is_populated());
        assert_eq!(code.flags(), RegionFlags::READ | RegionFlags::EXEC);
    }

    #[test]
    fn third_region_is_unimplemented() {
        let mut aspace = AddressSpace::create();
        aspace.define_region(VirtualAddress::new(0x40_0000), 10, RegionFlags::READ).unwrap();
        aspace.define_region(VirtualAddress::new(0x50_0000), 10, RegionFlags::WRITE).unwrap();
        assert_eq!(
            aspace.define_region(VirtualAddress::new(0x60_0000), 10, RegionFlags::WRITE),
            Err(VmError::Unimplemented("too many regions"))
        );
        assert_eq!(aspace.data().unwrap().vbase(), VirtualAddress::new(0x50_0000));
    }

    #[test]
    fn wrapping_region_is_rejected() {
        let mut aspace = AddressSpace::create();
        assert_eq!(
            aspace.define_region(VirtualAddress::new(0xffff_f000), 0x2000, RegionFlags::READ),
            Err(VmError::InvalidArgument)
        );
        assert_eq!(
            aspace.define_region(VirtualAddress::new(0x1000), u32::MAX, RegionFlags::READ),
            Err(VmError::InvalidArgument)
        );
        assert!(aspace.code().is_none());
    }

    #[test]
    fn empty_regions_never_match() {
        let empty = Region {
            vbase: VirtualAddress::new(0x40_0000),
            ..Region::default()
        };
        assert!(!empty.contains(VirtualAddress::new(0x40_0000)));
        assert_eq!(empty.translate(VirtualAddress::new(0x40_0000)), None);
    }

    #[test]
    fn stack_sits_right_below_userstack() {
        let stack = AddressSpace::create().stack();
        assert_eq!(stack.vtop(), USERSTACK);
        assert_eq!(stack.npages(), 12);
        assert!(stack.contains(VirtualAddress::new(USERSTACK - 1)));
        assert!(!stack.contains(VirtualAddress::new(USERSTACK)));
    }
}
