//! # Physical Frame Allocator
//!
//! The one owned handle through which the kernel obtains physical frames.
//! It starts out stealing pages from [`BootRam`] and switches to a
//! [`FrameDirectory`] once [`bootstrap`](FrameAllocator::bootstrap) has run:
//!
//! ```text
//!   FrameAllocator::new(boot_ram)         FrameAllocator::bootstrap(mem)
//!            │                                      │
//!            ▼                                      ▼
//!   ┌──────────────────┐   take_range()   ┌──────────────────────┐
//!   │ Boot(BootRam)    │ ───────────────▶ │ Directory(coremap)   │
//!   │ bump, no release │                  │ first fit + release  │
//!   └──────────────────┘                  └──────────────────────┘
//! ```
//!
//! Both phases sit behind a single spin lock; every acquire and release is
//! serialized, and the lock is never held across anything that can yield.

use crate::coremap::FrameDirectory;
use crate::error::VmError;
use crate::phys_mem::PhysMemory;
use crate::ram::BootRam;
use kernel_info::memory::{kvaddr_to_paddr, paddr_to_kvaddr};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_sync::SpinLock;
use log::{debug, warn};

enum FrameSource {
    Boot(BootRam),
    Directory(FrameDirectory),
}

/// Physical frame allocator.
pub struct FrameAllocator {
    source: SpinLock<FrameSource>,
}

impl FrameAllocator {
    /// Allocator in its boot phase.
    #[must_use]
    pub const fn new(ram: BootRam) -> Self {
        Self {
            source: SpinLock::new(FrameSource::Boot(ram)),
        }
    }

    /// Allocator over an already built directory.
    #[must_use]
    pub const fn with_directory(directory: FrameDirectory) -> Self {
        Self {
            source: SpinLock::new(FrameSource::Directory(directory)),
        }
    }

    /// Claim the remaining boot RAM and build the frame directory in it.
    ///
    /// # Safety
    /// `mem` must reach all of the boot RAM range, and that range must not be
    /// in use by anything else (the bump allocator's past allocations lie
    /// below it and stay untouched).
    ///
    /// # Panics
    /// If the directory already exists or the boot RAM range was taken.
    pub unsafe fn bootstrap<M: PhysMemory>(&self, mem: &M) {
        self.source.with_lock(|source| {
            let FrameSource::Boot(ram) = source else {
                panic!("frame allocator bootstrapped twice");
            };
            let Some(range) = ram.take_range() else {
                panic!("boot RAM range already claimed");
            };
            // SAFETY: the range was just claimed from boot RAM; reachability
            // through `mem` is the caller's contract.
            let directory = unsafe { FrameDirectory::bootstrap(range, mem) };
            *source = FrameSource::Directory(directory);
        });
    }

    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.source
            .with_lock(|source| matches!(source, FrameSource::Directory(_)))
    }

    /// Free frames in the directory; `None` during boot.
    #[must_use]
    pub fn free_frames(&self) -> Option<usize> {
        self.source.with_lock(|source| match source {
            FrameSource::Boot(_) => None,
            FrameSource::Directory(dir) => Some(dir.free_frames()),
        })
    }

    /// Run a closure against the directory; `None` during boot.
    pub fn with_directory_ref<R>(&self, f: impl FnOnce(&FrameDirectory) -> R) -> Option<R> {
        self.source.with_lock(|source| match source {
            FrameSource::Boot(_) => None,
            FrameSource::Directory(dir) => Some(f(dir)),
        })
    }

    /// Allocate `npages` physically contiguous frames.
    ///
    /// # Errors
    /// - [`VmError::InvalidArgument`] if `npages` is zero.
    /// - [`VmError::OutOfMemory`] if no run (or no boot RAM) is left.
    pub fn acquire(&self, npages: u32) -> Result<PhysicalAddress, VmError> {
        if npages == 0 {
            return Err(VmError::InvalidArgument);
        }
        self.source.with_lock(|source| match source {
            FrameSource::Boot(ram) => {
                let pa = ram.steal(npages).ok_or(VmError::OutOfMemory)?;
                debug!("bootmem: stole {npages} pages at {pa:?}");
                Ok(pa)
            }
            FrameSource::Directory(dir) => dir.acquire(npages),
        })
    }

    /// Return the run whose first frame is at `base`.
    ///
    /// Null is accepted and ignored. Frames stolen before bootstrap cannot be
    /// returned; releasing during boot leaks them.
    ///
    /// # Errors
    /// [`VmError::InvalidArgument`] if `base` does not start a live run.
    pub fn release(&self, base: PhysicalAddress) -> Result<(), VmError> {
        if base.is_null() {
            return Ok(());
        }
        self.source.with_lock(|source| match source {
            FrameSource::Boot(_) => {
                warn!("bootmem: leaking {base:?}, boot memory cannot be freed");
                Ok(())
            }
            FrameSource::Directory(dir) => dir.release(base).map(|_| ()),
        })
    }

    /// Allocate `npages` kernel pages, returned as a KSEG0 address.
    ///
    /// # Errors
    /// As [`acquire`](Self::acquire).
    pub fn alloc_kpages(&self, npages: u32) -> Result<VirtualAddress, VmError> {
        self.acquire(npages).map(paddr_to_kvaddr)
    }

    /// Free pages obtained from [`alloc_kpages`](Self::alloc_kpages).
    ///
    /// Null is a no-op.
    ///
    /// # Errors
    /// [`VmError::InvalidArgument`] if `va` is not a KSEG0 address or does
    /// not start a live run.
    pub fn free_kpages(&self, va: VirtualAddress) -> Result<(), VmError> {
        if va.is_null() {
            return Ok(());
        }
        let pa = kvaddr_to_paddr(va).ok_or(VmError::InvalidArgument)?;
        self.release(pa)
    }
}

impl core::fmt::Debug for FrameAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameAllocator")
            .field("bootstrapped", &self.is_bootstrapped())
            .field("free_frames", &self.free_frames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coremap::CoremapEntry;
    use alloc::boxed::Box;
    use alloc::vec;

    fn boot(pages: u32) -> FrameAllocator {
        FrameAllocator::new(BootRam::new(
            PhysicalAddress::new(0x2_0000),
            PhysicalAddress::new(0x2_0000 + pages * 4096),
        ))
    }

    #[test]
    fn boot_phase_steals_and_leaks() {
        let frames = boot(4);
        assert!(!frames.is_bootstrapped());
        let a = frames.acquire(2).unwrap();
        assert_eq!(a, PhysicalAddress::new(0x2_0000));
        assert_eq!(frames.release(a), Ok(()));
        // still gone: the bump pointer never moves back
        assert_eq!(frames.acquire(2).unwrap(), PhysicalAddress::new(0x2_2000));
        assert_eq!(frames.acquire(1), Err(VmError::OutOfMemory));
        assert_eq!(frames.free_frames(), None);
    }

    #[test]
    fn zero_pages_rejected_in_both_phases() {
        assert_eq!(boot(4).acquire(0), Err(VmError::InvalidArgument));
        let storage = Box::leak(vec![CoremapEntry::default(); 2].into_boxed_slice());
        let frames =
            FrameAllocator::with_directory(FrameDirectory::new(storage, PhysicalAddress::new(0x2_0000)));
        assert_eq!(frames.acquire(0), Err(VmError::InvalidArgument));
    }

    #[test]
    fn kpages_are_kseg0_addresses() {
        let frames = boot(4);
        let va = frames.alloc_kpages(1).unwrap();
        assert_eq!(va, VirtualAddress::new(0x8002_0000));
        assert_eq!(frames.free_kpages(VirtualAddress::zero()), Ok(()));
        assert_eq!(
            frames.free_kpages(VirtualAddress::new(0x0040_0000)),
            Err(VmError::InvalidArgument)
        );
    }
}
