//! # Physical Memory Access
//!
//! The allocator hands out *physical* frames, but zero-filling a fresh region
//! or duplicating one for `fork` needs to touch their bytes. [`PhysMemory`]
//! abstracts over how the kernel reaches physical memory:
//!
//! - [`Kseg0Memory`]: the real machine. Every physical address below 512 MiB
//!   is visible at `MIPS_KSEG0 + pa`, no mapping required.
//! - [`SimulatedRam`]: a heap buffer standing in for a RAM bank, so the whole
//!   memory layer runs on the host.

use alloc::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use alloc::vec;
use alloc::vec::Vec;
use core::ptr::NonNull;
use kernel_info::memory::paddr_to_kvaddr;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress};

/// Byte-level access to physical RAM.
pub trait PhysMemory {
    /// Set `len` bytes starting at `pa` to `byte`.
    fn fill(&self, pa: PhysicalAddress, byte: u8, len: usize);

    /// Copy `len` bytes from `src` to `dst`. The ranges must not overlap.
    fn copy(&self, src: PhysicalAddress, dst: PhysicalAddress, len: usize);

    /// Read `buf.len()` bytes starting at `pa`.
    fn read(&self, pa: PhysicalAddress, buf: &mut [u8]);

    /// Write `data` starting at `pa`.
    fn write(&self, pa: PhysicalAddress, data: &[u8]);

    /// Reinterpret `len` elements of `T` starting at `pa` as a slice.
    ///
    /// # Safety
    /// - `pa .. pa + len * size_of::<T>()` must be RAM owned exclusively by
    ///   the caller for the whole lifetime `'a`, and suitably aligned for `T`.
    /// - The backing memory must outlive `'a`.
    /// - The bytes must be a valid `T` once the caller has initialized them;
    ///   the caller must not read elements before writing them.
    unsafe fn slice_mut<'a, T>(&self, pa: PhysicalAddress, len: usize) -> &'a mut [T];
}

/// Physical memory through the KSEG0 direct map.
#[derive(Debug)]
pub struct Kseg0Memory {
    _private: (),
}

impl Kseg0Memory {
    /// # Safety
    /// Must only be constructed on the target machine, and only physical
    /// addresses of RAM owned by the caller may be passed to its methods.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    #[inline]
    fn ptr(pa: PhysicalAddress) -> *mut u8 {
        paddr_to_kvaddr(pa).as_u32() as usize as *mut u8
    }
}

impl PhysMemory for Kseg0Memory {
    fn fill(&self, pa: PhysicalAddress, byte: u8, len: usize) {
        // SAFETY: construction promised that `pa` is owned RAM below 512 MiB.
        unsafe { core::ptr::write_bytes(Self::ptr(pa), byte, len) }
    }

    fn copy(&self, src: PhysicalAddress, dst: PhysicalAddress, len: usize) {
        // SAFETY: as above; callers pass disjoint runs.
        unsafe { core::ptr::copy_nonoverlapping(Self::ptr(src), Self::ptr(dst), len) }
    }

    fn read(&self, pa: PhysicalAddress, buf: &mut [u8]) {
        // SAFETY: as above.
        unsafe { core::ptr::copy_nonoverlapping(Self::ptr(pa), buf.as_mut_ptr(), buf.len()) }
    }

    fn write(&self, pa: PhysicalAddress, data: &[u8]) {
        // SAFETY: as above.
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), Self::ptr(pa), data.len()) }
    }

    unsafe fn slice_mut<'a, T>(&self, pa: PhysicalAddress, len: usize) -> &'a mut [T] {
        // SAFETY: forwarded to the caller.
        unsafe { core::slice::from_raw_parts_mut(Self::ptr(pa).cast::<T>(), len) }
    }
}

/// A page-aligned heap buffer posing as RAM at `[base, base + size)`.
///
/// Accesses outside the simulated bank are kernel bugs and panic.
pub struct SimulatedRam {
    base: PhysicalAddress,
    size: u32,
    mem: NonNull<u8>,
}

// SAFETY: the buffer is uniquely owned; moving it between threads is fine.
unsafe impl Send for SimulatedRam {}

impl SimulatedRam {
    /// Zero-initialized RAM of `size` bytes, rounded up to whole pages.
    ///
    /// # Panics
    /// If `base` is not page aligned or the bank would extend past 4 GiB.
    #[must_use]
    pub fn new(base: PhysicalAddress, size: u32) -> Self {
        assert!(base.is_page_aligned(), "simulated RAM base {base:?} not page aligned");
        let size = kernel_memory_addresses::align_up(size.max(PAGE_SIZE), PAGE_SIZE)
            .filter(|&s| base.checked_add(s).is_some())
            .unwrap_or_else(|| panic!("simulated RAM of {size:#x} bytes at {base:?} exceeds 4 GiB"));
        let layout = Self::layout(size);
        // SAFETY: the layout has a non-zero size.
        let mem = NonNull::new(unsafe { alloc_zeroed(layout) })
            .unwrap_or_else(|| handle_alloc_error(layout));
        Self { base, size, mem }
    }

    fn layout(size: u32) -> Layout {
        Layout::from_size_align(size as usize, PAGE_SIZE as usize)
            .unwrap_or_else(|_| panic!("invalid simulated RAM layout"))
    }

    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    /// One past the last byte of the bank.
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_u32() + self.size)
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Copy out `len` bytes starting at `pa`.
    #[must_use]
    pub fn read_vec(&self, pa: PhysicalAddress, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        self.read(pa, &mut buf);
        buf
    }

    fn ptr(&self, pa: PhysicalAddress, len: usize) -> *mut u8 {
        let offset = pa
            .offset_from(self.base)
            .map(|o| o as usize)
            .filter(|&o| o.checked_add(len).is_some_and(|end| end <= self.size as usize));
        match offset {
            // SAFETY: `offset + len` lies within the allocation.
            Some(o) => unsafe { self.mem.as_ptr().add(o) },
            None => panic!(
                "physical access {pa:?}+{len:#x} outside simulated RAM {:?}..{:?}",
                self.base,
                self.end()
            ),
        }
    }
}

impl Drop for SimulatedRam {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with the same layout.
        unsafe { dealloc(self.mem.as_ptr(), Self::layout(self.size)) }
    }
}

impl core::fmt::Debug for SimulatedRam {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatedRam")
            .field("base", &self.base)
            .field("end", &self.end())
            .finish_non_exhaustive()
    }
}

impl PhysMemory for SimulatedRam {
    fn fill(&self, pa: PhysicalAddress, byte: u8, len: usize) {
        let dst = self.ptr(pa, len);
        // SAFETY: bounds checked by `ptr`.
        unsafe { core::ptr::write_bytes(dst, byte, len) }
    }

    fn copy(&self, src: PhysicalAddress, dst: PhysicalAddress, len: usize) {
        let (s, d) = (self.ptr(src, len), self.ptr(dst, len));
        // SAFETY: bounds checked; `copy` tolerates overlap, so a caller bug
        // cannot turn into UB here.
        unsafe { core::ptr::copy(s, d, len) }
    }

    fn read(&self, pa: PhysicalAddress, buf: &mut [u8]) {
        let src = self.ptr(pa, buf.len());
        // SAFETY: bounds checked; `buf` is a distinct allocation.
        unsafe { core::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len()) }
    }

    fn write(&self, pa: PhysicalAddress, data: &[u8]) {
        let dst = self.ptr(pa, data.len());
        // SAFETY: bounds checked; `data` is a distinct allocation.
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len()) }
    }

    unsafe fn slice_mut<'a, T>(&self, pa: PhysicalAddress, len: usize) -> &'a mut [T] {
        let bytes = len
            .checked_mul(size_of::<T>())
            .unwrap_or_else(|| panic!("slice of {len} elements overflows"));
        let ptr = self.ptr(pa, bytes).cast::<T>();
        assert!(ptr.is_aligned(), "{pa:?} is not aligned for the requested type");
        // SAFETY: in bounds and aligned; exclusivity and lifetime are the
        // caller's contract.
        unsafe { core::slice::from_raw_parts_mut(ptr, len) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed_and_round_trips_bytes() {
        let ram = SimulatedRam::new(PhysicalAddress::new(0x1_0000), 2 * PAGE_SIZE);
        assert_eq!(ram.end(), PhysicalAddress::new(0x1_2000));
        assert!(ram.read_vec(ram.base(), 8192).iter().all(|&b| b == 0));

        ram.write(PhysicalAddress::new(0x1_0ffe), b"abcd");
        assert_eq!(ram.read_vec(PhysicalAddress::new(0x1_0ffe), 4), b"abcd");
    }

    #[test]
    fn fill_and_copy() {
        let ram = SimulatedRam::new(PhysicalAddress::new(0x1_0000), 2 * PAGE_SIZE);
        ram.fill(PhysicalAddress::new(0x1_0000), 0xa5, PAGE_SIZE as usize);
        ram.copy(
            PhysicalAddress::new(0x1_0000),
            PhysicalAddress::new(0x1_1000),
            PAGE_SIZE as usize,
        );
        assert!(ram.read_vec(PhysicalAddress::new(0x1_1000), 4096).iter().all(|&b| b == 0xa5));
    }

    #[test]
    #[should_panic(expected = "outside simulated RAM")]
    fn out_of_bank_access_panics() {
        let ram = SimulatedRam::new(PhysicalAddress::new(0x1_0000), PAGE_SIZE);
        ram.fill(PhysicalAddress::new(0x1_0800), 0, PAGE_SIZE as usize);
    }

    #[test]
    #[should_panic(expected = "outside simulated RAM")]
    fn below_bank_access_panics() {
        let ram = SimulatedRam::new(PhysicalAddress::new(0x1_0000), PAGE_SIZE);
        let mut b = [0u8; 1];
        ram.read(PhysicalAddress::new(0xfff), &mut b);
    }
}
