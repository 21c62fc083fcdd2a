//! # Frame Directory (coremap)
//!
//! One [`CoremapEntry`] per managed physical frame, kept in frame order. An
//! allocation is a *run* of contiguous frames; only its first entry records
//! the run length, the rest are merely marked in use:
//!
//! ```text
//! index     0     1     2     3     4     5     6
//! in_use    ■     ■     ■     □     ■     ■     □
//! run_len   3     0     0     0     2     0     0
//!           └── run of 3 ─┘         └ run 2 ┘
//! ```
//!
//! Allocation is a first-fit scan that restarts the candidate run at every
//! used entry. Release takes the physical base of a run's first frame and
//! frees the whole run.
//!
//! At bootstrap the directory places its own storage at the bottom of the
//! RAM it manages and covers every whole frame that fits above it.

use crate::error::VmError;
use crate::phys_mem::PhysMemory;
use crate::ram::RamRange;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, align_down, align_up};
use log::{debug, info, warn};

/// Bookkeeping for one physical frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoremapEntry {
    paddr: PhysicalAddress,
    in_use: bool,
    run_len: u32,
}

impl CoremapEntry {
    #[must_use]
    pub const fn paddr(&self) -> PhysicalAddress {
        self.paddr
    }

    #[must_use]
    pub const fn in_use(&self) -> bool {
        self.in_use
    }

    /// Length of the run this entry starts, or 0 if it starts none.
    #[must_use]
    pub const fn run_len(&self) -> u32 {
        self.run_len
    }
}

/// Bytes of directory storage per managed frame.
#[allow(clippy::cast_possible_truncation)]
pub const ENTRY_SIZE: u32 = size_of::<CoremapEntry>() as u32;

/// Frame directory over a contiguous stretch of physical frames.
#[derive(Debug)]
pub struct FrameDirectory {
    entries: &'static mut [CoremapEntry],
    first_frame: PhysicalAddress,
    free: usize,
}

impl FrameDirectory {
    /// Directory over `storage.len()` frames starting at `first_frame`.
    ///
    /// Every frame starts out free; whatever `storage` held is overwritten.
    ///
    /// # Panics
    /// If `first_frame` is null or not page aligned, or the frames would
    /// extend past the 32-bit physical address space.
    pub fn new(storage: &'static mut [CoremapEntry], first_frame: PhysicalAddress) -> Self {
        assert!(
            !first_frame.is_null() && first_frame.is_page_aligned(),
            "bad first frame {first_frame:?}"
        );
        let count = storage.len();
        let mut paddr = first_frame;
        for (i, entry) in storage.iter_mut().enumerate() {
            *entry = CoremapEntry {
                paddr,
                in_use: false,
                run_len: 0,
            };
            if i + 1 < count {
                paddr = paddr
                    .checked_add(PAGE_SIZE)
                    .unwrap_or_else(|| panic!("frame directory exceeds physical address space"));
            }
        }
        Self {
            entries: storage,
            first_frame,
            free: count,
        }
    }

    /// Build the directory inside `range`, placing its storage at the bottom.
    ///
    /// # Safety
    /// `range` must be RAM owned exclusively by the directory from now on,
    /// reachable through `mem` for the rest of the kernel's life.
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn bootstrap<M: PhysMemory>(range: RamRange, mem: &M) -> Self {
        let layout = DirectoryLayout::for_range(range);
        // SAFETY: the storage lies at the bottom of `range`, which the caller
        // hands over for good; `new` initializes every entry before use.
        let storage = unsafe { mem.slice_mut::<CoremapEntry>(layout.storage, layout.frames) };
        let dir = Self::new(storage, layout.first_frame);
        info!(
            "coremap: {} frames at {:?}, directory at {:?} ({} bytes)",
            layout.frames,
            layout.first_frame,
            layout.storage,
            layout.frames as u32 * ENTRY_SIZE
        );
        dir
    }

    /// Number of managed frames.
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.entries.len()
    }

    /// Number of frames currently free.
    #[must_use]
    pub const fn free_frames(&self) -> usize {
        self.free
    }

    /// Physical base of the first managed frame.
    #[must_use]
    pub const fn first_frame(&self) -> PhysicalAddress {
        self.first_frame
    }

    #[must_use]
    pub fn entries(&self) -> &[CoremapEntry] {
        &*self.entries
    }

    /// Live runs as `(base, frames)`, in address order.
    pub fn runs(&self) -> impl Iterator<Item = (PhysicalAddress, u32)> + '_ {
        self.entries
            .iter()
            .filter(|e| e.run_len != 0)
            .map(|e| (e.paddr, e.run_len))
    }

    /// Index of the first run of `npages` free frames.
    fn find_run(&self, npages: usize) -> Option<usize> {
        let mut start = None;
        let mut len = 0;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.in_use {
                // reset
                start = None;
                len = 0;
                continue;
            }
            let s = *start.get_or_insert(i);
            len += 1;
            if len == npages {
                return Some(s);
            }
        }
        None
    }

    /// Allocate `npages` contiguous frames, first fit.
    ///
    /// # Errors
    /// - [`VmError::InvalidArgument`] if `npages` is zero.
    /// - [`VmError::OutOfMemory`] if no free run is long enough.
    pub fn acquire(&mut self, npages: u32) -> Result<PhysicalAddress, VmError> {
        if npages == 0 {
            return Err(VmError::InvalidArgument);
        }
        let n = npages as usize;
        let Some(start) = self.find_run(n) else {
            debug!("coremap: no run of {npages} frames ({} free)", self.free);
            return Err(VmError::OutOfMemory);
        };

        let run = &mut self.entries[start..start + n];
        run[0].run_len = npages;
        for entry in run.iter_mut() {
            entry.in_use = true;
        }
        self.free -= n;

        let base = self.entries[start].paddr;
        debug!("coremap: acquired {npages} frames at {base:?}");
        Ok(base)
    }

    /// Free the run whose first frame is at `base`; returns its length.
    ///
    /// # Errors
    /// [`VmError::InvalidArgument`] if `base` is unaligned, outside the
    /// directory, free, or not the first frame of a run. Nothing is changed.
    pub fn release(&mut self, base: PhysicalAddress) -> Result<u32, VmError> {
        let Some(index) = self.index_of(base) else {
            warn!("coremap: release of unmanaged address {base:?}");
            return Err(VmError::InvalidArgument);
        };
        let head = self.entries[index];
        if !head.in_use || head.run_len == 0 {
            warn!("coremap: release of {base:?}, which does not start a run");
            return Err(VmError::InvalidArgument);
        }

        let n = head.run_len as usize;
        let run = &mut self.entries[index..index + n];
        run[0].run_len = 0;
        for entry in run.iter_mut() {
            debug_assert!(entry.in_use, "run at {base:?} has a free frame");
            entry.in_use = false;
        }
        self.free += n;

        debug!("coremap: released {n} frames at {base:?}");
        Ok(head.run_len)
    }

    fn index_of(&self, pa: PhysicalAddress) -> Option<usize> {
        if !pa.is_page_aligned() {
            return None;
        }
        let index = (pa.offset_from(self.first_frame)? / PAGE_SIZE) as usize;
        (index < self.entries.len()).then_some(index)
    }
}

/// Where the directory and its frames go inside a RAM range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLayout {
    /// Start of the entry array.
    pub storage: PhysicalAddress,
    /// First managed frame, right after the (page-rounded) storage.
    pub first_frame: PhysicalAddress,
    /// Number of managed frames.
    pub frames: usize,
}

impl DirectoryLayout {
    /// The largest directory whose storage and frames both fit in `range`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn for_range(range: RamRange) -> Self {
        let storage = align_up(range.start.as_u32(), align_of::<CoremapEntry>() as u32)
            .unwrap_or(range.end.as_u32());
        let end = align_down(range.end.as_u32(), PAGE_SIZE);
        let avail = end.saturating_sub(storage);

        let mut frames = avail / (PAGE_SIZE + ENTRY_SIZE);
        loop {
            // storage + frames * ENTRY_SIZE <= end, so this cannot wrap
            let first_frame = align_up(storage + frames * ENTRY_SIZE, PAGE_SIZE);
            let fits = first_frame.filter(|&ff| {
                ff.checked_add(frames * PAGE_SIZE)
                    .is_some_and(|frames_end| frames_end <= end)
            });
            if let Some(ff) = fits {
                return Self {
                    storage: PhysicalAddress::new(storage),
                    first_frame: PhysicalAddress::new(ff),
                    frames: frames as usize,
                };
            }
            if frames == 0 {
                return Self {
                    storage: PhysicalAddress::new(storage),
                    first_frame: PhysicalAddress::new(first_frame.unwrap_or(end)),
                    frames: 0,
                };
            }
            frames -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;
    use alloc::vec::Vec;

    fn directory(frames: usize) -> FrameDirectory {
        let storage = Box::leak(vec![CoremapEntry::default(); frames].into_boxed_slice());
        FrameDirectory::new(storage, PhysicalAddress::new(0x10_0000))
    }

    #[test]
    fn entries_cover_consecutive_frames() {
        let dir = directory(3);
        let bases: Vec<_> = dir.entries().iter().map(|e| e.paddr().as_u32()).collect();
        assert_eq!(bases, [0x10_0000, 0x10_1000, 0x10_2000]);
        assert_eq!(dir.free_frames(), 3);
    }

    #[test]
    fn run_length_only_on_first_frame() {
        let mut dir = directory(6);
        dir.acquire(1).unwrap();
        let base = dir.acquire(3).unwrap();
        assert_eq!(base, PhysicalAddress::new(0x10_1000));
        let lens: Vec<_> = dir.entries().iter().map(CoremapEntry::run_len).collect();
        assert_eq!(lens, [1, 3, 0, 0, 0, 0]);
        let used: Vec<_> = dir.entries().iter().map(CoremapEntry::in_use).collect();
        assert_eq!(used, [true, true, true, true, false, false]);
        assert_eq!(dir.free_frames(), 2);
    }

    #[test]
    fn scan_resets_on_used_entry() {
        let mut dir = directory(6);
        let a = dir.acquire(2).unwrap();
        let _b = dir.acquire(1).unwrap();
        dir.release(a).unwrap();
        // frames 0..2 free, 2 used, 3..6 free: a run of 3 must skip the hole
        assert_eq!(dir.acquire(3).unwrap(), PhysicalAddress::new(0x10_3000));
        assert_eq!(dir.acquire(2).unwrap(), PhysicalAddress::new(0x10_0000));
    }

    #[test]
    fn zero_pages_is_invalid() {
        let mut dir = directory(2);
        assert_eq!(dir.acquire(0), Err(VmError::InvalidArgument));
        assert_eq!(dir.free_frames(), 2);
    }

    #[test]
    fn release_rejects_everything_but_a_run_head() {
        let mut dir = directory(4);
        let base = dir.acquire(3).unwrap();
        for bad in [
            PhysicalAddress::new(0x10_1000), // mid-run
            PhysicalAddress::new(0x10_3000), // free
            PhysicalAddress::new(0x10_0010), // unaligned
            PhysicalAddress::new(0x0f_f000), // below
            PhysicalAddress::new(0x10_4000), // above
        ] {
            assert_eq!(dir.release(bad), Err(VmError::InvalidArgument), "{bad:?}");
        }
        assert_eq!(dir.free_frames(), 1);
        assert_eq!(dir.release(base), Ok(3));
        assert_eq!(dir.release(base), Err(VmError::InvalidArgument));
        assert_eq!(dir.free_frames(), 4);
    }

    #[test]
    fn layout_fits_storage_and_frames() {
        let range = RamRange::new(PhysicalAddress::new(0x3_1234), PhysicalAddress::new(0x40_0000));
        let layout = DirectoryLayout::for_range(range);
        assert!(layout.storage >= range.start);
        assert!(layout.first_frame.is_page_aligned());
        let storage_end = layout.storage.as_u32() + layout.frames as u32 * ENTRY_SIZE;
        assert!(layout.first_frame.as_u32() >= storage_end);
        let frames_end = layout.first_frame.as_u32() + layout.frames as u32 * PAGE_SIZE;
        assert!(frames_end <= range.end.as_u32());
        // not a single additional frame would fit
        let grown = DirectoryLayout {
            frames: layout.frames + 1,
            ..layout
        };
        let grown_first = align_up(
            grown.storage.as_u32() + grown.frames as u32 * ENTRY_SIZE,
            PAGE_SIZE,
        )
        .unwrap();
        assert!(grown_first + grown.frames as u32 * PAGE_SIZE > range.end.as_u32());
    }

    #[test]
    fn layout_of_tiny_range_is_empty() {
        let range = RamRange::new(PhysicalAddress::new(0x1_0000), PhysicalAddress::new(0x1_0800));
        assert_eq!(DirectoryLayout::for_range(range).frames, 0);
    }
}
