//! Raw physical RAM as handed over by the boot code.
//!
//! Before the frame directory exists, the only allocator is a bump pointer
//! over the free RAM above the kernel image. Once the directory is built the
//! remaining range is claimed in one go and the bump pointer retires.

use kernel_memory_addresses::{PhysicalAddress, pages_to_bytes};

/// Half-open physical range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamRange {
    pub start: PhysicalAddress,
    pub end: PhysicalAddress,
}

impl RamRange {
    #[must_use]
    pub const fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self { start, end }
    }

    /// Size in bytes; zero for an inverted range.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end.as_u32().saturating_sub(self.start.as_u32())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Boot-time RAM bookkeeping.
///
/// Holds the first free and the last physical address of RAM. Memory can be
/// stolen page-wise from the bottom until [`take_range`](Self::take_range)
/// hands out whatever is left; after that, stealing fails.
#[derive(Debug, Clone)]
pub struct BootRam {
    first_free: PhysicalAddress,
    last: PhysicalAddress,
    taken: bool,
}

impl BootRam {
    #[must_use]
    pub const fn new(first_free: PhysicalAddress, last: PhysicalAddress) -> Self {
        Self {
            first_free,
            last,
            taken: false,
        }
    }

    /// Bump-allocate `npages` contiguous pages. Never freed.
    ///
    /// Returns `None` when RAM is exhausted or the range was already taken.
    pub fn steal(&mut self, npages: u32) -> Option<PhysicalAddress> {
        if self.taken {
            return None;
        }
        let size = pages_to_bytes(npages)?;
        let next = self.first_free.checked_add(size)?;
        if next > self.last {
            return None;
        }
        let pa = self.first_free;
        self.first_free = next;
        Some(pa)
    }

    /// Claim all remaining RAM. Works exactly once.
    pub const fn take_range(&mut self) -> Option<RamRange> {
        if self.taken {
            return None;
        }
        self.taken = true;
        Some(RamRange::new(self.first_free, self.last))
    }

    #[must_use]
    pub const fn is_taken(&self) -> bool {
        self.taken
    }

    /// Bytes still available to [`steal`](Self::steal).
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        if self.taken {
            0
        } else {
            self.last.as_u32().saturating_sub(self.first_free.as_u32())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steal_bumps_until_exhausted() {
        let mut ram = BootRam::new(PhysicalAddress::new(0x1_0000), PhysicalAddress::new(0x1_3000));
        assert_eq!(ram.steal(1), Some(PhysicalAddress::new(0x1_0000)));
        assert_eq!(ram.steal(2), Some(PhysicalAddress::new(0x1_1000)));
        assert_eq!(ram.steal(1), None);
        assert_eq!(ram.remaining(), 0);
    }

    #[test]
    fn take_range_is_one_shot_and_stops_stealing() {
        let mut ram = BootRam::new(PhysicalAddress::new(0x1_0000), PhysicalAddress::new(0x2_0000));
        ram.steal(4).unwrap();
        let range = ram.take_range().unwrap();
        assert_eq!(range.start, PhysicalAddress::new(0x1_4000));
        assert_eq!(range.len(), 0xc000);
        assert_eq!(ram.take_range(), None);
        assert_eq!(ram.steal(1), None);
    }

    #[test]
    fn huge_steal_does_not_wrap() {
        let mut ram = BootRam::new(PhysicalAddress::new(0xffff_0000), PhysicalAddress::new(0xffff_f000));
        assert_eq!(ram.steal(0x10_0000), None);
        assert_eq!(ram.steal(0xffff), None);
    }
}
