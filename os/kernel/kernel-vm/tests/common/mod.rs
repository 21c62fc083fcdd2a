#![allow(dead_code)]

use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress};
use kernel_sync::SoftInterrupts;
use kernel_tlb::{RoundRobinVictim, SoftTlb};
use kernel_vm::{CoremapEntry, Cpu, FrameAllocator, FrameDirectory, SimulatedRam};

/// Physical base of every simulated RAM bank.
pub const RAM_BASE: u32 = 0x10_0000;

pub type TestCpu = Cpu<SoftTlb<RoundRobinVictim>, SoftInterrupts>;

/// A bank of `pages` zeroed frames at [`RAM_BASE`], alive for the whole test.
pub fn ram(pages: u32) -> &'static SimulatedRam {
    Box::leak(Box::new(SimulatedRam::new(
        PhysicalAddress::new(RAM_BASE),
        pages * PAGE_SIZE,
    )))
}

/// Allocator managing exactly `pages` frames at [`RAM_BASE`].
///
/// The directory itself lives on the host heap, so every frame of a bank
/// from [`ram`] is available.
pub fn frames(pages: usize) -> FrameAllocator {
    let storage = Box::leak(vec![CoremapEntry::default(); pages].into_boxed_slice());
    FrameAllocator::with_directory(FrameDirectory::new(storage, PhysicalAddress::new(RAM_BASE)))
}

/// RAM and an allocator over all of it.
pub fn machine(pages: u32) -> (&'static SimulatedRam, FrameAllocator) {
    (ram(pages), frames(pages as usize))
}

/// A CPU with a deterministic replacement policy.
pub fn cpu() -> TestCpu {
    Cpu::new(SoftTlb::new(RoundRobinVictim::new()), SoftInterrupts::new())
}

pub const fn frame(index: u32) -> PhysicalAddress {
    PhysicalAddress::new(RAM_BASE + index * PAGE_SIZE)
}
