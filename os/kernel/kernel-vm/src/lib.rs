//! # Physical and Virtual Memory for a TLB-Refilled Kernel
//!
//! This crate is the memory layer of a small teaching kernel on a MIPS r3000
//! style machine: 32-bit addresses, 4 KiB pages, a 64-entry software-refilled
//! TLB and no hardware page tables. Each process gets two regions and a stack,
//! each backed by one run of physically contiguous frames.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Fault Resolver                      │
//! │    • decode and classify TLB misses                 │
//! │    • region lookup, TLB refill                      │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ reads
//! ┌─────────────────▼───────────────────────────────────┐
//! │             Address-Space Descriptor                │
//! │    • code / data / stack regions                    │
//! │    • create, load, copy (fork), destroy             │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ acquire / release runs
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Physical Frame Allocator                  │
//! │    • boot bump allocator, then coremap              │
//! │    • first-fit contiguous runs                      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Physical Frame Allocator ([`frame_alloc`], [`coremap`], [`ram`])
//!
//! * **Boot phase**: pages are stolen from [`BootRam`] with a bump pointer
//!   and can never be returned.
//! * **Coremap phase**: [`FrameAllocator::bootstrap`] claims the remaining RAM
//!   once, stores a [`FrameDirectory`] at its bottom and manages every whole
//!   frame above it.
//! * Runs are found first fit and must be released by their first frame.
//!
//! ### Address Spaces ([`address_space`])
//!
//! [`AddressSpace`] records where each region lives virtually and
//! physically. Nothing is demand paged: [`AddressSpace::prepare_load`]
//! allocates and zeroes everything up front.
//!
//! ### Fault Handling ([`fault`], [`cpu`])
//!
//! [`Cpu::handle_fault`] (or the raw-code entry point [`vm_fault`]) turns a
//! TLB miss into a TLB entry. Code pages are installed read-only once the
//! image has been loaded; everything else is writable.
//!
//! ### Physical Memory Access ([`phys_mem`])
//!
//! [`PhysMemory`] is how zero-filling and copying reach RAM: through KSEG0 on
//! the machine, or a heap buffer on the host.
//!
//! ## Usage Example
//!
//! ```rust
//! use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
//! use kernel_sync::SoftInterrupts;
//! use kernel_tlb::SoftTlb;
//! use kernel_vm::{AddressSpace, BootRam, Cpu, FaultType, FrameAllocator, RegionFlags, SimulatedRam};
//!
//! let ram: &'static SimulatedRam =
//!     Box::leak(Box::new(SimulatedRam::new(PhysicalAddress::new(0x1_0000), 1 << 20)));
//! let frames = FrameAllocator::new(BootRam::new(ram.base(), ram.end()));
//! // SAFETY: the simulated bank is leaked and used by nothing else.
//! unsafe { frames.bootstrap(ram) };
//!
//! let mut aspace = AddressSpace::create();
//! aspace.define_region(VirtualAddress::new(0x40_0000), 0x2000, RegionFlags::READ | RegionFlags::EXEC)?;
//! aspace.prepare_load(&frames, ram)?;
//! aspace.complete_load();
//!
//! let tlb: SoftTlb = SoftTlb::default();
//! let mut cpu = Cpu::new(tlb, SoftInterrupts::new());
//! aspace.activate(&mut cpu);
//! cpu.handle_fault(Some(&aspace), FaultType::Read, VirtualAddress::new(0x40_1234))?;
//!
//! let (pa, writable) = cpu.tlb().translate(VirtualAddress::new(0x40_1234)).unwrap();
//! assert_eq!(pa, aspace.translate(VirtualAddress::new(0x40_1234))?);
//! assert!(!writable);
//!
//! aspace.destroy(&frames);
//! # Ok::<(), kernel_vm::VmError>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod address_space;
pub mod coremap;
pub mod cpu;
pub mod error;
pub mod fault;
pub mod frame_alloc;
pub mod phys_mem;
pub mod process;
pub mod ram;

pub use address_space::{AddressSpace, Region, RegionFlags};
pub use coremap::{CoremapEntry, DirectoryLayout, FrameDirectory};
pub use cpu::Cpu;
pub use error::VmError;
pub use fault::{FaultType, Resolution, VM_FAULT_READ, VM_FAULT_READONLY, VM_FAULT_WRITE, resolve, vm_fault};
pub use frame_alloc::FrameAllocator;
pub use phys_mem::{Kseg0Memory, PhysMemory, SimulatedRam};
pub use process::Process;
pub use ram::{BootRam, RamRange};
