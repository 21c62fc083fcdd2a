//! # Kernel Memory Layout Configuration
//!
//! This crate is the single source of truth for the fixed virtual memory
//! layout of the MIPS r3000 machine the VM layer runs on. Every other crate
//! takes its segment boundaries and user stack geometry from here instead of
//! repeating magic numbers.
//!
//! ## Virtual Address Space Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐  MIPS_KUSEG
//!             │          User Space             │
//!             │   (TLB mapped, per process)     │
//!             │                                 │
//! USER_STACK_ ├─────────────────────────────────┤  USERSTACK - 12 pages
//!   BASE      │        User Stack (12 pages)    │
//! USERSTACK   ├─────────────────────────────────┤  0x8000_0000
//!             │            KSEG0                │
//!             │ (unmapped, cached; VA - KSEG0   │
//!             │  is the physical address)       │
//! MIPS_KSEG1  ├─────────────────────────────────┤  0xA000_0000
//!             │            KSEG1                │
//!             │   (unmapped, uncached devices)  │
//! MIPS_KSEG2  ├─────────────────────────────────┤  0xC000_0000
//!             │            KSEG2                │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! * **KUSEG** is the only segment translated through the TLB; the fault
//!   resolver only ever installs mappings for addresses below
//!   [`USERSPACE_TOP`](memory::USERSPACE_TOP).
//! * **KSEG0** is how the kernel reaches physical memory: frames handed out by
//!   the allocator are addressed through [`paddr_to_kvaddr`](memory::paddr_to_kvaddr).
//! * The TLB's invalid pattern points each slot at a distinct KSEG0 page, which
//!   can never match a user lookup.
//!
//! ## Configuration Management
//!
//! All values are `const` and validated at compile time with `const _: () =
//! { assert!(..) }` blocks; there is no runtime configuration.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
