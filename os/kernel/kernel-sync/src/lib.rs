//! # Kernel synchronization primitives
//!
//! Two tools cover everything the memory layer needs:
//!
//! * [`SpinLock`] serializes access to shared allocator state between
//!   execution units.
//! * [`InterruptLevel`] and its RAII [`IrqGuard`] keep interrupt handlers off
//!   the local CPU while it rewrites its TLB. [`SoftInterrupts`] is the hosted
//!   model of one CPU's priority level.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;

pub use irq::{InterruptLevel, Ipl, IrqGuard, SoftInterrupts};
pub use spin_lock::{SpinLock, SpinLockGuard};
