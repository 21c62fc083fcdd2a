//! # Translation Fault Resolution
//!
//! A TLB miss moves through four steps, none of which retry:
//!
//! ```text
//! RECEIVE ──▶ CLASSIFY ──▶ RESOLVE ──▶ INSTALL
//!  decode      find the     region       write the
//!  the kind,   address      lookup,      TLB entry
//!  page-align  space,       pa = pbase   (interrupts
//!  the addr    check it     + offset     masked)
//! ```
//!
//! The first three are pure and live here ([`resolve`]); installing is the
//! CPU's job ([`Cpu::handle_fault`]).

use crate::cpu::Cpu;
use crate::error::VmError;
use crate::process::Process;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_sync::InterruptLevel;
use kernel_tlb::Tlb;
use log::trace;

/// Raw code for a read miss.
pub const VM_FAULT_READ: i32 = 0;
/// Raw code for a write miss.
pub const VM_FAULT_WRITE: i32 = 1;
/// Raw code for a write through a clean (read-only) entry.
pub const VM_FAULT_READONLY: i32 = 2;

/// Kind of translation fault.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultType {
    Read = VM_FAULT_READ,
    Write = VM_FAULT_WRITE,
    ReadOnly = VM_FAULT_READONLY,
}

impl TryFrom<i32> for FaultType {
    type Error = VmError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            VM_FAULT_READ => Ok(Self::Read),
            VM_FAULT_WRITE => Ok(Self::Write),
            VM_FAULT_READONLY => Ok(Self::ReadOnly),
            _ => Err(VmError::InvalidArgument),
        }
    }
}

/// Where a faulting page lives and how to map it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub page: VirtualAddress,
    pub frame: PhysicalAddress,
    pub writable: bool,
}

/// Work out the mapping for a fault at `address`.
///
/// # Errors
/// - [`VmError::InvalidArgument`] for read-only faults. Pages are only ever
///   mapped clean once they are meant to stay read-only.
/// - [`VmError::HardFault`] without a process or address space.
/// - [`VmError::SegmentationFault`] outside all regions.
///
/// # Panics
/// If the address space's geometry is corrupt.
pub fn resolve<P: Process + ?Sized>(
    process: Option<&P>,
    fault: FaultType,
    address: VirtualAddress,
) -> Result<Resolution, VmError> {
    let page = address.page_base();
    trace!("vm: {fault:?} fault at {address:?}");

    if fault == FaultType::ReadOnly {
        return Err(VmError::InvalidArgument);
    }

    let aspace = process
        .and_then(|p| p.address_space())
        .ok_or(VmError::HardFault)?;
    aspace.check_geometry();

    let frame = aspace.translate(page).map_err(|_| VmError::SegmentationFault(address))?;
    Ok(Resolution {
        page,
        frame,
        writable: aspace.is_writable(page),
    })
}

/// Fault entry point taking the raw fault code.
///
/// # Errors
/// [`VmError::InvalidArgument`] for unknown codes, otherwise as
/// [`Cpu::handle_fault`].
pub fn vm_fault<P: Process + ?Sized, T: Tlb, I: InterruptLevel>(
    cpu: &mut Cpu<T, I>,
    process: Option<&P>,
    fault_type: i32,
    address: VirtualAddress,
) -> Result<(), VmError> {
    let fault = FaultType::try_from(fault_type)?;
    cpu.handle_fault(process, fault, address)
}
