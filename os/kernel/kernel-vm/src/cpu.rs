use crate::error::VmError;
use crate::fault::{FaultType, resolve};
use crate::process::Process;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_sync::{InterruptLevel, IrqGuard};
use kernel_tlb::{Tlb, TlbEntry, invalidate_all};
use log::trace;

/// One execution unit: its TLB and its interrupt priority level.
#[derive(Debug)]
pub struct Cpu<T: Tlb, I: InterruptLevel> {
    tlb: T,
    interrupts: I,
}

impl<T: Tlb, I: InterruptLevel> Cpu<T, I> {
    #[must_use]
    pub const fn new(tlb: T, interrupts: I) -> Self {
        Self { tlb, interrupts }
    }

    #[must_use]
    pub const fn tlb(&self) -> &T {
        &self.tlb
    }

    #[must_use]
    pub const fn tlb_mut(&mut self) -> &mut T {
        &mut self.tlb
    }

    #[must_use]
    pub const fn interrupts(&self) -> &I {
        &self.interrupts
    }

    /// Invalidate every TLB slot with interrupts masked.
    pub fn invalidate_tlb(&mut self) {
        let _spl = IrqGuard::new(&self.interrupts);
        invalidate_all(&mut self.tlb);
    }

    /// Map `page` onto `frame`; returns the slot used.
    ///
    /// Takes the first invalid slot, else lets the TLB pick a victim.
    pub fn install(&mut self, page: VirtualAddress, frame: PhysicalAddress, writable: bool) -> usize {
        let entry = TlbEntry::mapping(page, frame, writable);
        let _spl = IrqGuard::new(&self.interrupts);

        let free = (0..self.tlb.slots()).find(|&slot| !self.tlb.read(slot).is_valid());
        let slot = match free {
            Some(slot) => {
                self.tlb.write(slot, entry);
                slot
            }
            None => self.tlb.write_random(entry),
        };
        trace!("vm: {page:?} -> {frame:?} in slot {slot} (writable: {writable})");
        slot
    }

    /// Resolve a translation fault and install the mapping.
    ///
    /// # Errors
    /// See [`resolve`]; the TLB is untouched on error.
    pub fn handle_fault<P: Process + ?Sized>(
        &mut self,
        process: Option<&P>,
        fault: FaultType,
        address: VirtualAddress,
    ) -> Result<(), VmError> {
        let r = resolve(process, fault, address)?;
        self.install(r.page, r.frame, r.writable);
        Ok(())
    }
}
