use crate::address_space::AddressSpace;

/// What the memory layer needs to know about the running process.
///
/// Process lifecycle lives elsewhere; the fault handler only asks for the
/// current address space. Kernel threads have none.
pub trait Process {
    fn address_space(&self) -> Option<&AddressSpace>;
}

impl Process for AddressSpace {
    fn address_space(&self) -> Option<&AddressSpace> {
        Some(self)
    }
}

impl Process for Option<AddressSpace> {
    fn address_space(&self) -> Option<&AddressSpace> {
        self.as_ref()
    }
}
