use kernel_memory_addresses::VirtualAddress;

/// Function not implemented.
pub const ENOSYS: i32 = 1;
/// Unimplemented feature.
pub const EUNIMP: i32 = 2;
/// Out of memory.
pub const ENOMEM: i32 = 3;
/// Bad memory reference.
pub const EFAULT: i32 = 6;
/// Invalid argument.
pub const EINVAL: i32 = 8;

/// Errors reported by the memory layer.
///
/// Kernel invariant violations (corrupted address-space geometry, a second
/// bootstrap, a TLB shootdown) are not errors; they panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("translation fault without a current address space")]
    HardFault,
    #[error("segmentation fault at {0}")]
    SegmentationFault(VirtualAddress),
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}

impl VmError {
    /// The errno handed back to user space.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::OutOfMemory => ENOMEM,
            Self::InvalidArgument => EINVAL,
            Self::HardFault | Self::SegmentationFault(_) => EFAULT,
            Self::Unimplemented(_) => EUNIMP,
        }
    }

    /// Whether the faulting context cannot be recovered (a fault taken with
    /// no process to blame).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::HardFault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(VmError::OutOfMemory.errno(), ENOMEM);
        assert_eq!(VmError::InvalidArgument.errno(), EINVAL);
        assert_eq!(VmError::HardFault.errno(), EFAULT);
        assert_eq!(
            VmError::SegmentationFault(VirtualAddress::new(0x1000)).errno(),
            EFAULT
        );
        assert_eq!(VmError::Unimplemented("too many regions").errno(), EUNIMP);
    }

    #[test]
    fn only_hard_faults_are_fatal() {
        assert!(VmError::HardFault.is_fatal());
        assert!(!VmError::SegmentationFault(VirtualAddress::zero()).is_fatal());
        assert!(!VmError::OutOfMemory.is_fatal());
    }

    #[test]
    fn display_includes_the_address() {
        let e = VmError::SegmentationFault(VirtualAddress::new(0x0040_0000));
        assert_eq!(e.to_string(), "segmentation fault at 0x00400000");
    }
}
