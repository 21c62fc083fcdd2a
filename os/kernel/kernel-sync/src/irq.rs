use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Interrupt priority level.
///
/// Only two levels matter to the memory layer: everything enabled
/// ([`Ipl::NONE`]) and everything masked ([`Ipl::HIGH`]).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ipl(u8);

impl Ipl {
    /// All interrupts enabled.
    pub const NONE: Self = Self(0);

    /// All interrupts masked.
    pub const HIGH: Self = Self(15);

    #[inline]
    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

/// Interrupt priority control of one execution unit.
///
/// `splhigh` masks all interrupts and `splx` restores a level previously
/// returned by `splhigh`; both return the level that was active before the
/// call. Implementations take `&self` because the level is per-CPU state that
/// is read and written from the CPU itself.
pub trait InterruptLevel {
    /// Raise to [`Ipl::HIGH`], returning the previous level.
    fn splhigh(&self) -> Ipl;

    /// Set the level to `level`, returning the previous level.
    fn splx(&self, level: Ipl) -> Ipl;
}

impl<T: InterruptLevel + ?Sized> InterruptLevel for &T {
    #[inline]
    fn splhigh(&self) -> Ipl {
        (**self).splhigh()
    }

    #[inline]
    fn splx(&self, level: Ipl) -> Ipl {
        (**self).splx(level)
    }
}

/// RAII guard that masks interrupts on creation and restores them on drop.
///
/// The guard remembers the level that was active when it was created, so
/// nested guards unwind correctly: only the outermost drop re-enables
/// interrupts.
///
/// # Examples
///
/// ```
/// use kernel_sync::{InterruptLevel, Ipl, IrqGuard, SoftInterrupts};
///
/// let cpu = SoftInterrupts::new();
/// {
///     let _g = IrqGuard::new(&cpu);
///     assert_eq!(cpu.current(), Ipl::HIGH);
/// }
/// assert_eq!(cpu.current(), Ipl::NONE);
/// ```
#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct IrqGuard<'a, I: InterruptLevel + ?Sized> {
    level: &'a I,
    previous: Ipl,
}

impl<'a, I: InterruptLevel + ?Sized> IrqGuard<'a, I> {
    #[inline]
    pub fn new(level: &'a I) -> Self {
        let previous = level.splhigh();
        Self { level, previous }
    }

    /// The level that will be restored on drop.
    #[inline]
    #[must_use]
    pub const fn previous(&self) -> Ipl {
        self.previous
    }
}

impl<I: InterruptLevel + ?Sized> Drop for IrqGuard<'_, I> {
    fn drop(&mut self) {
        self.level.splx(self.previous);
    }
}

/// Software model of a single CPU's interrupt priority level.
///
/// Used wherever there is no real status register to poke: hosted builds and
/// tests. Every `splhigh` call is counted so callers can verify that a
/// critical section actually ran with interrupts masked.
#[derive(Debug, Default)]
pub struct SoftInterrupts {
    level: AtomicU8,
    raises: AtomicUsize,
}

impl SoftInterrupts {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: AtomicU8::new(Ipl::NONE.0),
            raises: AtomicUsize::new(0),
        }
    }

    /// Currently active level.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Ipl {
        Ipl(self.level.load(Ordering::Acquire))
    }

    /// Number of `splhigh` calls so far.
    #[inline]
    #[must_use]
    pub fn raises(&self) -> usize {
        self.raises.load(Ordering::Relaxed)
    }
}

impl InterruptLevel for SoftInterrupts {
    fn splhigh(&self) -> Ipl {
        self.raises.fetch_add(1, Ordering::Relaxed);
        Ipl(self.level.swap(Ipl::HIGH.0, Ordering::AcqRel))
    }

    fn splx(&self, level: Ipl) -> Ipl {
        Ipl(self.level.swap(level.0, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splhigh_returns_previous_and_counts() {
        let cpu = SoftInterrupts::new();
        assert_eq!(cpu.splhigh(), Ipl::NONE);
        assert_eq!(cpu.splhigh(), Ipl::HIGH);
        assert_eq!(cpu.raises(), 2);
        assert_eq!(cpu.splx(Ipl::NONE), Ipl::HIGH);
        assert_eq!(cpu.current(), Ipl::NONE);
    }

    #[test]
    fn nested_guards_restore_outer_level() {
        let cpu = SoftInterrupts::new();
        {
            let outer = IrqGuard::new(&cpu);
            assert_eq!(outer.previous(), Ipl::NONE);
            {
                let inner = IrqGuard::new(&cpu);
                assert_eq!(inner.previous(), Ipl::HIGH);
            }
            // inner drop must not re-enable
            assert_eq!(cpu.current(), Ipl::HIGH);
        }
        assert_eq!(cpu.current(), Ipl::NONE);
        assert_eq!(cpu.raises(), 2);
    }

    #[test]
    fn guard_works_through_trait_objects() {
        let cpu = SoftInterrupts::new();
        let dyn_cpu: &dyn InterruptLevel = &cpu;
        {
            let _g = IrqGuard::new(dyn_cpu);
            assert_eq!(cpu.current(), Ipl::HIGH);
        }
        assert_eq!(cpu.current(), Ipl::NONE);
    }
}
