//! # Kernel Console Logging
//!
//! Routes the `log` facade to the kernel console (the device behind
//! `kprintf`). The memory layer never prints directly; it emits `log`
//! records and whoever boots the kernel decides where they end up.
//!
//! ## Output Mechanism
//! ```text
//! debug!/warn!/...
//!     ↓
//! ConsoleLogger (log::Log)
//!     ↓
//! SinkWriter (fmt::Write)
//!     ↓
//! ConsoleSink::putch() → console device
//! ```
//!
//! ## Core Components
//!
//! ### Console Sink ([`ConsoleSink`])
//! A byte-at-a-time output device. On hardware this is the serial console;
//! in tests it is a buffer that can be inspected afterwards.
//!
//! ### Console Logger ([`ConsoleLogger`])
//! A `log::Log` implementation that filters by level and formats every record
//! as `[LEVEL] target: message`, one line per record. It performs no
//! allocation, so it can be installed before the frame allocator is
//! bootstrapped.
//!
//! ### Formatted Output ([`kprintf!`])
//! Direct formatted output to a sink, bypassing the logging framework.
//!
//! ## Usage
//! ```rust,no_run
//! use kernel_console::{ConsoleLogger, ConsoleSink};
//! use log::{LevelFilter, info};
//!
//! struct Serial;
//!
//! impl ConsoleSink for Serial {
//!     fn putch(&self, byte: u8) {
//!         // write `byte` to the UART data register
//! #       let _ = byte;
//!     }
//! }
//!
//! static LOGGER: ConsoleLogger<Serial> = ConsoleLogger::new(Serial, LevelFilter::Debug);
//!
//! LOGGER.init().expect("logger installed twice");
//! info!("vm: bootstrap complete");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod logger;
mod sink;

pub use logger::ConsoleLogger;
pub use sink::{ConsoleSink, SinkWriter, console_write};

/// Formatted output straight to a [`ConsoleSink`].
///
/// ```rust
/// use core::cell::RefCell;
/// use kernel_console::{ConsoleSink, kprintf};
///
/// struct Buf(RefCell<Vec<u8>>);
/// impl ConsoleSink for Buf {
///     fn putch(&self, byte: u8) {
///         self.0.borrow_mut().push(byte);
///     }
/// }
///
/// let buf = Buf(RefCell::new(Vec::new()));
/// kprintf!(&buf, "{} pages at {:#x}\n", 12, 0x7fff_4000);
/// assert_eq!(buf.0.borrow().as_slice(), b"12 pages at 0x7fff4000\n");
/// ```
#[macro_export]
macro_rules! kprintf {
    ($sink:expr, $($arg:tt)*) => {{
        // No allocation: `format_args!` builds a lightweight `Arguments`.
        $crate::console_write($sink, core::format_args!($($arg)*));
    }};
}
