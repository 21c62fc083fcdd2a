use core::fmt::{self, Write};

/// A byte-oriented console device.
///
/// `putch` takes `&self` because the console is shared by every CPU and by
/// the logger; implementations serialize internally if they need to.
pub trait ConsoleSink {
    fn putch(&self, byte: u8);

    /// Write a whole string. The default forwards byte by byte.
    #[inline]
    fn puts(&self, s: &str) {
        for b in s.bytes() {
            self.putch(b);
        }
    }
}

impl<S: ConsoleSink + ?Sized> ConsoleSink for &S {
    #[inline]
    fn putch(&self, byte: u8) {
        (**self).putch(byte);
    }

    #[inline]
    fn puts(&self, s: &str) {
        (**self).puts(s);
    }
}

/// `core::fmt::Write` adapter over a [`ConsoleSink`].
pub struct SinkWriter<'a, S: ConsoleSink + ?Sized>(pub &'a S);

impl<S: ConsoleSink + ?Sized> Write for SinkWriter<'_, S> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.puts(s);
        Ok(())
    }

    #[inline]
    fn write_char(&mut self, c: char) -> fmt::Result {
        // UTF-8 encode without allocation.
        let mut buf = [0u8; 4];
        let s = c.encode_utf8(&mut buf);
        self.write_str(s)
    }
}

/// Backend of [`kprintf!`](crate::kprintf).
#[doc(hidden)]
#[inline]
pub fn console_write<S: ConsoleSink + ?Sized>(sink: &S, args: fmt::Arguments<'_>) {
    // Ignore errors; console output is best effort.
    let _ = fmt::write(&mut SinkWriter(sink), args);
}
