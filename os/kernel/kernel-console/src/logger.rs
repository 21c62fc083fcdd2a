use crate::kprintf;
use crate::sink::ConsoleSink;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log::Log` implementation writing to a [`ConsoleSink`].
pub struct ConsoleLogger<S: ConsoleSink> {
    sink: S,
    max_level: LevelFilter,
}

impl<S: ConsoleSink> ConsoleLogger<S> {
    #[must_use]
    pub const fn new(sink: S, max_level: LevelFilter) -> Self {
        Self { sink, max_level }
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub const fn max_level(&self) -> LevelFilter {
        self.max_level
    }
}

impl<S: ConsoleSink + Send + Sync> ConsoleLogger<S> {
    /// Install this logger as the global `log` backend.
    ///
    /// Call this once during early init; the logger must live in a `static`.
    ///
    /// # Errors
    /// Fails if a global logger was already installed.
    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

impl<S: ConsoleSink + Send + Sync> Log for ConsoleLogger<S> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        kprintf!(
            &self.sink,
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        // console writes are unbuffered
    }
}
