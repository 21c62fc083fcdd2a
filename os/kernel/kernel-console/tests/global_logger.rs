use kernel_console::{ConsoleLogger, ConsoleSink};
use log::LevelFilter;
use std::sync::Mutex;

struct Capture(Mutex<Vec<u8>>);

impl ConsoleSink for Capture {
    fn putch(&self, byte: u8) {
        self.0.lock().unwrap().push(byte);
    }
}

static LOGGER: ConsoleLogger<Capture> =
    ConsoleLogger::new(Capture(Mutex::new(Vec::new())), LevelFilter::Debug);

#[test]
fn installed_logger_receives_facade_records_once() {
    LOGGER.init().expect("first install succeeds");
    assert!(LOGGER.init().is_err(), "second install must be rejected");
    assert_eq!(log::max_level(), LevelFilter::Debug);

    log::debug!(target: "vm", "acquired {} frames at {:#x}", 3, 0x1_0000);
    log::trace!(target: "vm", "filtered out");

    let text = String::from_utf8(LOGGER.sink().0.lock().unwrap().clone()).unwrap();
    assert_eq!(text, "[DEBUG] vm: acquired 3 frames at 0x10000\n");
}
