use crate::port;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log::Log` implementation writing to the QEMU debug port.
///
/// Filtering follows the global [`log::max_level`], set by [`init`].
pub struct QemuLogger;

static LOGGER: QemuLogger = QemuLogger;

/// Install the logger and set the maximum level. Call once during early init.
///
/// # Errors
/// [`SetLoggerError`] if a logger was already installed.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        port::write(format_args!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}
