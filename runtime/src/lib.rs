pub mod logger;
mod rt;

pub use rt::{install_shutdown_signal, ShutdownFlag};

use log::LevelFilter;
use logger::Logger;

static LOGGER: Logger = Logger;

/// Install the colored stderr logger and set the level from `-d`/`--debug`.
pub fn init_logging(debug: bool) {
	log::set_logger(&LOGGER).expect("logger installed exactly once per process");
	log::set_max_level(if debug { LevelFilter::Debug } else { LevelFilter::Info });
}
