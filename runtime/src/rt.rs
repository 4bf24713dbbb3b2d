use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag flipped by the Ctrl-C handler; event loops poll it once per
/// iteration and break cleanly rather than unwinding through a signal.
#[derive(Clone)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
	pub fn requested(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

/// Install the process-wide Ctrl-C handler and return a flag the caller's
/// loop can check after each blocking receive.
///
/// Only one handler may be installed per process; calling this twice
/// returns an error from the second call.
pub fn install_shutdown_signal() -> Result<ShutdownFlag, ctrlc::Error> {
	let flag = Arc::new(AtomicBool::new(false));
	let signalled = flag.clone();

	ctrlc::set_handler(move || signalled.store(true, Ordering::Relaxed))?;

	Ok(ShutdownFlag(flag))
}
