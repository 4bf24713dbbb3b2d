//! Small error-handling helpers shared by `proto` and the two binaries.
//!
//! Failures that are expected and non-fatal (corrupt frame, unknown peer,
//! ...) are logged and downgraded to `None` at the boundary, so callers never
//! have to unwind an `Err` for something the protocol defines as "drop
//! silently".

use std::fmt::Display;
use std::io;
use std::path::PathBuf;

/// Converts a `Result` into an `Option`, logging the error at `warn` level
/// and discarding it. Use at the edge of a loop iteration for failures the
/// protocol says to absorb rather than propagate.
pub trait LogErr<T> {
	fn log_err(self, context: &str) -> Option<T>;
}

impl<T, E: Display> LogErr<T> for Result<T, E> {
	fn log_err(self, context: &str) -> Option<T> {
		match self {
			Ok(v) => Some(v),
			Err(e) => {
				log::warn!("{context}: {e}");
				None
			}
		}
	}
}

/// Failures that are not recoverable within a single loop iteration and
/// should terminate the binary with a non-zero exit code.
#[derive(thiserror::Error, Debug)]
pub enum FatalError {
	#[error("failed to bind UDP socket on {addr}: {source}")]
	Bind { addr: String, source: io::Error },

	#[error("failed to open {path}: {source}")]
	OpenFile { path: PathBuf, source: io::Error },

	#[error("failed to install Ctrl-C handler: {0}")]
	Signal(#[source] ctrlc::Error),

	#[error("socket I/O error: {0}")]
	Io(#[from] io::Error),
}
