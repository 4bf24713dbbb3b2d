//! The receiver side: dispatches incoming frames to per-peer
//! [`Connection`]s and acks every one it can parse (spec §4.5/§4.6).

mod connection;
mod table;

pub use connection::{Connection, MAX_BUF};
pub use table::{ConnectionTable, SinkFactory};

use std::time::{Duration, Instant};

use log::{debug, warn};
use util::LogErr;

use crate::packet::{DecodeError, MsgType, Packet};
use crate::transport::Transport;

/// How often the run loop checks for idle connections to evict, between
/// blocking receives.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Runs the receive loop against `transport` until `should_stop` reports
/// true between iterations. Every well-formed, checksum-valid frame gets
/// exactly one ack sent back to its sender address; anything else is
/// dropped silently, matching the sender's own "ignore, let the timeout
/// handle it" posture.
pub fn run<F: SinkFactory>(
	transport: &mut impl Transport,
	table: &mut ConnectionTable<F>,
	mut should_stop: impl FnMut() -> bool,
) -> std::io::Result<()> {
	let mut last_sweep = Instant::now();

	while !should_stop() {
		match transport.recv_timeout(SWEEP_INTERVAL)? {
			None => {}
			Some((frame, from)) => {
				if let Some(ack) = handle_frame(table, &frame, from)? {
					let reply = Packet::new(MsgType::Ack, ack, Vec::new());
					transport.send_to(&reply.encode(), from)?;
				}
			}
		}

		let now = Instant::now();
		if now.duration_since(last_sweep) >= SWEEP_INTERVAL {
			table.sweep_idle(now);
			last_sweep = now;
		}
	}

	Ok(())
}

/// Decodes and dispatches one frame, returning the ack offset to send
/// back, if any.
fn handle_frame<F: SinkFactory>(
	table: &mut ConnectionTable<F>,
	frame: &[u8],
	from: std::net::SocketAddr,
) -> std::io::Result<Option<u32>> {
	let decoded = match Packet::decode(frame) {
		Err(DecodeError::TooShort) => {
			warn!("dropped undersized frame from {from}");
			return Ok(None);
		}
		other => other.log_err(&format!("dropping unparseable frame from {from}")),
	};

	let Some(packet) = decoded else {
		return Ok(None);
	};

	if !packet.checksum_ok {
		warn!("dropped frame from {from} with bad checksum");
		return Ok(None);
	}

	let now = Instant::now();

	match packet.msg_type {
		MsgType::Start => Ok(Some(table.start(from, &packet.payload, packet.seqno, now)?)),
		MsgType::Data | MsgType::End => match table.accept(from, packet.seqno, &packet.payload, now) {
			Some(ack) => Ok(Some(ack?)),
			None => {
				debug!("dropped {:?} from {from} with no open connection", packet.msg_type);
				Ok(None)
			}
		},
		MsgType::Ack => {
			debug!("ignoring stray ack from {from}");
			Ok(None)
		}
	}
}
