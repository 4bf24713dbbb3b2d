//! Tracks one [`Connection`] per sending peer, created on `start` and
//! evicted once idle past a timeout (spec §4.6).

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use log::info;

use super::connection::Connection;

/// Opens the byte sink a new connection should write into, given the
/// UTF-8-ish basename carried in the peer's `start` chunk. Implemented by
/// the binary (as `File::create`) and by tests (as an in-memory map).
pub trait SinkFactory {
	type Sink: Write;

	fn open(&mut self, basename: &[u8]) -> io::Result<Self::Sink>;
}

pub struct ConnectionTable<F: SinkFactory> {
	connections: HashMap<SocketAddr, Connection<F::Sink>>,
	factory: F,
	idle_timeout: Duration,
}

impl<F: SinkFactory> ConnectionTable<F> {
	pub fn new(factory: F, idle_timeout: Duration) -> Self {
		Self { connections: HashMap::new(), factory, idle_timeout }
	}

	/// Handles a `start` chunk. Opens a sink and creates the connection for
	/// `peer` only if none exists yet (spec §4.6 step 3: "if the type is
	/// `start` and no entry exists"). A `start` from a peer that already has
	/// an open connection — a duplicated or delayed-then-reordered
	/// datagram — never reopens the sink or rewinds `expected_offset`;
	/// instead it flows through the existing connection's `observe` exactly
	/// like a `data`/`end` chunk would (spec §4.6 step 4), so it lands as a
	/// no-op once the connection has made any real progress.
	pub fn start(&mut self, peer: SocketAddr, basename: &[u8], seqno: u32, now: Instant) -> io::Result<u32> {
		let is_new = !self.connections.contains_key(&peer);

		if is_new {
			let sink = self.factory.open(basename)?;
			info!("new transfer from {peer} -> {}", String::from_utf8_lossy(basename));
			self.connections.insert(peer, Connection::new(sink, seqno, now));
		}

		let conn = self.connections.get_mut(&peer).expect("just inserted above, or already present");
		let (ack, drained) = conn.observe(seqno, basename, now);

		if is_new {
			// The start chunk's own payload is the basename, not file
			// content, even though `observe` just drained it.
			return Ok(ack);
		}

		for chunk in drained {
			conn.record(&chunk)?;
		}

		Ok(ack)
	}

	/// Feeds a `data` or `end` chunk to the connection already open for
	/// `peer`, writing any newly contiguous bytes through to its sink.
	/// Returns `None` if no `start` has been seen for this peer yet,
	/// meaning the chunk is dropped per spec §4.6.
	pub fn accept(&mut self, peer: SocketAddr, seqno: u32, bytes: &[u8], now: Instant) -> Option<io::Result<u32>> {
		let conn = self.connections.get_mut(&peer)?;
		let (ack, drained) = conn.observe(seqno, bytes, now);

		for chunk in drained {
			if let Err(e) = conn.record(&chunk) {
				return Some(Err(e));
			}
		}

		Some(Ok(ack))
	}

	/// Evicts and flushes every connection idle longer than the configured
	/// timeout. Called periodically by the receiver run loop.
	pub fn sweep_idle(&mut self, now: Instant) {
		let stale: Vec<SocketAddr> = self
			.connections
			.iter()
			.filter(|(_, conn)| now.duration_since(conn.last_activity) >= self.idle_timeout)
			.map(|(addr, _)| *addr)
			.collect();

		for addr in stale {
			if let Some(mut conn) = self.connections.remove(&addr) {
				let _ = conn.flush();
				info!("evicted idle connection from {addr}");
			}
		}
	}

	pub fn len(&self) -> usize {
		self.connections.len()
	}

	pub fn is_empty(&self) -> bool {
		self.connections.is_empty()
	}
}
