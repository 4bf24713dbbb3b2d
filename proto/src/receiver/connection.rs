//! Per-peer reassembly state (spec §4.5/§4.6).

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Instant;

/// Maximum number of chunks held in the reorder buffer before further
/// acceptance is refused. This bound is checked but never meaningfully
/// exercised: a chunk only ever enters the buffer when its `seqno` already
/// equals `expected_offset`, so it drains in the same call it was inserted
/// in (see `DESIGN.md`).
pub const MAX_BUF: usize = 5;

/// Tracks one in-progress transfer from a single peer address.
pub struct Connection<W> {
	pub expected_offset: u32,
	pub last_activity: Instant,
	buffer: BTreeMap<u32, Vec<u8>>,
	sink: W,
}

impl<W: Write> Connection<W> {
	/// `start_offset` is the `seqno` carried by the peer's `start` chunk
	/// itself (not that seqno plus the basename length) — `expected_offset`
	/// only advances once [`Connection::observe`] processes that chunk.
	pub fn new(sink: W, start_offset: u32, now: Instant) -> Self {
		Self { expected_offset: start_offset, last_activity: now, buffer: BTreeMap::new(), sink }
	}

	/// Accepts or rejects one chunk at `seqno` carrying `bytes`, per spec
	/// §4.5. Returns the ack offset to send and any newly contiguous
	/// chunks that became writable, in ascending order; the caller decides
	/// whether those bytes should actually reach the sink (the `start`
	/// chunk's basename payload never does — see
	/// [`ConnectionTable::start`](super::ConnectionTable::start)).
	///
	/// The ack formula is `expected_offset (after this call) - len(bytes)`
	/// — which equals `seqno` on a genuine in-order accept, but can land on
	/// an unrelated value for a rejected chunk. That mismatch is intentional
	/// (see `DESIGN.md`), not a bug to paper over.
	pub fn observe(&mut self, seqno: u32, bytes: &[u8], now: Instant) -> (u32, Vec<Vec<u8>>) {
		self.last_activity = now;
		let mut drained = Vec::new();

		if seqno == self.expected_offset && self.buffer.len() < MAX_BUF {
			self.buffer.insert(seqno, bytes.to_vec());

			while let Some((&offset, _)) = self.buffer.iter().next() {
				if offset != self.expected_offset {
					break;
				}
				let chunk = self.buffer.remove(&offset).expect("key came from this map's own iterator");
				self.expected_offset = self.expected_offset.wrapping_add(chunk.len() as u32);
				drained.push(chunk);
			}
		}

		let ack = self.expected_offset.wrapping_sub(bytes.len() as u32);
		(ack, drained)
	}

	pub fn record(&mut self, bytes: &[u8]) -> io::Result<()> {
		self.sink.write_all(bytes)
	}

	pub fn flush(&mut self) -> io::Result<()> {
		self.sink.flush()
	}
}
