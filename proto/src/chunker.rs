//! Presents a byte source as the ordered sequence of chunks a
//! [`SenderSession`](crate::sender::SenderSession) feeds into its window:
//! one `start` chunk naming the file, fixed-size `data` chunks, and a
//! terminal empty `end` chunk.

use std::io::{self, Read, Seek, SeekFrom};

/// Maximum payload bytes per `data` chunk. Chosen so the full wire frame
/// (type + seqno + data + pipes + checksum) fits under the 1472-byte
/// datagram budget in §6.
pub const CHUNK: usize = 1458;

/// One unit handed to the sender's window. The `seqno` is always a byte
/// offset, continuing the arithmetic described in spec §4.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
	/// The session-opening chunk; `payload` is the UTF-8 basename.
	Start { seqno: u32, payload: Vec<u8> },
	/// A chunk of up to [`CHUNK`] file bytes.
	Data { seqno: u32, payload: Vec<u8> },
	/// The terminal empty-payload marker; ends the sequence.
	End { seqno: u32 },
}

impl Chunk {
	pub fn seqno(&self) -> u32 {
		match *self {
			Chunk::Start { seqno, .. } | Chunk::Data { seqno, .. } | Chunk::End { seqno } => seqno,
		}
	}

	pub fn payload(&self) -> &[u8] {
		match self {
			Chunk::Start { payload, .. } | Chunk::Data { payload, .. } => payload,
			Chunk::End { .. } => &[],
		}
	}
}

/// A lazy, finite, restartable sequence of [`Chunk`]s over a `Read + Seek`
/// byte source.
pub struct Chunker<R> {
	source: R,
	basename: Vec<u8>,
	initial_seqno: u32,
	next_seqno: u32,
	emitted_start: bool,
	emitted_end: bool,
}

impl<R: Read + Seek> Chunker<R> {
	pub fn new(source: R, basename: impl Into<Vec<u8>>, initial_seqno: u32) -> Self {
		Self {
			source,
			basename: basename.into(),
			initial_seqno,
			next_seqno: initial_seqno,
			emitted_start: false,
			emitted_end: false,
		}
	}

	/// Reseeks the source to the start and resets all bookkeeping so the
	/// chunk sequence can be produced again from the top.
	pub fn restart(&mut self) -> io::Result<()> {
		self.source.seek(SeekFrom::Start(0))?;
		self.next_seqno = self.initial_seqno;
		self.emitted_start = false;
		self.emitted_end = false;
		Ok(())
	}

	/// Produces the next chunk, or `None` once the terminal `end` chunk
	/// has already been emitted.
	pub fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
		if !self.emitted_start {
			self.emitted_start = true;
			let seqno = self.next_seqno;
			let payload = self.basename.clone();
			self.next_seqno += payload.len() as u32;
			return Ok(Some(Chunk::Start { seqno, payload }));
		}

		if self.emitted_end {
			return Ok(None);
		}

		let seqno = self.next_seqno;
		let payload = read_up_to(&mut self.source, CHUNK)?;

		if payload.is_empty() {
			self.emitted_end = true;
			return Ok(Some(Chunk::End { seqno }));
		}

		self.next_seqno += payload.len() as u32;
		Ok(Some(Chunk::Data { seqno, payload }))
	}
}

/// Reads up to `limit` bytes, looping over short reads, stopping at EOF.
fn read_up_to(source: &mut impl Read, limit: usize) -> io::Result<Vec<u8>> {
	let mut buf = vec![0u8; limit];
	let mut filled = 0;

	while filled < limit {
		let n = source.read(&mut buf[filled..])?;
		if n == 0 {
			break;
		}
		filled += n;
	}

	buf.truncate(filled);
	Ok(buf)
}
