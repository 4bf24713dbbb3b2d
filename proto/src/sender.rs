//! The sender side's go-back-N sliding window state machine (spec §4.4).
//!
//! Drives a [`Chunker`] across a bounded window of in-flight slots. Each
//! loop iteration transmits whatever in the window hasn't been sent yet,
//! then blocks for one ack; a timeout or bad checksum clears every slot's
//! `sent` flag so the whole window goes out again next iteration.

use std::collections::VecDeque;
use std::io::{Read, Seek};
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, info, warn};
use util::LogErr;

use crate::chunker::Chunker;
use crate::packet::{DecodeError, MsgType, Packet};
use crate::transport::Transport;

/// Maximum number of unacknowledged chunks in flight at once.
pub const MAX_WIN: usize = 5;

/// How long to wait for an ack before resending the whole window.
pub const DEFAULT_RTIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
	/// Nothing acked yet; the window holds only the `start` slot.
	Init,
	/// `start` acked, data chunks flow until the chunker runs dry.
	Transfer,
	/// The `end` chunk is the window's sole remaining slot.
	Ending,
	/// `end` acked; the transfer is complete.
	Done,
}

/// One chunk currently occupying a window position.
struct WindowSlot {
	seqno: u32,
	bytes: Vec<u8>,
	sent: bool,
}

pub struct SenderConfig {
	pub window: usize,
	pub rtimeout: Duration,
}

impl Default for SenderConfig {
	fn default() -> Self {
		Self { window: MAX_WIN, rtimeout: DEFAULT_RTIMEOUT }
	}
}

/// Drives one file transfer to a single peer address.
pub struct SenderSession<R> {
	chunker: Chunker<R>,
	config: SenderConfig,
	peer: SocketAddr,
	window: VecDeque<WindowSlot>,
	state: SenderState,
	chunker_exhausted: bool,
}

impl<R: Read + Seek> SenderSession<R> {
	pub fn new(chunker: Chunker<R>, peer: SocketAddr, config: SenderConfig) -> Self {
		let mut session =
			Self { chunker, config, peer, window: VecDeque::new(), state: SenderState::Init, chunker_exhausted: false };
		session.prefill_start();
		session
	}

	pub fn state(&self) -> SenderState {
		self.state
	}

	/// Pulls the chunker's first (`start`) chunk into an otherwise-empty
	/// window. This happens once, at construction, before any ack — the
	/// window refill driven by acks only runs after the `start` slot has
	/// been removed.
	fn prefill_start(&mut self) {
		if let Ok(Some(chunk)) = self.chunker.next_chunk() {
			self.window.push_back(WindowSlot { seqno: chunk.seqno(), bytes: chunk.payload().to_vec(), sent: false });
		}
	}

	/// Runs the session to completion against `transport`, blocking on each
	/// receive up to the configured timeout. Returns once the transfer
	/// finishes, or early if `should_stop` reports true between iterations.
	pub fn run(&mut self, transport: &mut impl Transport, mut should_stop: impl FnMut() -> bool) -> std::io::Result<()> {
		while self.state != SenderState::Done {
			if should_stop() {
				info!("sender stopping early at seqno {:?}", self.window.front().map(|s| s.seqno));
				return Ok(());
			}

			self.transmit(transport)?;

			match transport.recv_timeout(self.config.rtimeout)? {
				None => {
					warn!("timed out waiting for ack, resending window of {} packet(s)", self.window.len());
					self.reset_sent_flags();
				}
				Some((frame, from)) => {
					if from != self.peer {
						debug!("ignoring datagram from unexpected peer {from}");
						continue;
					}
					self.handle_frame(&frame)?;
				}
			}
		}

		Ok(())
	}

	/// Sends this iteration's batch, per the per-state rule in spec §4.4(a).
	fn transmit(&mut self, transport: &mut impl Transport) -> std::io::Result<()> {
		match self.state {
			SenderState::Init => self.send_head(transport, MsgType::Start),
			SenderState::Ending => self.send_head(transport, MsgType::End),
			SenderState::Transfer => self.send_unsent_tail(transport),
			SenderState::Done => Ok(()),
		}
	}

	fn send_head(&mut self, transport: &mut impl Transport, msg_type: MsgType) -> std::io::Result<()> {
		if let Some(slot) = self.window.front_mut() {
			let packet = Packet::new(msg_type, slot.seqno, slot.bytes.clone());
			transport.send_to(&packet.encode(), self.peer)?;
			slot.sent = true;
		}
		Ok(())
	}

	/// Finds the first not-yet-sent slot and transmits it and every slot
	/// after it, marking each sent. If every slot is already sent, this
	/// iteration transmits nothing — progress waits on the next ack or
	/// timeout.
	fn send_unsent_tail(&mut self, transport: &mut impl Transport) -> std::io::Result<()> {
		let Some(start) = self.window.iter().position(|s| !s.sent) else {
			return Ok(());
		};

		for slot in self.window.iter_mut().skip(start) {
			let packet = Packet::new(MsgType::Data, slot.seqno, slot.bytes.clone());
			transport.send_to(&packet.encode(), self.peer)?;
			slot.sent = true;
		}
		Ok(())
	}

	fn reset_sent_flags(&mut self) {
		for slot in &mut self.window {
			slot.sent = false;
		}
	}

	/// Decodes one received frame and reacts to it, per the reset rules
	/// resolved in the design notes: a structurally too-short frame or a
	/// bad checksum resets the window same as a timeout; any other decode
	/// error, or a well-formed non-ack, is simply ignored.
	fn handle_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
		let decoded = match Packet::decode(frame) {
			Err(DecodeError::TooShort) => {
				warn!("dropped frame too short to carry a checksum, resending window");
				self.reset_sent_flags();
				return Ok(());
			}
			other => other.log_err("ignoring unparseable frame, well-formed checksum notwithstanding"),
		};

		let Some(packet) = decoded else {
			return Ok(());
		};

		if !packet.checksum_ok {
			warn!("dropped frame with bad checksum, resending window");
			self.reset_sent_flags();
			return Ok(());
		}

		if packet.msg_type != MsgType::Ack {
			debug!("ignoring non-ack frame of type {:?}", packet.msg_type);
			return Ok(());
		}

		self.handle_ack(packet.seqno)
	}

	/// Removes the head slot if its `seqno` matches `ack_seqno` and it has
	/// been sent at least once; acks to anything else are ignored (spec
	/// I5: strict in-order acknowledgement, by slot identity not offset
	/// coverage).
	fn handle_ack(&mut self, ack_seqno: u32) -> std::io::Result<()> {
		let head_matches = self.window.front().is_some_and(|s| s.sent && s.seqno == ack_seqno);

		if !head_matches {
			debug!("ignoring ack {ack_seqno} that doesn't match the window head");
			return Ok(());
		}

		self.window.pop_front();
		self.refill()
	}

	/// Pulls chunks from the chunker until the window is full or the
	/// chunker is exhausted, then applies the state transitions from spec
	/// §4.4's "Window refill" paragraph.
	fn refill(&mut self) -> std::io::Result<()> {
		while self.window.len() < self.config.window && !self.chunker_exhausted {
			match self.chunker.next_chunk()? {
				Some(chunk) => {
					self.window.push_back(WindowSlot { seqno: chunk.seqno(), bytes: chunk.payload().to_vec(), sent: false })
				}
				None => self.chunker_exhausted = true,
			}
		}

		if self.state == SenderState::Init {
			self.state = SenderState::Transfer;
			info!("start acked, entering transfer");
		}

		if self.chunker_exhausted && self.window.len() <= 1 && self.state == SenderState::Transfer {
			self.state = SenderState::Ending;
		}

		if self.state == SenderState::Ending && self.window.is_empty() {
			self.state = SenderState::Done;
			info!("end acked, transfer complete");
		}

		Ok(())
	}
}
