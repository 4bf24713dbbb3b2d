//! Wire framing: `TYPE|SEQ|DATA|CHECKSUM`.
//!
//! `DATA` is opaque and may itself contain pipe bytes; decoding never
//! escapes them. Instead it exploits the fixed positions of `TYPE`, `SEQ`
//! and `CHECKSUM` (first, second, and last pipe-delimited field) and
//! rejoins whatever sits between them.

use crate::checksum;

/// One of the four message types on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
	Start,
	Data,
	End,
	Ack,
}

impl MsgType {
	fn as_bytes(self) -> &'static [u8] {
		match self {
			MsgType::Start => b"start",
			MsgType::Data => b"data",
			MsgType::End => b"end",
			MsgType::Ack => b"ack",
		}
	}

	fn parse(bytes: &[u8]) -> Option<Self> {
		match bytes {
			b"start" => Some(MsgType::Start),
			b"data" => Some(MsgType::Data),
			b"end" => Some(MsgType::End),
			b"ack" => Some(MsgType::Ack),
			_ => None,
		}
	}
}

/// Reasons decoding a frame can fail. Every variant means "drop the frame
/// silently" at the call site (see `spec` §7) — none of these propagate as
/// a fatal error.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
	#[error("frame too short to contain a checksum trailer")]
	TooShort,
	#[error("fewer than 3 pipe-delimited fields")]
	Malformed,
	#[error("unrecognized message type")]
	UnknownType,
	#[error("seqno is not a valid u32 decimal")]
	BadSeqno,
}

/// In-memory form of one wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
	pub msg_type: MsgType,
	pub seqno: u32,
	pub payload: Vec<u8>,
	/// Whether the frame's checksum trailer validated against its body.
	/// Always `true` for packets built with [`Packet::new`] for sending.
	pub checksum_ok: bool,
}

impl Packet {
	pub fn new(msg_type: MsgType, seqno: u32, payload: Vec<u8>) -> Self {
		Self { msg_type, seqno, payload, checksum_ok: true }
	}

	/// Encodes this packet as a wire frame, appending a freshly computed
	/// checksum. Ignores `self.checksum_ok`, which only has meaning for
	/// packets obtained from [`Packet::decode`].
	pub fn encode(&self) -> Vec<u8> {
		let mut body = Vec::with_capacity(self.payload.len() + 32);

		body.extend_from_slice(self.msg_type.as_bytes());
		body.push(b'|');
		body.extend_from_slice(self.seqno.to_string().as_bytes());
		body.push(b'|');
		body.extend_from_slice(&self.payload);
		body.push(b'|');

		let ck = checksum::generate(&body);
		body.extend_from_slice(&ck);

		body
	}

	/// Decodes a wire frame. The checksum is validated as part of
	/// decoding and reported via `checksum_ok` rather than as an `Err`,
	/// since a checksum failure and a successfully-parsed-but-wrong frame
	/// both mean "drop it" but are logged differently (see `proto::receiver`
	/// and `proto::sender`).
	pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
		if frame.len() < checksum::TRAILER_LEN {
			return Err(DecodeError::TooShort);
		}

		let checksum_ok = checksum::verify(frame);

		let fields: Vec<&[u8]> = frame.split(|&b| b == b'|').collect();

		if fields.len() < 3 {
			return Err(DecodeError::Malformed);
		}

		let msg_type = MsgType::parse(fields[0]).ok_or(DecodeError::UnknownType)?;

		let seqno_str = std::str::from_utf8(fields[1]).map_err(|_| DecodeError::BadSeqno)?;
		let seqno: u32 = seqno_str.parse().map_err(|_| DecodeError::BadSeqno)?;

		let payload = fields[2..fields.len() - 1].join(&b'|');

		Ok(Self { msg_type, seqno, payload, checksum_ok })
	}
}
