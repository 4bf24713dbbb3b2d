//! A 16-bit one's-complement checksum over a pipe-delimited frame body,
//! rendered as 4 lowercase hex characters.
//!
//! An RFC 1071-style accumulate-then-fold Internet checksum, but here the
//! trailer is textual rather than a packed binary word: [`generate`] hands
//! back the 4 ASCII hex bytes that [`packet`](crate::packet) appends
//! directly to the wire frame.

/// Length in bytes of the hex checksum trailer appended to every frame.
pub const TRAILER_LEN: usize = 4;

/// Computes the checksum trailer for `body` (the frame up to and including
/// its trailing pipe, per the wire format in `packet`).
pub fn generate(body: &[u8]) -> [u8; TRAILER_LEN] {
	let folded = fold(accumulate(body));
	let complemented = !folded;
	to_hex(complemented)
}

/// Verifies that `frame`'s last 4 bytes are the correct checksum of
/// `frame[..frame.len() - 4]`. Returns `false` (never panics) for frames
/// too short to contain a trailer.
pub fn verify(frame: &[u8]) -> bool {
	if frame.len() < TRAILER_LEN {
		return false;
	}

	let (body, trailer) = frame.split_at(frame.len() - TRAILER_LEN);
	generate(body) == trailer
}

/// Sums `body` as big-endian 16-bit words, padding an odd trailing byte
/// with zero for the purpose of summing only (the pad byte is never
/// transmitted).
fn accumulate(body: &[u8]) -> u32 {
	let mut sum: u32 = 0;
	let mut chunks = body.chunks_exact(2);

	for word in &mut chunks {
		sum += u16::from_be_bytes([word[0], word[1]]) as u32;
	}

	if let [last] = chunks.remainder() {
		sum += u16::from_be_bytes([*last, 0]) as u32;
	}

	sum
}

/// Folds carries out of the upper 16 bits until the sum fits in 16 bits.
fn fold(mut sum: u32) -> u16 {
	while sum >> 16 != 0 {
		sum = (sum & 0xFFFF) + (sum >> 16);
	}

	sum as u16
}

fn to_hex(value: u16) -> [u8; TRAILER_LEN] {
	let mut out = [0u8; TRAILER_LEN];
	let hex = b"0123456789abcdef";

	out[0] = hex[((value >> 12) & 0xF) as usize];
	out[1] = hex[((value >> 8) & 0xF) as usize];
	out[2] = hex[((value >> 4) & 0xF) as usize];
	out[3] = hex[(value & 0xF) as usize];

	out
}
