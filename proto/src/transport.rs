//! The "unreliable datagram transport" collaborator the core is generic
//! over — an opaque send, and a blocking receive bounded by a timeout.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// What the core needs from a datagram socket. `std::net::UdpSocket`
/// implements a concrete instance ([`UdpTransport`]); tests implement a
/// channel-backed fake instead of binding real sockets.
pub trait Transport {
	fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> io::Result<()>;

	/// Blocks for up to `timeout` waiting for one datagram. Returns
	/// `Ok(None)` on timeout, never on a genuine I/O failure.
	fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>>;
}

/// Largest datagram the core will ever read or write, per the MTU budget
/// in spec §6.
const DATAGRAM_CAP: usize = 1472;

/// A [`Transport`] backed by a real OS UDP socket.
pub struct UdpTransport {
	socket: UdpSocket,
}

impl UdpTransport {
	pub fn bind(addr: SocketAddr) -> io::Result<Self> {
		let socket = UdpSocket::bind(addr)?;
		Ok(Self { socket })
	}

	/// Wraps an already-bound socket, for callers that need control over
	/// how the bind happens (e.g. binding to an ephemeral port via a
	/// string address rather than a parsed [`SocketAddr`]).
	pub fn from_socket(socket: UdpSocket) -> Self {
		Self { socket }
	}

	pub fn local_addr(&self) -> io::Result<SocketAddr> {
		self.socket.local_addr()
	}
}

impl Transport for UdpTransport {
	fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> io::Result<()> {
		self.socket.send_to(buf, addr)?;
		Ok(())
	}

	fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
		self.socket.set_read_timeout(Some(timeout))?;

		let mut buf = vec![0u8; DATAGRAM_CAP];

		match self.socket.recv_from(&mut buf) {
			Ok((n, from)) => {
				buf.truncate(n);
				Ok(Some((buf, from)))
			}
			Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => Ok(None),
			Err(e) => Err(e),
		}
	}
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
	//! An in-process [`Transport`] double for deterministic protocol
	//! tests, backed by plain `VecDeque`s rather than real sockets.

	use super::*;
	use std::collections::VecDeque;

	#[derive(Default)]
	pub struct FakeTransport {
		pub inbox: VecDeque<(Vec<u8>, SocketAddr)>,
		pub sent: Vec<(Vec<u8>, SocketAddr)>,
		/// When true, the next `recv_timeout` call reports a timeout
		/// instead of draining `inbox`, modeling a dropped datagram.
		pub drop_next: bool,
	}

	impl Transport for FakeTransport {
		fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> io::Result<()> {
			self.sent.push((buf.to_vec(), addr));
			Ok(())
		}

		fn recv_timeout(&mut self, _timeout: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
			if self.drop_next {
				self.drop_next = false;
				self.inbox.pop_front();
				return Ok(None);
			}

			Ok(self.inbox.pop_front())
		}
	}
}
