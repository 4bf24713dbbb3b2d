//! BEARS-TP's reliable-delivery core: wire framing, checksums, chunking,
//! and the sender/receiver state machines, generic over a [`Transport`]
//! so the protocol logic never touches a socket directly.

pub mod checksum;
pub mod chunker;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod transport;

/// Default UDP port both binaries listen on / send to when not overridden.
pub const DEFAULT_PORT: u16 = 33122;

/// Default idle timeout before the receiver evicts a connection, and
/// before the sender gives up waiting for an ack and resends its window.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
