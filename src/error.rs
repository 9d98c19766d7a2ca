//! Engine failure taxonomy: capability, message, protocol, wrong-state, malformed addressing.

use crate::info::describe_param_info;

/// All failure modes the engine reports. Closed so callers can match exhaustively.
///
/// `Message` and `Protocol` together form the protocol/transport mode: `Message`
/// carries the 16-bit info code a driver primitive returned, `Protocol` covers
/// inbound traffic the engine cannot make sense of (unknown kind, truncation).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The installed hardware or the given parameters cannot satisfy the request.
    /// Never retried automatically.
    #[error("capability error: {0}")]
    Capability(String),
    /// A driver primitive returned a non-zero info code.
    #[error("{operation} failed: {} ({info:#06x})", describe_param_info(*info))]
    Message { operation: &'static str, info: u16 },
    /// An inbound message violated the protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// A request was made against a connection whose state does not permit it.
    /// Raised by the connection collaborator, surfaced unchanged.
    #[error("wrong connection state: {0}")]
    WrongState(String),
    /// An inbound message referenced an identifier that resolves to no registry
    /// entry and does not match the new-offer pattern.
    #[error("{command:#04x}/{subcommand:#04x} addresses unknown connection {address:#010x}")]
    MalformedAddressing {
        command: u8,
        subcommand: u8,
        address: u32,
    },
}
