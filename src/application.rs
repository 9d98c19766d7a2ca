//! Application callback boundary: how the engine hands call-lifecycle events
//! to the embedding application.

use crate::registry::SharedHandler;

/// An inbound call offered by the network (CONNECT_IND), decoded for the
/// application. `msg_nr` must be echoed in the eventual CONNECT_RESP.
#[derive(Debug, Clone)]
pub struct CallOffer {
    pub plci: u32,
    pub msg_nr: u16,
    /// CIP value: the service indicator of the offered call.
    pub cip_value: u16,
    /// Called party number with the type octet stripped.
    pub called_party: String,
    /// Calling party number with type and presentation octets stripped.
    pub calling_party: String,
}

/// Implemented by the embedding application. Invoked synchronously from the
/// dispatcher thread, so implementations must not block indefinitely.
///
/// Subsequent lifecycle events (call established, data arrived, call ended)
/// are delivered to the [`crate::connection::ConnectionHandler`] returned
/// here, one entry point per message kind.
pub trait ApplicationInterface: Send + Sync {
    /// A new call is offered. Return the handler for the connection to
    /// register it, or `None` to leave the call to other applications (the
    /// engine then answers with an "ignore" response).
    fn call_offered(&self, offer: &CallOffer) -> Option<SharedHandler>;
}
