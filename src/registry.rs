//! Connection registry: PLCI to handler, with a two-phase pending scheme for
//! outbound calls that have no real PLCI yet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::connection::ConnectionHandler;
use crate::error::Error;
use crate::wire::{command, subcommand};

/// High-order tag of a pending key. Real PLCIs and NCCI-masked PLCIs fit in
/// 16 bits, so a pending key can never collide with a live identifier.
const PENDING_TAG: u32 = 0xFACE;

/// Handlers are shared with their owners; the registry never owns connection
/// lifetime.
pub type SharedHandler = Arc<Mutex<dyn ConnectionHandler>>;

/// Pending key for an unconfirmed outbound call: fixed tag in the high half,
/// the CONNECT_REQ message number in the low half.
pub fn pending_key(msg_nr: u16) -> u32 {
    (PENDING_TAG << 16) | u32::from(msg_nr)
}

/// Mapping from connection identifier to handler. One instance per engine,
/// guarded by the engine's registry lock; `&mut` methods keep every mutation
/// (including the re-key) atomic with respect to dispatcher lookups.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: HashMap<u32, SharedHandler>,
}

impl ConnectionRegistry {
    /// Register a handler under a known PLCI (inbound call offer).
    pub fn insert(&mut self, plci: u32, handler: SharedHandler) -> Result<(), Error> {
        if self.entries.contains_key(&plci) {
            return Err(Error::Protocol(format!(
                "PLCI {plci:#x} is already registered"
            )));
        }
        self.entries.insert(plci, handler);
        Ok(())
    }

    /// Phase one for an outbound call: key the handler under the pending key
    /// for `msg_nr`. Fails if that key is still occupied by an earlier
    /// unconfirmed call.
    pub fn reserve(&mut self, msg_nr: u16, handler: SharedHandler) -> Result<(), Error> {
        let key = pending_key(msg_nr);
        if self.entries.contains_key(&key) {
            return Err(Error::Protocol(format!(
                "pending connect already outstanding for message number {msg_nr}"
            )));
        }
        self.entries.insert(key, handler);
        Ok(())
    }

    /// Phase two: re-key the pending entry for `msg_nr` to the real PLCI the
    /// confirmation carried. After this, `plci` resolves to the handler and
    /// the pending key no longer resolves.
    pub fn confirm(&mut self, msg_nr: u16, plci: u32) -> Result<SharedHandler, Error> {
        let handler =
            self.entries
                .remove(&pending_key(msg_nr))
                .ok_or(Error::MalformedAddressing {
                    command: command::CONNECT,
                    subcommand: subcommand::CONF,
                    address: plci,
                })?;
        if self.entries.contains_key(&plci) {
            // Driver handed out a PLCI that is still in use on our side.
            self.entries.insert(pending_key(msg_nr), handler);
            return Err(Error::Protocol(format!(
                "confirmation re-assigned live PLCI {plci:#x}"
            )));
        }
        self.entries.insert(plci, Arc::clone(&handler));
        Ok(handler)
    }

    /// Drop the pending entry for `msg_nr` (failed connect), returning its
    /// handler if one was reserved.
    pub fn abandon(&mut self, msg_nr: u16) -> Option<SharedHandler> {
        self.entries.remove(&pending_key(msg_nr))
    }

    /// Resolve an exact identifier.
    pub fn resolve(&self, plci: u32) -> Option<SharedHandler> {
        self.entries.get(&plci).map(Arc::clone)
    }

    /// Resolve an NCCI to the handler of its owning PLCI.
    pub fn resolve_data(&self, ncci: u32) -> Option<SharedHandler> {
        self.resolve(ncci & 0xFFFF)
    }

    pub fn contains(&self, plci: u32) -> bool {
        self.entries.contains_key(&plci)
    }

    /// Remove an entry on connection teardown.
    pub fn remove(&mut self, plci: u32) -> Option<SharedHandler> {
        self.entries.remove(&plci)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
