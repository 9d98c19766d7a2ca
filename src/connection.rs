//! Collaborator boundary: the per-message-kind entry points the dispatcher
//! invokes on a registered connection.

use crate::error::Error;

fn unexpected(kind: &'static str) -> Error {
    Error::WrongState(format!("{kind} not expected by this connection"))
}

/// Handler side of a logical connection. The engine dispatches every inbound
/// message addressed to a registered PLCI/NCCI to exactly one of these entry
/// points, synchronously on the dispatcher thread.
///
/// Every method has a default body returning a wrong-state error, so a
/// connection state machine only implements the messages its states accept.
/// Handlers drive further protocol traffic (including the responses CAPI
/// requires for indications) through the engine's encoders, and unregister
/// themselves once teardown is complete.
#[allow(unused_variables)]
pub trait ConnectionHandler: Send {
    /// CONNECT_CONF: the outbound call got its real PLCI (`info` 0) or was
    /// rejected by the driver (`info` non-zero). The registry entry has
    /// already been re-keyed from the pending key to `plci` on success, and
    /// dropped on failure.
    fn connect_conf(&mut self, plci: u32, info: u16) -> Result<(), Error> {
        Err(unexpected("CONNECT_CONF"))
    }

    /// CONNECT_ACTIVE_IND: the physical connection is established.
    fn connect_active_ind(&mut self, msg_nr: u16, plci: u32) -> Result<(), Error> {
        Err(unexpected("CONNECT_ACTIVE_IND"))
    }

    /// CONNECT_B3_IND: the peer wants a logical connection.
    fn connect_b3_ind(&mut self, msg_nr: u16, ncci: u32, ncpi: &[u8]) -> Result<(), Error> {
        Err(unexpected("CONNECT_B3_IND"))
    }

    /// CONNECT_B3_CONF: answer to our CONNECT_B3_REQ.
    fn connect_b3_conf(&mut self, ncci: u32, info: u16) -> Result<(), Error> {
        Err(unexpected("CONNECT_B3_CONF"))
    }

    /// CONNECT_B3_ACTIVE_IND: the logical connection is up.
    fn connect_b3_active_ind(&mut self, msg_nr: u16, ncci: u32, ncpi: &[u8]) -> Result<(), Error> {
        Err(unexpected("CONNECT_B3_ACTIVE_IND"))
    }

    /// DATA_B3_IND: payload arrived. The handler owns acknowledging it via
    /// `data_b3_resp` with the given handle.
    fn data_b3_ind(
        &mut self,
        msg_nr: u16,
        ncci: u32,
        data: &[u8],
        data_handle: u16,
        flags: u16,
    ) -> Result<(), Error> {
        Err(unexpected("DATA_B3_IND"))
    }

    /// DATA_B3_CONF: a buffer given to `data_b3_req` was accepted or failed;
    /// `data_handle` is the caller-supplied handle echoed back.
    fn data_b3_conf(&mut self, ncci: u32, data_handle: u16, info: u16) -> Result<(), Error> {
        Err(unexpected("DATA_B3_CONF"))
    }

    /// DISCONNECT_B3_IND: the logical connection went down.
    fn disconnect_b3_ind(
        &mut self,
        msg_nr: u16,
        ncci: u32,
        reason_b3: u16,
        ncpi: &[u8],
    ) -> Result<(), Error> {
        Err(unexpected("DISCONNECT_B3_IND"))
    }

    /// DISCONNECT_B3_CONF: answer to our DISCONNECT_B3_REQ.
    fn disconnect_b3_conf(&mut self, ncci: u32, info: u16) -> Result<(), Error> {
        Err(unexpected("DISCONNECT_B3_CONF"))
    }

    /// DISCONNECT_IND: the physical connection went down.
    fn disconnect_ind(&mut self, msg_nr: u16, plci: u32, reason: u16) -> Result<(), Error> {
        Err(unexpected("DISCONNECT_IND"))
    }

    /// DISCONNECT_CONF: answer to our DISCONNECT_REQ.
    fn disconnect_conf(&mut self, plci: u32, info: u16) -> Result<(), Error> {
        Err(unexpected("DISCONNECT_CONF"))
    }

    /// FACILITY_IND: facility event, e.g. received DTMF digits (selector 1).
    fn facility_ind(
        &mut self,
        msg_nr: u16,
        address: u32,
        selector: u16,
        parameter: &[u8],
    ) -> Result<(), Error> {
        Err(unexpected("FACILITY_IND"))
    }

    /// FACILITY_CONF: answer to our FACILITY_REQ.
    fn facility_conf(&mut self, address: u32, selector: u16, info: u16) -> Result<(), Error> {
        Err(unexpected("FACILITY_CONF"))
    }

    /// ALERT_CONF: answer to our ALERT_REQ.
    fn alert_conf(&mut self, plci: u32, info: u16) -> Result<(), Error> {
        Err(unexpected("ALERT_CONF"))
    }

    /// SELECT_B_PROTOCOL_CONF: answer to our SELECT_B_PROTOCOL_REQ.
    fn select_b_protocol_conf(&mut self, plci: u32, info: u16) -> Result<(), Error> {
        Err(unexpected("SELECT_B_PROTOCOL_CONF"))
    }

    /// INFO_IND: in-band progress element. The handler acknowledges via
    /// `info_resp`.
    fn info_ind(
        &mut self,
        msg_nr: u16,
        plci: u32,
        info_number: u16,
        info_element: &[u8],
    ) -> Result<(), Error> {
        Err(unexpected("INFO_IND"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;
    impl ConnectionHandler for Bare {}

    #[test]
    fn defaults_report_wrong_state() {
        let mut h = Bare;
        assert!(matches!(h.connect_conf(0x101, 0), Err(Error::WrongState(_))));
        assert!(matches!(
            h.data_b3_ind(1, 0x10101, b"x", 0, 0),
            Err(Error::WrongState(_))
        ));
    }
}
