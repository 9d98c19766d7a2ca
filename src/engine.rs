//! Engine core: registration, listen management, the request/response encoders
//! and the receive dispatcher.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, error, warn};

use crate::application::{ApplicationInterface, CallOffer};
use crate::config::EngineConfig;
use crate::driver::CapiDriver;
use crate::error::Error;
use crate::profile::CapiProfile;
use crate::registry::{ConnectionRegistry, SharedHandler};
use crate::wire::{command, cstruct_bytes, subcommand, Header, MessageBuilder, MessageReader};

/// CIP mask bits for speech, 3.1 kHz audio and telephony.
const CIP_MASK_TELEPHONY: u32 = 0x0001_0012;
/// CIP mask bits for 3.1 kHz audio and fax group 2/3.
const CIP_MASK_FAX_G3: u32 = 0x0002_0010;
/// Info mask enabling the basic info elements (cause, display, ...).
const INFO_MASK_DEFAULT: u32 = 0x0000_03FF;

/// Recover the guard from a poisoned lock; the registry and masks stay
/// consistent because every mutation completes before the guard drops.
fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Call services the engine can advertise via listen management.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Telephony,
    FaxG3,
}

impl ServiceKind {
    fn cip_mask(self) -> u32 {
        match self {
            ServiceKind::Telephony => CIP_MASK_TELEPHONY,
            ServiceKind::FaxG3 => CIP_MASK_FAX_G3,
        }
    }
}

/// B-protocol selection: B1/B2/B3 protocol words plus their configuration
/// structs, encoded as one composite CAPI struct where a message carries it.
#[derive(Debug, Clone, Default)]
pub struct BProtocol {
    pub b1: u16,
    pub b2: u16,
    pub b3: u16,
    pub b1_config: Vec<u8>,
    pub b2_config: Vec<u8>,
    pub b3_config: Vec<u8>,
}

impl BProtocol {
    /// Transparent voice: 64 kbit/s transparent B1/B2, transparent B3.
    pub fn transparent() -> Self {
        BProtocol {
            b1: 1,
            b2: 1,
            b3: 0,
            ..BProtocol::default()
        }
    }

    /// Fax group 3 (T.30): standard resolution, SFF format, with the given
    /// station id and headline in the B3 configuration.
    pub fn fax_g3(station_id: &str, headline: &str) -> Self {
        let mut b3_config = Vec::new();
        b3_config.extend_from_slice(&0u16.to_le_bytes()); // resolution: standard
        b3_config.extend_from_slice(&0u16.to_le_bytes()); // format: SFF
        b3_config.extend_from_slice(&cstruct_bytes(station_id.as_bytes()));
        b3_config.extend_from_slice(&cstruct_bytes(headline.as_bytes()));
        BProtocol {
            b1: 4,
            b2: 4,
            b3: 4,
            b3_config,
            ..BProtocol::default()
        }
    }

    /// Content of the composite B protocol struct.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.b1.to_le_bytes());
        out.extend_from_slice(&self.b2.to_le_bytes());
        out.extend_from_slice(&self.b3.to_le_bytes());
        out.extend_from_slice(&cstruct_bytes(&self.b1_config));
        out.extend_from_slice(&cstruct_bytes(&self.b2_config));
        out.extend_from_slice(&cstruct_bytes(&self.b3_config));
        out
    }
}

// Called party number: type octet, then digits. Calling party number has an
// additional presentation octet. CAPI 2.0 ch. 5.
fn encode_called_party(number: &str) -> Vec<u8> {
    let mut out = vec![0x80];
    out.extend_from_slice(number.as_bytes());
    out
}

fn encode_calling_party(number: &str) -> Vec<u8> {
    let mut out = vec![0x00, 0x80];
    out.extend_from_slice(number.as_bytes());
    out
}

fn decode_called_party(content: &[u8]) -> String {
    let digits = content.get(1..).unwrap_or(&[]);
    String::from_utf8_lossy(digits).into_owned()
}

fn decode_calling_party(content: &[u8]) -> String {
    let digits = content.get(2..).unwrap_or(&[]);
    String::from_utf8_lossy(digits).into_owned()
}

struct ListenMasks {
    info_mask: u32,
    cip_mask: u32,
}

/// The protocol engine. One instance per registered application, shared
/// between the dispatcher thread and any number of application threads.
///
/// Connections are not owned here: collaborators register their handler,
/// drive traffic through the encoders, and unregister on teardown.
pub struct Capi {
    driver: Box<dyn CapiDriver>,
    appl_id: u16,
    max_b_data_len: u32,
    msg_nr: AtomicU16,
    listen: Mutex<ListenMasks>,
    registry: Mutex<ConnectionRegistry>,
    profile: CapiProfile,
    application: Mutex<Option<Arc<dyn ApplicationInterface>>>,
    shutting_down: AtomicBool,
    released: AtomicBool,
}

impl Capi {
    /// Discover the installed controllers and register at the driver with the
    /// configured capacity limits. Discovery failure is a hard startup error.
    pub fn register(driver: Box<dyn CapiDriver>, config: &EngineConfig) -> Result<Arc<Self>, Error> {
        config.validate()?;
        let profile = CapiProfile::discover(driver.as_ref())?;
        let appl_id = driver
            .register(
                config.max_logical_connections,
                config.max_b_data_blocks,
                config.max_b_data_len,
            )
            .map_err(|info| Error::Message {
                operation: "CAPI_REGISTER",
                info,
            })?;
        debug!(
            appl_id,
            controllers = profile.controllers.len(),
            "registered at CAPI"
        );
        Ok(Arc::new(Capi {
            driver,
            appl_id,
            max_b_data_len: config.max_b_data_len,
            msg_nr: AtomicU16::new(0),
            listen: Mutex::new(ListenMasks {
                info_mask: 0,
                cip_mask: 0,
            }),
            registry: Mutex::new(ConnectionRegistry::default()),
            profile,
            application: Mutex::new(None),
            shutting_down: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }))
    }

    /// Install the application callback invoked for offered calls.
    pub fn register_application(&self, application: Arc<dyn ApplicationInterface>) {
        *lock(&self.application) = Some(application);
    }

    /// The application id assigned by the driver.
    pub fn appl_id(&self) -> u16 {
        self.appl_id
    }

    /// The capability profile discovered at registration.
    pub fn profile(&self) -> &CapiProfile {
        &self.profile
    }

    /// Pure formatting over the discovered profile; see [`CapiProfile::summary`].
    pub fn capability_summary(&self, verbose: bool) -> String {
        self.profile.summary(verbose)
    }

    /// Number of live registry entries (pending connects included).
    pub fn connection_count(&self) -> usize {
        lock(&self.registry).len()
    }

    fn next_msg_nr(&self) -> u16 {
        self.msg_nr.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    fn send(&self, operation: &'static str, message: Vec<u8>) -> Result<(), Error> {
        self.driver
            .put_message(self.appl_id, &message)
            .map_err(|info| Error::Message { operation, info })
    }

    /// Best-effort teardown: release the application id. The dispatcher wakes
    /// from its blocking receive with an error and exits. Failures are
    /// reported in the log, never escalated.
    pub fn deregister(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(info) = self.driver.release(self.appl_id) {
            warn!(info, "CAPI_RELEASE failed during shutdown");
        } else {
            debug!(appl_id = self.appl_id, "released at CAPI");
        }
    }

    // ---- listen management ----

    /// Additionally listen for calls of the given service. `controller` 0
    /// targets all discovered controllers. Validates each target's
    /// capability bits first; previously enabled services stay enabled
    /// because the masks are cumulative.
    pub fn enable_service(&self, kind: ServiceKind, controller: u32) -> Result<(), Error> {
        let targets: Vec<u32> = if controller == 0 {
            (1..=self.profile.controllers.len() as u32).collect()
        } else {
            vec![controller]
        };
        for &ctrl in &targets {
            let prof = self.profile.controller(ctrl).ok_or_else(|| {
                Error::Capability(format!("controller {ctrl} is not installed"))
            })?;
            match kind {
                ServiceKind::Telephony if !prof.transparent => {
                    return Err(Error::Capability(format!(
                        "controller {ctrl} does not support transparent connections"
                    )));
                }
                ServiceKind::FaxG3 if !prof.fax => {
                    return Err(Error::Capability(format!(
                        "controller {ctrl} does not support fax group 3"
                    )));
                }
                _ => {}
            }
        }
        let (info_mask, cip_mask) = {
            let mut masks = lock(&self.listen);
            masks.info_mask |= INFO_MASK_DEFAULT;
            masks.cip_mask |= kind.cip_mask();
            (masks.info_mask, masks.cip_mask)
        };
        for &ctrl in &targets {
            self.listen_req(ctrl, info_mask, cip_mask)?;
        }
        Ok(())
    }

    /// Currently advertised (info, CIP) listen masks.
    pub fn listen_masks(&self) -> (u32, u32) {
        let masks = lock(&self.listen);
        (masks.info_mask, masks.cip_mask)
    }

    // ---- request encoders ----

    /// Send LISTEN_REQ with explicit masks. Most callers want
    /// [`Capi::enable_service`], which keeps the masks cumulative.
    pub fn listen_req(&self, controller: u32, info_mask: u32, cip_mask: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::LISTEN,
            subcommand::REQ,
            self.next_msg_nr(),
        )
        .dword(controller)
        .dword(info_mask)
        .dword(cip_mask)
        .dword(0) // second CIP mask, unused
        .cstruct(&[]) // calling party number
        .cstruct(&[]) // calling party subaddress
        .finish();
        self.send("LISTEN_REQ", msg)
    }

    /// Send ALERT_REQ: signal "alerting" for an offered call we will answer.
    pub fn alert_req(&self, plci: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::ALERT,
            subcommand::REQ,
            self.next_msg_nr(),
        )
        .dword(plci)
        .cstruct(&[]) // additional info
        .finish();
        self.send("ALERT_REQ", msg)
    }

    /// Initiate an outbound call. The handler is keyed in the registry under
    /// the pending key for the new message number *before* the request is
    /// sent, so the CONNECT_CONF can be correlated although no PLCI exists
    /// yet. Returns the message number of the request.
    pub fn connect_req(
        &self,
        handler: SharedHandler,
        controller: u32,
        cip_value: u16,
        called_party: &str,
        calling_party: &str,
        protocol: &BProtocol,
    ) -> Result<u16, Error> {
        let msg_nr = self.next_msg_nr();
        lock(&self.registry).reserve(msg_nr, handler)?;
        let msg = MessageBuilder::new(self.appl_id, command::CONNECT, subcommand::REQ, msg_nr)
            .dword(controller)
            .word(cip_value)
            .cstruct(&encode_called_party(called_party))
            .cstruct(&encode_calling_party(calling_party))
            .cstruct(&[]) // called party subaddress
            .cstruct(&[]) // calling party subaddress
            .cstruct(&protocol.encode())
            .cstruct(&[]) // BC
            .cstruct(&[]) // LLC
            .cstruct(&[]) // HLC
            .cstruct(&[]) // additional info
            .finish();
        if let Err(e) = self.send("CONNECT_REQ", msg) {
            lock(&self.registry).abandon(msg_nr);
            return Err(e);
        }
        debug!(msg_nr, controller, called_party, "outbound call initiated");
        Ok(msg_nr)
    }

    /// Send SELECT_B_PROTOCOL_REQ: switch the B protocol of an established
    /// physical connection.
    pub fn select_b_protocol_req(&self, plci: u32, protocol: &BProtocol) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::SELECT_B_PROTOCOL,
            subcommand::REQ,
            self.next_msg_nr(),
        )
        .dword(plci)
        .cstruct(&protocol.encode())
        .finish();
        self.send("SELECT_B_PROTOCOL_REQ", msg)
    }

    /// Send CONNECT_B3_REQ: ask for a logical connection on an established
    /// physical one.
    pub fn connect_b3_req(&self, plci: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::CONNECT_B3,
            subcommand::REQ,
            self.next_msg_nr(),
        )
        .dword(plci)
        .cstruct(&[]) // NCPI
        .finish();
        self.send("CONNECT_B3_REQ", msg)
    }

    /// Send DATA_B3_REQ. `data_handle` is echoed in the DATA_B3_CONF so the
    /// caller can correlate completion of this buffer; the payload bytes are
    /// opaque to the engine and carried in-line.
    pub fn data_b3_req(
        &self,
        ncci: u32,
        data: &[u8],
        data_handle: u16,
        flags: u16,
    ) -> Result<(), Error> {
        if data.len() > self.max_b_data_len as usize {
            return Err(Error::Capability(format!(
                "data block of {} bytes exceeds the registered limit of {}",
                data.len(),
                self.max_b_data_len
            )));
        }
        let msg = MessageBuilder::new(
            self.appl_id,
            command::DATA_B3,
            subcommand::REQ,
            self.next_msg_nr(),
        )
        .dword(ncci)
        .dword(0) // data pointer, unused in this binding
        .word(data.len() as u16)
        .word(data_handle)
        .word(flags)
        .raw(data)
        .finish();
        self.send("DATA_B3_REQ", msg)
    }

    /// Send DISCONNECT_B3_REQ for a logical connection.
    pub fn disconnect_b3_req(&self, ncci: u32, ncpi: &[u8]) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::DISCONNECT_B3,
            subcommand::REQ,
            self.next_msg_nr(),
        )
        .dword(ncci)
        .cstruct(ncpi)
        .finish();
        self.send("DISCONNECT_B3_REQ", msg)
    }

    /// Send DISCONNECT_REQ for a physical connection.
    pub fn disconnect_req(&self, plci: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::DISCONNECT,
            subcommand::REQ,
            self.next_msg_nr(),
        )
        .dword(plci)
        .cstruct(&[]) // additional info
        .finish();
        self.send("DISCONNECT_REQ", msg)
    }

    /// Send FACILITY_REQ (selector 1 = DTMF).
    pub fn facility_req(&self, address: u32, selector: u16, parameter: &[u8]) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::FACILITY,
            subcommand::REQ,
            self.next_msg_nr(),
        )
        .dword(address)
        .word(selector)
        .cstruct(parameter)
        .finish();
        self.send("FACILITY_REQ", msg)
    }

    // ---- response encoders ----
    // Responses echo the message number of the indication they answer and
    // carry no further correlation bookkeeping.

    /// Answer a CONNECT_IND: accept (`reject` 0), ignore (1) or reject (2+).
    pub fn connect_resp(
        &self,
        msg_nr: u16,
        plci: u32,
        reject: u16,
        protocol: &BProtocol,
    ) -> Result<(), Error> {
        let msg = MessageBuilder::new(self.appl_id, command::CONNECT, subcommand::RESP, msg_nr)
            .dword(plci)
            .word(reject)
            .cstruct(&protocol.encode())
            .cstruct(&[]) // connected number
            .cstruct(&[]) // connected subaddress
            .cstruct(&[]) // LLC
            .cstruct(&[]) // additional info
            .finish();
        self.send("CONNECT_RESP", msg)
    }

    pub fn connect_active_resp(&self, msg_nr: u16, plci: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::CONNECT_ACTIVE,
            subcommand::RESP,
            msg_nr,
        )
        .dword(plci)
        .finish();
        self.send("CONNECT_ACTIVE_RESP", msg)
    }

    /// Answer a CONNECT_B3_IND: accept (`reject` 0) or reject (2).
    pub fn connect_b3_resp(
        &self,
        msg_nr: u16,
        ncci: u32,
        reject: u16,
        ncpi: &[u8],
    ) -> Result<(), Error> {
        let msg = MessageBuilder::new(self.appl_id, command::CONNECT_B3, subcommand::RESP, msg_nr)
            .dword(ncci)
            .word(reject)
            .cstruct(ncpi)
            .finish();
        self.send("CONNECT_B3_RESP", msg)
    }

    pub fn connect_b3_active_resp(&self, msg_nr: u16, ncci: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::CONNECT_B3_ACTIVE,
            subcommand::RESP,
            msg_nr,
        )
        .dword(ncci)
        .finish();
        self.send("CONNECT_B3_ACTIVE_RESP", msg)
    }

    /// Acknowledge a DATA_B3_IND with the handle it carried.
    pub fn data_b3_resp(&self, msg_nr: u16, ncci: u32, data_handle: u16) -> Result<(), Error> {
        let msg = MessageBuilder::new(self.appl_id, command::DATA_B3, subcommand::RESP, msg_nr)
            .dword(ncci)
            .word(data_handle)
            .finish();
        self.send("DATA_B3_RESP", msg)
    }

    pub fn facility_resp(
        &self,
        msg_nr: u16,
        address: u32,
        selector: u16,
        parameter: &[u8],
    ) -> Result<(), Error> {
        let msg = MessageBuilder::new(self.appl_id, command::FACILITY, subcommand::RESP, msg_nr)
            .dword(address)
            .word(selector)
            .cstruct(parameter)
            .finish();
        self.send("FACILITY_RESP", msg)
    }

    pub fn disconnect_resp(&self, msg_nr: u16, plci: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(self.appl_id, command::DISCONNECT, subcommand::RESP, msg_nr)
            .dword(plci)
            .finish();
        self.send("DISCONNECT_RESP", msg)
    }

    pub fn disconnect_b3_resp(&self, msg_nr: u16, ncci: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(
            self.appl_id,
            command::DISCONNECT_B3,
            subcommand::RESP,
            msg_nr,
        )
        .dword(ncci)
        .finish();
        self.send("DISCONNECT_B3_RESP", msg)
    }

    /// Acknowledge an INFO_IND.
    pub fn info_resp(&self, msg_nr: u16, plci: u32) -> Result<(), Error> {
        let msg = MessageBuilder::new(self.appl_id, command::INFO, subcommand::RESP, msg_nr)
            .dword(plci)
            .finish();
        self.send("INFO_RESP", msg)
    }

    // ---- connection registry boundary ----

    /// Register a handler for an already known PLCI.
    pub fn register_connection(&self, plci: u32, handler: SharedHandler) -> Result<(), Error> {
        lock(&self.registry).insert(plci, handler)
    }

    /// Remove a connection on teardown. Unknown PLCIs are ignored.
    pub fn unregister_connection(&self, plci: u32) {
        if lock(&self.registry).remove(plci).is_none() {
            debug!(plci, "unregister for unknown PLCI");
        }
    }

    // ---- receive dispatcher ----

    /// Blocking receive loop: runs until the driver reports a failure or
    /// [`Capi::deregister`] was called. Errors raised while handling one
    /// message are logged and the loop resumes with the next message.
    pub fn run(&self) {
        loop {
            let buf = match self.driver.get_message(self.appl_id) {
                Ok(buf) => buf,
                Err(info) => {
                    if self.shutting_down.load(Ordering::SeqCst) {
                        debug!("dispatcher stopping after shutdown request");
                    } else {
                        error!(info, "CAPI_GET_MESSAGE failed, dispatcher exiting");
                    }
                    return;
                }
            };
            if let Err(e) = self.handle_message(&buf) {
                warn!(error = %e, "inbound message not handled");
            }
        }
    }

    /// Run the dispatcher on its own thread for the engine's lifetime.
    pub fn spawn_dispatcher(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let engine = Arc::clone(self);
        thread::spawn(move || engine.run())
    }

    fn resolve(&self, header: &Header, address: u32) -> Result<SharedHandler, Error> {
        // NCCIs carry their owning PLCI in the low 16 bits; plain PLCIs pass
        // through the mask unchanged.
        lock(&self.registry)
            .resolve_data(address)
            .ok_or(Error::MalformedAddressing {
                command: header.command,
                subcommand: header.subcommand,
                address,
            })
    }

    /// Classify one inbound message and dispatch it to the engine or the
    /// addressed connection handler.
    pub fn handle_message(&self, buf: &[u8]) -> Result<(), Error> {
        let (header, mut rd) = MessageReader::after_header(buf)?;
        match (header.command, header.subcommand) {
            (command::LISTEN, subcommand::CONF) => {
                let controller = rd.dword()?;
                let info = rd.word()?;
                if info != 0 {
                    return Err(Error::Message {
                        operation: "LISTEN_REQ",
                        info,
                    });
                }
                debug!(controller, "listen confirmed");
                Ok(())
            }
            (command::CONNECT, subcommand::CONF) => {
                let plci = rd.dword()?;
                let info = rd.word()?;
                let handler = if info == 0 {
                    lock(&self.registry).confirm(header.msg_nr, plci)?
                } else {
                    // Failed connect: the pending entry is dropped, no real
                    // PLCI ever existed.
                    lock(&self.registry).abandon(header.msg_nr).ok_or(
                        Error::MalformedAddressing {
                            command: header.command,
                            subcommand: header.subcommand,
                            address: plci,
                        },
                    )?
                };
                let result = lock(handler.as_ref()).connect_conf(plci, info);
                result
            }
            (command::CONNECT, subcommand::IND) => self.handle_connect_ind(&header, &mut rd),
            (command::CONNECT_ACTIVE, subcommand::IND) => {
                let plci = rd.dword()?;
                let handler = self.resolve(&header, plci)?;
                let result = lock(handler.as_ref()).connect_active_ind(header.msg_nr, plci);
                result
            }
            (command::CONNECT_B3, subcommand::IND) => {
                let ncci = rd.dword()?;
                let ncpi = rd.cstruct()?;
                let handler = self.resolve(&header, ncci)?;
                let result = lock(handler.as_ref()).connect_b3_ind(header.msg_nr, ncci, ncpi);
                result
            }
            (command::CONNECT_B3, subcommand::CONF) => {
                let ncci = rd.dword()?;
                let info = rd.word()?;
                let handler = self.resolve(&header, ncci)?;
                let result = lock(handler.as_ref()).connect_b3_conf(ncci, info);
                result
            }
            (command::CONNECT_B3_ACTIVE, subcommand::IND) => {
                let ncci = rd.dword()?;
                let ncpi = rd.cstruct().unwrap_or(&[]);
                let handler = self.resolve(&header, ncci)?;
                let result = lock(handler.as_ref()).connect_b3_active_ind(header.msg_nr, ncci, ncpi);
                result
            }
            (command::DATA_B3, subcommand::IND) => {
                let ncci = rd.dword()?;
                let _data_ptr = rd.dword()?;
                let data_len = rd.word()?;
                let data_handle = rd.word()?;
                let flags = rd.word()?;
                let data = rd.bytes(data_len as usize)?;
                let handler = self.resolve(&header, ncci)?;
                let result = lock(handler.as_ref()).data_b3_ind(header.msg_nr, ncci, data, data_handle, flags);
                result
            }
            (command::DATA_B3, subcommand::CONF) => {
                let ncci = rd.dword()?;
                let data_handle = rd.word()?;
                let info = rd.word()?;
                let handler = self.resolve(&header, ncci)?;
                let result = lock(handler.as_ref()).data_b3_conf(ncci, data_handle, info);
                result
            }
            (command::DISCONNECT_B3, subcommand::IND) => {
                let ncci = rd.dword()?;
                let reason_b3 = rd.word()?;
                let ncpi = rd.cstruct().unwrap_or(&[]);
                let handler = self.resolve(&header, ncci)?;
                let result = lock(handler.as_ref()).disconnect_b3_ind(header.msg_nr, ncci, reason_b3, ncpi);
                result
            }
            (command::DISCONNECT_B3, subcommand::CONF) => {
                let ncci = rd.dword()?;
                let info = rd.word()?;
                let handler = self.resolve(&header, ncci)?;
                let result = lock(handler.as_ref()).disconnect_b3_conf(ncci, info);
                result
            }
            (command::DISCONNECT, subcommand::IND) => {
                let plci = rd.dword()?;
                let reason = rd.word()?;
                let handler = self.resolve(&header, plci)?;
                let result = lock(handler.as_ref()).disconnect_ind(header.msg_nr, plci, reason);
                result
            }
            (command::DISCONNECT, subcommand::CONF) => {
                let plci = rd.dword()?;
                let info = rd.word()?;
                let handler = self.resolve(&header, plci)?;
                let result = lock(handler.as_ref()).disconnect_conf(plci, info);
                result
            }
            (command::FACILITY, subcommand::IND) => {
                let address = rd.dword()?;
                let selector = rd.word()?;
                let parameter = rd.cstruct()?;
                let handler = self.resolve(&header, address)?;
                let result = lock(handler.as_ref()).facility_ind(header.msg_nr, address, selector, parameter);
                result
            }
            (command::FACILITY, subcommand::CONF) => {
                let address = rd.dword()?;
                let info = rd.word()?;
                let selector = rd.word()?;
                let handler = self.resolve(&header, address)?;
                let result = lock(handler.as_ref()).facility_conf(address, selector, info);
                result
            }
            (command::ALERT, subcommand::CONF) => {
                let plci = rd.dword()?;
                let info = rd.word()?;
                let handler = self.resolve(&header, plci)?;
                let result = lock(handler.as_ref()).alert_conf(plci, info);
                result
            }
            (command::SELECT_B_PROTOCOL, subcommand::CONF) => {
                let plci = rd.dword()?;
                let info = rd.word()?;
                let handler = self.resolve(&header, plci)?;
                let result = lock(handler.as_ref()).select_b_protocol_conf(plci, info);
                result
            }
            (command::INFO, subcommand::IND) => {
                let plci = rd.dword()?;
                let info_number = rd.word()?;
                let info_element = rd.cstruct()?;
                let handler = self.resolve(&header, plci)?;
                let result = lock(handler.as_ref()).info_ind(header.msg_nr, plci, info_number, info_element);
                result
            }
            _ => Err(Error::Protocol(format!(
                "unsupported message {:#04x}/{:#04x}",
                header.command, header.subcommand
            ))),
        }
    }

    fn handle_connect_ind(&self, header: &Header, rd: &mut MessageReader) -> Result<(), Error> {
        let plci = rd.dword()?;
        let cip_value = rd.word()?;
        let called_party = decode_called_party(rd.cstruct()?);
        let calling_party = decode_calling_party(rd.cstruct()?);
        if lock(&self.registry).contains(plci) {
            return Err(Error::Protocol(format!(
                "call offered on already registered PLCI {plci:#x}"
            )));
        }
        let offer = CallOffer {
            plci,
            msg_nr: header.msg_nr,
            cip_value,
            called_party,
            calling_party,
        };
        let application = lock(&self.application).clone();
        let handler = application.as_ref().and_then(|a| a.call_offered(&offer));
        match handler {
            Some(handler) => {
                lock(&self.registry).insert(plci, handler)?;
                debug!(
                    plci,
                    cip_value,
                    called = %offer.called_party,
                    calling = %offer.calling_party,
                    "call offer accepted by application"
                );
                Ok(())
            }
            None => {
                debug!(plci, "no handler claimed offered call, ignoring");
                self.connect_resp(header.msg_nr, plci, 1, &BProtocol::default())
            }
        }
    }
}

impl Drop for Capi {
    fn drop(&mut self) {
        self.deregister();
    }
}
