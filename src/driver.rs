//! Driver boundary: the primitive operations a CAPI 2.0 implementation exposes.

/// Size of the raw per-controller profile record.
pub const PROFILE_LEN: usize = 64;

/// The CAPI driver primitives the engine consumes. Failures are reported as
/// 16-bit CAPI info codes (see [`crate::info::describe_param_info`]).
///
/// Controllers are numbered from 1 at this boundary; 0 addresses the CAPI
/// driver itself where a query supports it. `get_message` blocks until a
/// message is available and is only ever called from the dispatcher thread.
///
/// Data payloads cross this boundary in-line: a DATA_B3 message carries its
/// payload bytes directly after the fixed part, and the 32-bit data pointer
/// field is zero.
pub trait CapiDriver: Send + Sync {
    /// Register an application. Returns the assigned application id.
    fn register(
        &self,
        max_logical_connections: u32,
        max_b_data_blocks: u32,
        max_b_data_len: u32,
    ) -> Result<u16, u16>;

    /// Release a registered application.
    fn release(&self, appl_id: u16) -> Result<(), u16>;

    /// Hand one complete message to the driver. Does not block under the
    /// capacity limits given at registration.
    fn put_message(&self, appl_id: u16, message: &[u8]) -> Result<(), u16>;

    /// Blocking receive: returns the next message addressed to `appl_id`.
    fn get_message(&self, appl_id: u16) -> Result<Vec<u8>, u16>;

    /// Number of installed controllers.
    fn num_controllers(&self) -> Result<u16, u16>;

    /// Raw capability profile of one controller (1-based).
    fn profile(&self, controller: u16) -> Result<[u8; PROFILE_LEN], u16>;

    /// Manufacturer string of a controller, or of the CAPI driver for 0.
    fn manufacturer(&self, controller: u16) -> Result<String, u16>;

    /// Version string of a controller, or of the CAPI driver for 0.
    fn version(&self, controller: u16) -> Result<String, u16>;
}
