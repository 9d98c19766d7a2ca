//! Capability cache: per-controller profiles discovered once at registration.

use crate::driver::{CapiDriver, PROFILE_LEN};
use crate::error::Error;

// Global option bits of the raw profile record.
const OPT_DTMF: u32 = 0x08;
const OPT_SUPP_SERV: u32 = 0x10;

// B3 protocol support bits.
const B3_TRANSPARENT: u32 = 0x01;
const B3_FAX_G3: u32 = 0x10;
const B3_FAX_G3_EXT: u32 = 0x20;

/// Capabilities of one controller, parsed from its raw profile record.
/// Stored 0-based even though the driver numbers controllers from 1.
#[derive(Debug, Clone)]
pub struct ControllerProfile {
    pub manufacturer: String,
    pub version: String,
    pub b_channels: u16,
    pub transparent: bool,
    pub fax: bool,
    pub fax_ext: bool,
    pub dtmf: bool,
    pub supp_serv: bool,
}

impl ControllerProfile {
    /// Parse the raw 64-byte profile record: controller count word, B-channel
    /// count word, global options dword, then the B1/B2/B3 support masks.
    pub fn from_raw(raw: &[u8; PROFILE_LEN], manufacturer: String, version: String) -> Self {
        let b_channels = u16::from_le_bytes([raw[2], raw[3]]);
        let global = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        let b3 = u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]);
        ControllerProfile {
            manufacturer,
            version,
            b_channels,
            transparent: b3 & B3_TRANSPARENT != 0,
            fax: b3 & B3_FAX_G3 != 0,
            fax_ext: b3 & B3_FAX_G3_EXT != 0,
            dtmf: global & OPT_DTMF != 0,
            supp_serv: global & OPT_SUPP_SERV != 0,
        }
    }

    fn services(&self) -> String {
        let mut out = Vec::new();
        if self.dtmf {
            out.push("DTMF");
        }
        if self.supp_serv {
            out.push("SuppServ");
        }
        if self.transparent {
            out.push("transparent");
        }
        if self.fax {
            out.push("FaxG3");
        }
        if self.fax_ext {
            out.push("FaxG3ext");
        }
        out.join(", ")
    }
}

/// Driver identity plus the profiles of all installed controllers.
/// Populated exactly once by [`CapiProfile::discover`]; immutable afterward.
#[derive(Debug, Clone)]
pub struct CapiProfile {
    pub manufacturer: String,
    pub version: String,
    pub controllers: Vec<ControllerProfile>,
}

impl CapiProfile {
    /// One-time capability discovery. Fails with a capability error when no
    /// controller is installed, and with a message error when a query fails.
    pub fn discover(driver: &dyn CapiDriver) -> Result<Self, Error> {
        let num = driver.num_controllers().map_err(|info| Error::Message {
            operation: "CAPI_GET_PROFILE",
            info,
        })?;
        if num == 0 {
            return Err(Error::Capability("no ISDN controller installed".into()));
        }
        let manufacturer = driver.manufacturer(0).map_err(|info| Error::Message {
            operation: "CAPI_GET_MANUFACTURER",
            info,
        })?;
        let version = driver.version(0).map_err(|info| Error::Message {
            operation: "CAPI_GET_VERSION",
            info,
        })?;
        let mut controllers = Vec::with_capacity(num as usize);
        for ctrl in 1..=num {
            let raw = driver.profile(ctrl).map_err(|info| Error::Message {
                operation: "CAPI_GET_PROFILE",
                info,
            })?;
            let m = driver.manufacturer(ctrl).map_err(|info| Error::Message {
                operation: "CAPI_GET_MANUFACTURER",
                info,
            })?;
            let v = driver.version(ctrl).map_err(|info| Error::Message {
                operation: "CAPI_GET_VERSION",
                info,
            })?;
            controllers.push(ControllerProfile::from_raw(&raw, m, v));
        }
        Ok(CapiProfile {
            manufacturer,
            version,
            controllers,
        })
    }

    /// Profile of a controller by its 1-based driver number.
    pub fn controller(&self, number: u32) -> Option<&ControllerProfile> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.controllers.get(index)
    }

    /// Human-readable capability summary. Non-verbose: exactly one line.
    /// Verbose: the same header line plus one line per controller.
    pub fn summary(&self, verbose: bool) -> String {
        let mut out = format!(
            "{} controllers found ({}, version {})",
            self.controllers.len(),
            self.manufacturer,
            self.version
        );
        if verbose {
            for (i, c) in self.controllers.iter().enumerate() {
                out.push_str(&format!(
                    "\nController {}: {} ({} B channels, {}, driver version {})",
                    i + 1,
                    c.manufacturer,
                    c.b_channels,
                    c.services(),
                    c.version
                ));
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) fn raw_profile(b_channels: u16, global: u32, b3: u32) -> [u8; PROFILE_LEN] {
    let mut raw = [0u8; PROFILE_LEN];
    raw[0..2].copy_from_slice(&1u16.to_le_bytes());
    raw[2..4].copy_from_slice(&b_channels.to_le_bytes());
    raw[4..8].copy_from_slice(&global.to_le_bytes());
    raw[16..20].copy_from_slice(&b3.to_le_bytes());
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_capability_bits() {
        let raw = raw_profile(2, OPT_DTMF | OPT_SUPP_SERV, B3_TRANSPARENT | B3_FAX_G3);
        let p = ControllerProfile::from_raw(&raw, "ACME".into(), "1.0".into());
        assert_eq!(p.b_channels, 2);
        assert!(p.dtmf);
        assert!(p.supp_serv);
        assert!(p.transparent);
        assert!(p.fax);
        assert!(!p.fax_ext);
    }

    #[test]
    fn summary_line_counts() {
        let raw = raw_profile(2, OPT_DTMF, B3_TRANSPARENT | B3_FAX_G3 | B3_FAX_G3_EXT);
        let profile = CapiProfile {
            manufacturer: "ACME CAPI".into(),
            version: "2.0".into(),
            controllers: vec![
                ControllerProfile::from_raw(&raw, "ACME".into(), "1.1".into()),
                ControllerProfile::from_raw(&raw, "ACME".into(), "1.2".into()),
            ],
        };
        let short = profile.summary(false);
        assert_eq!(short.lines().count(), 1);
        assert!(short.starts_with("2 controllers found"));

        let long = profile.summary(true);
        assert_eq!(long.lines().count(), 3);
        assert!(long.contains("Controller 1:"));
        assert!(long.contains("Controller 2:"));
        assert!(long.contains("FaxG3ext"));
    }

    #[test]
    fn controller_lookup_is_one_based() {
        let raw = raw_profile(2, 0, B3_TRANSPARENT);
        let profile = CapiProfile {
            manufacturer: "ACME".into(),
            version: "2.0".into(),
            controllers: vec![ControllerProfile::from_raw(&raw, "A".into(), "1".into())],
        };
        assert!(profile.controller(0).is_none());
        assert!(profile.controller(1).is_some());
        assert!(profile.controller(2).is_none());
    }
}
