//! Device inventory model and per-module attribute resolution.
//!
//! An inventory document lists physical devices with their bus addresses and
//! modules. [`Device`] carries the identity and connection facts of one
//! entry; [`Device::resolve_attribute`] maps a device onto the bus member a
//! writer should read, using the per-module rules of a [`ModuleCatalog`] and
//! a live [`BusLookup`] where the rules call for verification.

mod bus;
mod catalog;
mod inventory;

pub use bus::{AttributeInfo, BusDevice, BusError, BusLookup, SnapshotBus};
pub use catalog::ModuleCatalog;
pub use inventory::load_inventory;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Error type produced by device handling.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The inventory entry has no `hostname` to derive host/port from.
    #[error("device '{0}' has no host:port entry")]
    MissingHostPort(String),
    /// The inventory document could not be parsed.
    #[error("inventory: {0}")]
    Inventory(String),
}

/// Pass-through group marker: the writer treats the value as pushed-in by
/// the client instead of actively polling the bus.
pub const CLIENT_GROUP: &str = "__CLIENT__";

/// Outcome of attribute resolution.
///
/// Resolution never fails hard; an [`Resolution::Unresolved`] device is
/// skipped by generators with a diagnostic instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The attribute to read and the optional batching group.
    Resolved {
        attribute: String,
        group: Option<String>,
    },
    /// No rule produced an attribute; carries the reason for diagnostics.
    Unresolved { reason: String },
}

/// One physical device entry from an inventory document.
///
/// Constructed by the inventory loader, populated field by field, mutated
/// once by attribute resolution, then read-only while artifacts are emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Device name used for generated artifact names.
    pub name: String,
    /// Device type tag from the inventory, e.g. `stepping_motor`.
    pub type_tag: String,
    /// Driver module classification selecting the generation rules.
    pub module: String,
    /// Bus address, e.g. `p09/motor/exp.01`.
    pub control_address: String,
    /// Bus database host with optional `:port`.
    pub host_port: Option<String>,
    /// Alternate ("peer") identity of the device, if resolved.
    pub peer_name: Option<String>,
    /// Bus database host:port of the peer identity.
    pub peer_host_port: Option<String>,
    /// Host derived from `host_port`.
    pub host: Option<String>,
    /// Port derived from `host_port`.
    pub port: Option<String>,
    /// Host derived from `peer_host_port`.
    pub peer_host: Option<String>,
    /// Port derived from `peer_host_port`.
    pub peer_port: Option<String>,
    /// Attribute to read, set by resolution.
    pub attribute: Option<String>,
    /// Batching group label, set by resolution.
    pub group: Option<String>,
}

/// Fields compared by [`Device::diff`], keyed by their inventory element
/// names.
const COMPARED_FIELDS: [&str; 7] = [
    "name",
    "type",
    "module",
    "device",
    "hostname",
    "sardananame",
    "sardanahostname",
];

impl Device {
    /// Split `host_port` into `host` and `port`.
    ///
    /// A missing `host_port` is a fatal configuration error for this device;
    /// generators skip the device and continue.
    pub fn split_host_port(&mut self) -> Result<(), DeviceError> {
        let host_port = self
            .host_port
            .as_deref()
            .ok_or_else(|| DeviceError::MissingHostPort(self.name.clone()))?;
        let (host, port) = split_colon(host_port);
        self.host = Some(host);
        self.port = port;
        if let Some(peer) = self.peer_host_port.as_deref() {
            let (peer_host, peer_port) = split_colon(peer);
            self.peer_host = Some(peer_host);
            self.peer_port = peer_port;
        }
        Ok(())
    }

    /// Try to locate this device under an alternate bus identity.
    ///
    /// Candidates are the recorded peer host and then `default_host`. On
    /// success the peer fields are filled from the live lookup; every
    /// failure path leaves them unset. Only complex-module flows consult the
    /// peer identity, and they can proceed without one, so this is silent.
    pub fn resolve_peer(&mut self, bus: &dyn BusLookup, default_host: Option<&str>) {
        let candidates: Vec<String> = [self.peer_host_port.as_deref(), default_host]
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        for host in candidates {
            let address = format!("{host}/{}", self.control_address);
            match bus.open(&address) {
                Ok(handle) => {
                    self.peer_name = Some(handle.name().to_string());
                    self.peer_host_port = Some(host.clone());
                    let (peer_host, peer_port) = split_colon(&host);
                    self.peer_host = Some(peer_host);
                    self.peer_port = peer_port;
                    return;
                }
                Err(err) => {
                    debug!(device = %self.name, %host, "peer lookup failed: {err}");
                }
            }
        }
    }

    /// Determine which attribute to read and how to group the read.
    ///
    /// Branch order: an embedded fourth bus-path segment wins; then the
    /// motor rules; then the module attribute table with live verification
    /// against the bus. The returned [`Resolution`] is also applied to
    /// `attribute`/`group`, after which the device is no longer mutated.
    pub fn resolve_attribute(
        &mut self,
        bus: Option<&dyn BusLookup>,
        catalog: &ModuleCatalog,
        prefer_client: bool,
    ) -> Resolution {
        let resolution = self.compute_resolution(bus, catalog, prefer_client);
        if let Resolution::Resolved { attribute, group } = &resolution {
            self.attribute = Some(attribute.clone());
            self.group = group.clone();
        }
        resolution
    }

    fn compute_resolution(
        &mut self,
        bus: Option<&dyn BusLookup>,
        catalog: &ModuleCatalog,
        prefer_client: bool,
    ) -> Resolution {
        // A fourth path segment names the attribute directly.
        if let Some((head, attribute)) = split_embedded_attribute(&self.control_address) {
            self.control_address = head;
            return Resolution::Resolved {
                attribute,
                group: None,
            };
        }

        if catalog.is_motor_module(&self.module) || catalog.is_motor_type(&self.type_tag) {
            return Resolution::Resolved {
                attribute: "Position".to_string(),
                group: prefer_client.then(|| CLIENT_GROUP.to_string()),
            };
        }

        if let Some((primary, fallback)) = catalog.attribute_rule(&self.module) {
            match self.verify_live_attribute(bus, primary) {
                Some(attribute) => {
                    return Resolution::Resolved {
                        attribute,
                        group: Some(CLIENT_GROUP.to_string()),
                    };
                }
                None => {
                    if let Some(fallback) = fallback {
                        return Resolution::Resolved {
                            attribute: fallback.to_string(),
                            group: Some(CLIENT_GROUP.to_string()),
                        };
                    }
                }
            }
            return Resolution::Unresolved {
                reason: format!(
                    "attribute '{primary}' of module '{}' not reachable and no fallback declared",
                    self.module
                ),
            };
        }

        Resolution::Unresolved {
            reason: format!("module '{}' has no resolution rule", self.module),
        }
    }

    /// Check the bus for a live attribute matching `wanted`; returns the
    /// live spelling on success.
    fn verify_live_attribute(&self, bus: Option<&dyn BusLookup>, wanted: &str) -> Option<String> {
        let bus = bus?;
        let address = match self.host_port.as_deref() {
            Some(host) => format!("{host}/{}", self.control_address),
            None => self.control_address.clone(),
        };
        let handle = match bus.open(&address) {
            Ok(handle) => handle,
            Err(err) => {
                debug!(device = %self.name, %address, "bus lookup failed: {err}");
                return None;
            }
        };
        match handle.attribute_names() {
            Ok(names) => names
                .into_iter()
                .find(|name| name.eq_ignore_ascii_case(wanted)),
            Err(err) => {
                debug!(device = %self.name, %address, "attribute listing failed: {err}");
                None
            }
        }
    }

    /// Normalize identity fields to lower case for case-insensitive naming.
    pub fn to_lowercase(&mut self) {
        self.name = self.name.to_lowercase();
        self.module = self.module.to_lowercase();
        self.control_address = self.control_address.to_lowercase();
        self.host_port = self.host_port.as_deref().map(str::to_lowercase);
    }

    /// Field-by-field comparison over the fixed inventory field set.
    ///
    /// Returns `field name -> (self value, other value)` for every field
    /// that differs; an empty map means the devices match. Used as the
    /// equality predicate by inventory reconciliation.
    pub fn diff(&self, other: &Device) -> BTreeMap<&'static str, (String, String)> {
        let mut out = BTreeMap::new();
        for field in COMPARED_FIELDS {
            let (a, b) = (self.compared_value(field), other.compared_value(field));
            if a != b {
                out.insert(field, (a, b));
            }
        }
        out
    }

    fn compared_value(&self, field: &str) -> String {
        match field {
            "name" => self.name.clone(),
            "type" => self.type_tag.clone(),
            "module" => self.module.clone(),
            "device" => self.control_address.clone(),
            "hostname" => self.host_port.clone().unwrap_or_default(),
            "sardananame" => self.peer_name.clone().unwrap_or_default(),
            "sardanahostname" => self.peer_host_port.clone().unwrap_or_default(),
            _ => String::new(),
        }
    }
}

fn split_embedded_attribute(address: &str) -> Option<(String, String)> {
    let segments: Vec<&str> = address.split('/').collect();
    if segments.len() > 3 {
        Some((segments[..3].join("/"), segments[3].to_string()))
    } else {
        None
    }
}

fn split_colon(host_port: &str) -> (String, Option<String>) {
    match host_port.split_once(':') {
        Some((host, port)) => (host.to_string(), Some(port.to_string())),
        None => (host_port.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::tests::snapshot_with;

    fn motor_device() -> Device {
        Device {
            name: "exp_mot01".into(),
            type_tag: "stepping_motor".into(),
            module: "oms58".into(),
            control_address: "p09/motor/exp.01".into(),
            host_port: Some("haspp09:10000".into()),
            ..Device::default()
        }
    }

    #[test]
    fn split_host_port_derives_host_and_port() {
        let mut device = motor_device();
        device.split_host_port().expect("split");
        assert_eq!(device.host.as_deref(), Some("haspp09"));
        assert_eq!(device.port.as_deref(), Some("10000"));
    }

    #[test]
    fn split_host_port_without_port() {
        let mut device = motor_device();
        device.host_port = Some("haspp09".into());
        device.split_host_port().expect("split");
        assert_eq!(device.host.as_deref(), Some("haspp09"));
        assert_eq!(device.port, None);
    }

    #[test]
    fn missing_host_port_is_a_configuration_error() {
        let mut device = motor_device();
        device.host_port = None;
        let err = device.split_host_port().expect_err("must fail");
        assert!(matches!(err, DeviceError::MissingHostPort(name) if name == "exp_mot01"));
    }

    #[test]
    fn motor_module_resolves_to_position() {
        let catalog = ModuleCatalog::default();
        let mut device = motor_device();
        let resolution = device.resolve_attribute(None, &catalog, true);
        assert_eq!(
            resolution,
            Resolution::Resolved {
                attribute: "Position".into(),
                group: Some(CLIENT_GROUP.into()),
            }
        );
        assert_eq!(device.attribute.as_deref(), Some("Position"));
        assert_eq!(device.group.as_deref(), Some(CLIENT_GROUP));
    }

    #[test]
    fn motor_without_client_preference_has_no_group() {
        let catalog = ModuleCatalog::default();
        let mut device = motor_device();
        let resolution = device.resolve_attribute(None, &catalog, false);
        assert_eq!(
            resolution,
            Resolution::Resolved {
                attribute: "Position".into(),
                group: None,
            }
        );
        assert_eq!(device.group, None);
    }

    #[test]
    fn motor_type_tag_matches_even_for_unknown_module() {
        let catalog = ModuleCatalog::default();
        let mut device = motor_device();
        device.module = "unheard_of".into();
        let resolution = device.resolve_attribute(None, &catalog, false);
        assert!(matches!(resolution, Resolution::Resolved { attribute, .. } if attribute == "Position"));
    }

    #[test]
    fn embedded_fourth_segment_wins_and_is_stripped() {
        let catalog = ModuleCatalog::default();
        let mut device = motor_device();
        device.control_address = "p09/adc/exp.02/Voltage".into();
        let resolution = device.resolve_attribute(None, &catalog, true);
        assert_eq!(
            resolution,
            Resolution::Resolved {
                attribute: "Voltage".into(),
                group: None,
            }
        );
        assert_eq!(device.control_address, "p09/adc/exp.02");
    }

    #[test]
    fn attribute_table_uses_live_lookup_then_fallback() {
        let catalog = ModuleCatalog::default();
        let bus = snapshot_with(
            "haspp09:10000/p09/counter/exp.01",
            "p09/counter/exp.01",
            &["counts"],
        );

        let mut live = Device {
            name: "exp_c01".into(),
            type_tag: "counter".into(),
            module: "counter_tango".into(),
            control_address: "p09/counter/exp.01".into(),
            host_port: Some("haspp09:10000".into()),
            ..Device::default()
        };
        let resolution = live.resolve_attribute(Some(&bus), &catalog, false);
        // Live spelling from the bus wins over the table spelling.
        assert_eq!(
            resolution,
            Resolution::Resolved {
                attribute: "counts".into(),
                group: Some(CLIENT_GROUP.into()),
            }
        );

        let mut unreachable = live.clone();
        unreachable.control_address = "p09/counter/exp.99".into();
        unreachable.attribute = None;
        unreachable.group = None;
        let resolution = unreachable.resolve_attribute(Some(&bus), &catalog, false);
        assert_eq!(
            resolution,
            Resolution::Resolved {
                attribute: "Value".into(),
                group: Some(CLIENT_GROUP.into()),
            }
        );
    }

    #[test]
    fn unknown_module_is_unresolved_not_an_error() {
        let catalog = ModuleCatalog::default();
        let mut device = motor_device();
        device.module = "chiller".into();
        device.type_tag = "cooling".into();
        let resolution = device.resolve_attribute(None, &catalog, false);
        assert!(matches!(resolution, Resolution::Unresolved { reason } if reason.contains("chiller")));
        assert_eq!(device.attribute, None);
    }

    #[test]
    fn peer_resolution_failure_is_silent() {
        let bus = snapshot_with("nonmatching/address", "x/y/z", &[]);
        let mut device = motor_device();
        device.peer_host_port = Some("haspp09sardana:10000".into());
        device.resolve_peer(&bus, Some("haspp09:10000"));
        assert_eq!(device.peer_name, None);
    }

    #[test]
    fn peer_resolution_fills_identity_from_live_lookup() {
        let bus = snapshot_with(
            "haspp09sardana:10000/p09/motor/exp.01",
            "motor/exp_mot01",
            &["Position"],
        );
        let mut device = motor_device();
        device.peer_host_port = Some("haspp09sardana:10000".into());
        device.resolve_peer(&bus, None);
        assert_eq!(device.peer_name.as_deref(), Some("motor/exp_mot01"));
        assert_eq!(device.peer_host.as_deref(), Some("haspp09sardana"));
        assert_eq!(device.peer_port.as_deref(), Some("10000"));
    }

    #[test]
    fn lowercase_normalizes_identity_fields() {
        let mut device = motor_device();
        device.name = "EXP_MOT01".into();
        device.control_address = "P09/Motor/Exp.01".into();
        device.to_lowercase();
        assert_eq!(device.name, "exp_mot01");
        assert_eq!(device.control_address, "p09/motor/exp.01");
    }

    #[test]
    fn diff_is_empty_for_equal_devices() {
        let device = motor_device();
        assert!(device.diff(&device.clone()).is_empty());
    }

    #[test]
    fn diff_reports_both_sides_of_each_difference() {
        let a = motor_device();
        let mut b = a.clone();
        b.module = "omsvme58".into();
        b.host_port = Some("haspp09:10001".into());
        let diff = a.diff(&b);
        assert_eq!(diff.len(), 2);
        assert_eq!(
            diff.get("module"),
            Some(&("oms58".to_string(), "omsvme58".to_string()))
        );
        assert_eq!(
            diff.get("hostname"),
            Some(&("haspp09:10000".to_string(), "haspp09:10001".to_string()))
        );
    }
}
