//! Bus lookup abstraction.
//!
//! Generators talk to the device bus through [`BusLookup`] / [`BusDevice`];
//! the live transport lives outside this workspace. [`SnapshotBus`] serves a
//! recorded JSON snapshot of the bus, which backs tests and offline CLI
//! runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type produced by bus lookups.
#[derive(Debug, Error)]
pub enum BusError {
    /// No device is exported under the requested address.
    #[error("no device at address '{0}'")]
    NotFound(String),
    /// The requested attribute does not exist on the device.
    #[error("no attribute '{0}'")]
    NoAttribute(String),
    /// The lookup itself failed (transport, snapshot file, ...).
    #[error("lookup: {0}")]
    Lookup(String),
}

/// Metadata of one bus attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeInfo {
    /// Data shape; empty for scalars.
    #[serde(default)]
    pub shape: Vec<usize>,
    /// Data kind, e.g. `float64`.
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Live handle to one bus device.
pub trait BusDevice {
    /// Canonical name the bus reports for this device.
    fn name(&self) -> &str;
    /// Names of the exported attributes.
    fn attribute_names(&self) -> Result<Vec<String>, BusError>;
    /// Metadata of one attribute.
    fn attribute_info(&self, name: &str) -> Result<AttributeInfo, BusError>;
    /// Names of the exported commands.
    fn command_names(&self) -> Result<Vec<String>, BusError>;
}

/// Capability to open bus devices by address.
pub trait BusLookup {
    /// Open a live handle for `address`, e.g. `haspp09:10000/p09/motor/exp.01`
    /// or a bare `p09/motor/exp.01` against the default database.
    fn open(&self, address: &str) -> Result<Box<dyn BusDevice + '_>, BusError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SnapshotDevice {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeInfo>,
    #[serde(default)]
    commands: Vec<String>,
}

/// A bus served from a recorded JSON snapshot.
///
/// Snapshot format:
///
/// ```json
/// {
///   "host": "haspp09:10000",
///   "devices": {
///     "haspp09:10000/p09/motor/exp.01": {
///       "name": "exp_mot01",
///       "attributes": {
///         "Position": { "kind": "float64", "unit": "mm" }
///       },
///       "commands": ["Calibrate"]
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotBus {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    devices: BTreeMap<String, SnapshotDevice>,
}

impl SnapshotBus {
    /// Parse a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self, BusError> {
        serde_json::from_str(text).map_err(|err| BusError::Lookup(err.to_string()))
    }

    /// Load a snapshot from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, BusError> {
        let text = fs::read_to_string(path)
            .map_err(|err| BusError::Lookup(format!("{}: {err}", path.display())))?;
        Self::from_json(&text)
    }

    /// The default bus database host recorded in the snapshot.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    fn find(&self, address: &str) -> Option<(&str, &SnapshotDevice)> {
        if let Some((key, device)) = self.devices.get_key_value(address) {
            return Some((key, device));
        }
        // A bare address also matches a snapshot recorded against the
        // default database host.
        if let Some(host) = &self.host {
            let qualified = format!("{host}/{address}");
            if let Some((key, device)) = self.devices.get_key_value(&qualified) {
                return Some((key, device));
            }
        }
        None
    }
}

struct SnapshotHandle<'a> {
    name: String,
    device: &'a SnapshotDevice,
}

impl BusDevice for SnapshotHandle<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute_names(&self) -> Result<Vec<String>, BusError> {
        Ok(self.device.attributes.keys().cloned().collect())
    }

    fn attribute_info(&self, name: &str) -> Result<AttributeInfo, BusError> {
        self.device
            .attributes
            .get(name)
            .cloned()
            .ok_or_else(|| BusError::NoAttribute(name.to_string()))
    }

    fn command_names(&self) -> Result<Vec<String>, BusError> {
        Ok(self.device.commands.clone())
    }
}

impl BusLookup for SnapshotBus {
    fn open(&self, address: &str) -> Result<Box<dyn BusDevice + '_>, BusError> {
        let (key, device) = self
            .find(address)
            .ok_or_else(|| BusError::NotFound(address.to_string()))?;
        let name = device
            .name
            .clone()
            .unwrap_or_else(|| key.split_once('/').map(|(_, rest)| rest).unwrap_or(key).to_string());
        Ok(Box::new(SnapshotHandle { name, device }))
    }
}
