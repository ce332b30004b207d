//! Inventory document loading.
//!
//! An inventory is a simple nested element format: a root element holding
//! `<device>` entries, each with child elements `name`, `type`, `module`,
//! `device` (the bus address), `hostname` and optional `sardananame` /
//! `sardanahostname` peer identity. Unknown children are ignored.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{Device, DeviceError};

/// Parse an inventory document into its device entries.
///
/// The loader only fails on malformed XML; per-device consistency (such as
/// a missing `hostname`) is checked later by the generators so one bad
/// entry cannot poison the whole run.
pub fn load_inventory(xml: &str) -> Result<Vec<Device>, DeviceError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut devices = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<Device> = None;
    let mut field: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                depth += 1;
                let tag = String::from_utf8_lossy(start.name().as_ref()).to_string();
                if depth == 2 && tag == "device" {
                    current = Some(Device::default());
                } else if depth == 3 && current.is_some() {
                    field = Some(tag);
                }
            }
            Ok(Event::Empty(_)) => {}
            Ok(Event::Text(text)) => {
                if let (Some(device), Some(name)) = (current.as_mut(), field.as_deref()) {
                    let value = text
                        .unescape()
                        .map_err(|err| DeviceError::Inventory(err.to_string()))?
                        .trim()
                        .to_string();
                    set_field(device, name, value);
                }
            }
            Ok(Event::End(_)) => {
                if depth == 3 {
                    field = None;
                } else if depth == 2 {
                    if let Some(device) = current.take() {
                        devices.push(device);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(DeviceError::Inventory(err.to_string())),
        }
        buf.clear();
    }

    Ok(devices)
}

fn set_field(device: &mut Device, element: &str, value: String) {
    if value.is_empty() {
        return;
    }
    match element {
        "name" => device.name = value,
        "type" => device.type_tag = value,
        "module" => device.module = value,
        "device" => device.control_address = value,
        "hostname" => device.host_port = Some(value),
        "sardananame" => device.peer_name = Some(value),
        "sardanahostname" => device.peer_host_port = Some(value),
        _ => {}
    }
}
