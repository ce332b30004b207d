//! Inventory-driven generator.
//!
//! Walks the device entries of an inventory document and emits the matching
//! artifacts per device: one datasource per attribute for multi-attribute
//! modules, literal-substituted module templates where registered, and a
//! plain bus datasource from attribute resolution otherwise. A device whose
//! resolution fails is skipped with a diagnostic; the run continues.

use nxs_device::{load_inventory, BusLookup, Device, ModuleCatalog, Resolution};
use nxs_xml::{TangoMember, TangoSource, XmlDoc};
use tracing::{info, warn};

use crate::artifact::ArtifactCatalog;
use crate::sink::Sink;
use crate::templates::TemplateCatalog;
use crate::CreateError;

/// Configuration of one inventory-driven run.
#[derive(Debug, Clone)]
pub struct OnlineDsConfig {
    /// Inventory document text.
    pub inventory: String,
    /// Entry group name substituted for `$(__entryname__)` in module
    /// templates.
    pub entry_name: String,
    /// Mark motor reads as pass-through (`__CLIENT__` group).
    pub client_like: bool,
    /// Prefix prepended to generated datasource names.
    pub ds_prefix: Option<String>,
    /// Default bus host:port consulted when resolving peer identities.
    pub peer_host: Option<String>,
    pub overwrite: bool,
    pub lower: bool,
}

impl Default for OnlineDsConfig {
    fn default() -> Self {
        OnlineDsConfig {
            inventory: String::new(),
            entry_name: "scan".into(),
            client_like: true,
            ds_prefix: None,
            peer_host: None,
            overwrite: false,
            lower: false,
        }
    }
}

/// Run the inventory-driven generator against `sink`.
pub fn generate_online(
    config: &OnlineDsConfig,
    modules: &ModuleCatalog,
    templates: &TemplateCatalog,
    bus: Option<&dyn BusLookup>,
    sink: &mut dyn Sink,
) -> Result<ArtifactCatalog, CreateError> {
    let devices = load_inventory(&config.inventory)?;
    let mut catalog = ArtifactCatalog::new();

    for mut device in devices {
        if config.lower {
            device.to_lowercase();
        }
        if let Err(err) = device.split_host_port() {
            warn!("SKIPPING '{}': {err}", device.name);
            continue;
        }

        let multi = modules.multi_attributes(&device.module).map(<[String]>::to_vec);
        let template_files = modules.template_files(&device.module).map(<[String]>::to_vec);
        if multi.is_some() || template_files.is_some() {
            // Complex-module flows may use the peer identity; they proceed
            // without one if the lookup fails.
            if let Some(bus) = bus {
                device.resolve_peer(bus, config.peer_host.as_deref());
            }
        }

        let mut handled = false;
        if let Some(attributes) = multi {
            emit_multi_attributes(config, &device, &attributes, &mut catalog);
            handled = true;
        }
        if let Some(files) = template_files {
            emit_module_templates(config, &device, &files, templates, &mut catalog);
            handled = true;
        }
        if handled {
            continue;
        }

        match device.resolve_attribute(bus, modules, config.client_like) {
            Resolution::Resolved { .. } => {
                let name = prefixed(config, &device.name);
                info!("CREATING datasource '{name}'");
                catalog.insert_datasource(&name, bus_datasource(&device, &name)?.to_xml());
            }
            Resolution::Unresolved { reason } => {
                warn!("SKIPPING '{}': {reason}", device.name);
            }
        }
    }

    catalog.check_conflicts(sink, config.overwrite)?;
    catalog.flush(sink)?;
    Ok(catalog)
}

fn prefixed(config: &OnlineDsConfig, name: &str) -> String {
    match config.ds_prefix.as_deref() {
        Some(prefix) => format!("{prefix}{name}"),
        None => name.to_string(),
    }
}

fn emit_multi_attributes(
    config: &OnlineDsConfig,
    device: &Device,
    attributes: &[String],
    catalog: &mut ArtifactCatalog,
) {
    for attribute in attributes {
        let name = prefixed(config, &format!("{}_{}", device.name, attribute.to_lowercase()));
        info!("CREATING datasource '{name}'");
        let mut doc = XmlDoc::new();
        let ds = doc.datasource(doc.root(), Some(&name));
        let source = TangoSource {
            device: device.control_address.clone(),
            member: TangoMember::Attribute,
            record: attribute.clone(),
            host: device.host.clone(),
            port: device.port.clone(),
            // Attributes of one physical device batch under its name.
            group: Some(device.name.clone()),
        };
        // The node is fresh, so the initializer cannot collide.
        let _ = doc.init_tango(ds, &source);
        catalog.insert_datasource(&name, doc.to_xml());
    }
}

fn emit_module_templates(
    config: &OnlineDsConfig,
    device: &Device,
    files: &[String],
    templates: &TemplateCatalog,
    catalog: &mut ArtifactCatalog,
) {
    for file in files {
        let Some(text) = templates.file_text(file) else {
            warn!("SKIPPING template '{file}' of '{}': no such template file", device.name);
            continue;
        };
        // Module templates are filled by literal replacement; every token
        // is satisfiable from the device record, so nothing is pruned.
        let text = text
            .replace("$(name)", &device.name)
            .replace("$(device)", &device.control_address)
            .replace("$(hostname)", device.host_port.as_deref().unwrap_or_default())
            .replace("$(__entryname__)", &config.entry_name);

        if let Some(stem) = file.strip_suffix(".ds.xml") {
            let name = artifact_name(device, stem);
            info!("CREATING datasource '{name}'");
            catalog.insert_datasource(&name, text);
        } else if let Some(stem) = file.strip_suffix(".xml") {
            let name = artifact_name(device, stem);
            info!("CREATING component '{name}'");
            catalog.insert_component(&name, text);
        }
    }
}

/// Template file stems are module-based; the emitted artifact is named
/// after the device: `pilatus_postrun` becomes `<device>_postrun`.
fn artifact_name(device: &Device, stem: &str) -> String {
    let module = device.module.to_lowercase();
    match stem.strip_prefix(&module) {
        Some(rest) => format!("{}{rest}", device.name),
        None => format!("{}_{stem}", device.name),
    }
}

fn bus_datasource(device: &Device, name: &str) -> Result<XmlDoc, CreateError> {
    let mut doc = XmlDoc::new();
    let ds = doc.datasource(doc.root(), Some(name));
    let attribute = device
        .attribute
        .clone()
        .ok_or_else(|| CreateError::Parameter(format!("device '{}' has no attribute", device.name)))?;
    doc.init_tango(
        ds,
        &TangoSource {
            device: device.control_address.clone(),
            member: TangoMember::Attribute,
            record: attribute,
            host: device.host.clone(),
            port: device.port.clone(),
            group: device.group.clone(),
        },
    )?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::{generate_online, OnlineDsConfig};
    use crate::sink::{MemSink, Sink};
    use crate::templates::TemplateCatalog;
    use nxs_device::ModuleCatalog;

    const INVENTORY: &str = r#"<hw>
  <device>
    <name>exp_mot01</name>
    <type>stepping_motor</type>
    <module>oms58</module>
    <device>p09/motor/exp.01</device>
    <hostname>haspp09:10000</hostname>
  </device>
  <device>
    <name>mypilatus</name>
    <type>detector</type>
    <module>pilatus</module>
    <device>p09/pilatus/exp.01</device>
    <hostname>haspp09:10000</hostname>
  </device>
  <device>
    <name>broken</name>
    <type>counter</type>
    <module>counter_tango</module>
    <device>p09/counter/exp.09</device>
  </device>
  <device>
    <name>chiller01</name>
    <type>cooling</type>
    <module>chiller</module>
    <device>p09/chiller/exp.01</device>
    <hostname>haspp09:10000</hostname>
  </device>
</hw>
"#;

    fn run(config: OnlineDsConfig) -> MemSink {
        let mut sink = MemSink::new();
        generate_online(
            &config,
            &ModuleCatalog::default(),
            &TemplateCatalog::default(),
            None,
            &mut sink,
        )
        .expect("generate");
        sink
    }

    #[test]
    fn motor_resolves_to_position_with_client_group() {
        let sink = run(OnlineDsConfig {
            inventory: INVENTORY.into(),
            ..OnlineDsConfig::default()
        });
        let xml = sink.datasource("exp_mot01").expect("motor datasource");
        assert!(xml.contains("type=\"TANGO\""));
        assert!(xml.contains("<record name=\"Position\"/>"));
        assert!(xml.contains("group=\"__CLIENT__\""));
        assert!(xml.contains("hostname=\"haspp09\""));
        assert!(xml.contains("port=\"10000\""));
    }

    #[test]
    fn without_client_like_the_group_is_absent() {
        let sink = run(OnlineDsConfig {
            inventory: INVENTORY.into(),
            client_like: false,
            ..OnlineDsConfig::default()
        });
        let xml = sink.datasource("exp_mot01").expect("motor datasource");
        assert!(xml.contains("<record name=\"Position\"/>"));
        assert!(!xml.contains("__CLIENT__"));
    }

    #[test]
    fn multi_attribute_module_fans_out_per_attribute() {
        let sink = run(OnlineDsConfig {
            inventory: INVENTORY.into(),
            ..OnlineDsConfig::default()
        });
        let names = sink.list_datasources().expect("list");
        for attr in ["delaytime", "exposureperiod", "exposuretime", "nbexposures", "nbframes"] {
            assert!(
                names.contains(&format!("mypilatus_{attr}")),
                "missing datasource for {attr}"
            );
        }
        let xml = sink.datasource("mypilatus_exposuretime").expect("fanned out");
        assert!(xml.contains("<record name=\"ExposureTime\"/>"));
        assert!(xml.contains("group=\"mypilatus\""));
    }

    #[test]
    fn module_templates_are_substituted_and_routed_by_suffix() {
        let sink = run(OnlineDsConfig {
            inventory: INVENTORY.into(),
            entry_name: "entry001".into(),
            ..OnlineDsConfig::default()
        });
        let comp = sink.component("mypilatus").expect("template component");
        assert!(comp.contains("name=\"entry001\""));
        assert!(comp.contains("name=\"mypilatus\""));
        assert!(comp.contains("p09/pilatus/exp.01"));
        assert!(!comp.contains("$("));

        let ds = sink.datasource("mypilatus_postrun").expect("postrun datasource");
        assert!(ds.contains("type=\"CLIENT\""));
        assert!(ds.contains("mypilatus_postrun"));
    }

    #[test]
    fn devices_without_host_or_rule_are_skipped_not_fatal() {
        let sink = run(OnlineDsConfig {
            inventory: INVENTORY.into(),
            ..OnlineDsConfig::default()
        });
        // "broken" has no hostname; "chiller01" has no module rule.
        assert!(sink.datasource("broken").is_none());
        assert!(sink.datasource("chiller01").is_none());
        // The rest of the run still happened.
        assert!(sink.datasource("exp_mot01").is_some());
    }

    #[test]
    fn ds_prefix_applies_to_generated_datasources() {
        let sink = run(OnlineDsConfig {
            inventory: INVENTORY.into(),
            ds_prefix: Some("p09_".into()),
            ..OnlineDsConfig::default()
        });
        assert!(sink.datasource("p09_exp_mot01").is_some());
        assert!(sink.datasource("p09_mypilatus_exposuretime").is_some());
    }

    #[test]
    fn lower_normalizes_inventory_names() {
        let inventory = INVENTORY.replace("exp_mot01", "EXP_MOT01");
        let sink = run(OnlineDsConfig {
            inventory,
            lower: true,
            ..OnlineDsConfig::default()
        });
        assert!(sink.datasource("exp_mot01").is_some());
    }

    #[test]
    fn empty_inventory_generates_nothing() {
        let sink = run(OnlineDsConfig {
            inventory: "<hw/>".into(),
            ..OnlineDsConfig::default()
        });
        assert!(sink.list_datasources().expect("list").is_empty());
        assert!(sink.list_components().expect("list").is_empty());
    }
}
