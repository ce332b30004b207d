//! Per-device field generator.
//!
//! Builds one component per device with a field at a caller-specified (or
//! default) Nexus path, each field referencing a datasource by name. The
//! datasource names default to the device names and can be overridden 1:1.

use nxs_path::parse_path;
use nxs_xml::{Strategy, StrategyMode, XmlDoc};
use tracing::info;

use crate::artifact::ArtifactCatalog;
use crate::sink::Sink;
use crate::{expand_names, CreateError};

/// Configuration of one per-device run.
#[derive(Debug, Clone)]
pub struct DeviceDsConfig {
    /// Device names, or range prefixes when `first`/`last` are set.
    pub names: Vec<String>,
    pub first: Option<u32>,
    pub last: Option<u32>,
    /// Explicit datasource names (or range prefixes), matched 1:1 against
    /// the device names; empty means "same as the device names".
    pub datasources: Vec<String>,
    /// Nexus path of the generated field; the default is
    /// `<entry>:NXentry/instrument:NXinstrument/collection:NXcollection`
    /// with the device name as the field.
    pub path: Option<String>,
    pub entry_name: String,
    pub data_type: String,
    pub units: Option<String>,
    pub mode: StrategyMode,
    pub overwrite: bool,
    pub lower: bool,
}

impl Default for DeviceDsConfig {
    fn default() -> Self {
        DeviceDsConfig {
            names: Vec::new(),
            first: None,
            last: None,
            datasources: Vec::new(),
            path: None,
            entry_name: "scan".into(),
            data_type: "NX_FLOAT64".into(),
            units: None,
            mode: StrategyMode::Step,
            overwrite: false,
            lower: false,
        }
    }
}

/// Run the per-device generator against `sink`.
pub fn generate_device_fields(
    config: &DeviceDsConfig,
    sink: &mut dyn Sink,
) -> Result<ArtifactCatalog, CreateError> {
    let mut names = expand_names(&config.names, config.first, config.last)?;
    let mut datasources = if config.datasources.is_empty() {
        names.clone()
    } else {
        expand_names(&config.datasources, config.first, config.last)?
    };
    if names.len() != datasources.len() {
        return Err(CreateError::Parameter(format!(
            "{} device name(s) do not match {} datasource name(s)",
            names.len(),
            datasources.len()
        )));
    }
    if config.lower {
        for name in names.iter_mut().chain(datasources.iter_mut()) {
            *name = name.to_lowercase();
        }
    }

    let mut catalog = ArtifactCatalog::new();
    for (name, datasource) in names.iter().zip(&datasources) {
        info!("CREATING component '{name}' -> $datasources.{datasource}");
        catalog.insert_component(name, component_for(config, name, datasource).to_xml());
    }

    catalog.check_conflicts(sink, config.overwrite)?;
    catalog.flush(sink)?;
    Ok(catalog)
}

fn component_for(config: &DeviceDsConfig, name: &str, datasource: &str) -> XmlDoc {
    let mut doc = XmlDoc::new();
    let mut parent = doc.root();

    match config.path.as_deref() {
        Some(path) => {
            let parsed = parse_path(path);
            for level in &parsed.groups {
                parent = doc.group(parent, &level.name, &level.nx_type);
            }
            let leaf = parsed.field.as_deref().unwrap_or(name);
            attach_field(&mut doc, parent, config, leaf, datasource);
        }
        None => {
            let entry = doc.group(parent, &config.entry_name, "NXentry");
            let instrument = doc.group(entry, "instrument", "NXinstrument");
            let collection = doc.group(instrument, "collection", "NXcollection");
            attach_field(&mut doc, collection, config, name, datasource);
        }
    }
    doc
}

fn attach_field(doc: &mut XmlDoc, parent: nxs_xml::NodeId, config: &DeviceDsConfig, leaf: &str, datasource: &str) {
    let field = doc.field(parent, leaf, &config.data_type, config.units.as_deref());
    doc.text(field, &format!("$datasources.{datasource}"));
    doc.set_strategy(field, &Strategy::new(config.mode));
}

#[cfg(test)]
mod tests {
    use super::{generate_device_fields, DeviceDsConfig};
    use crate::sink::{MemSink, Sink};
    use crate::CreateError;

    fn config(names: &[&str]) -> DeviceDsConfig {
        DeviceDsConfig {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..DeviceDsConfig::default()
        }
    }

    #[test]
    fn default_path_places_field_under_collection() {
        let cfg = config(&["exp_mot01"]);
        let mut sink = MemSink::new();
        generate_device_fields(&cfg, &mut sink).expect("generate");
        let xml = sink.component("exp_mot01").expect("stored");
        assert!(xml.contains("type=\"NXcollection\""));
        assert!(xml.contains("<field name=\"exp_mot01\""));
        assert!(xml.contains("$datasources.exp_mot01"));
    }

    #[test]
    fn explicit_path_drives_the_group_tree() {
        let mut cfg = config(&["exp_mot01"]);
        cfg.path = Some("scan:NXentry/instrument/detector:NXdetector/counts".into());
        let mut sink = MemSink::new();
        generate_device_fields(&cfg, &mut sink).expect("generate");
        let xml = sink.component("exp_mot01").expect("stored");
        assert!(xml.contains("type=\"NXdetector\""));
        assert!(xml.contains("<field name=\"counts\""));
    }

    #[test]
    fn path_without_leaf_falls_back_to_device_name() {
        let mut cfg = config(&["exp_mot01"]);
        cfg.path = Some("".into());
        let mut sink = MemSink::new();
        generate_device_fields(&cfg, &mut sink).expect("generate");
        let xml = sink.component("exp_mot01").expect("stored");
        assert!(xml.contains("<field name=\"exp_mot01\""));
    }

    #[test]
    fn datasource_names_pair_one_to_one() {
        let mut cfg = config(&["exp_mot"]);
        cfg.first = Some(1);
        cfg.last = Some(2);
        cfg.datasources = vec!["motor_ds".into()];
        let mut sink = MemSink::new();
        generate_device_fields(&cfg, &mut sink).expect("generate");
        let xml = sink.component("exp_mot01").expect("stored");
        assert!(xml.contains("$datasources.motor_ds01"));
        let xml = sink.component("exp_mot02").expect("stored");
        assert!(xml.contains("$datasources.motor_ds02"));
    }

    #[test]
    fn mismatched_expansion_counts_fail_fast() {
        let mut cfg = config(&["a", "b"]);
        cfg.datasources = vec!["only_one".into()];
        let mut sink = MemSink::new();
        let err = generate_device_fields(&cfg, &mut sink).expect_err("count mismatch");
        assert!(matches!(err, CreateError::Parameter(_)));
        assert!(sink.list_components().expect("list").is_empty());
    }

    #[test]
    fn existing_name_aborts_without_overwrite() {
        let mut sink = MemSink::new();
        sink.store_component("exp_mot01", "<definition/>").expect("seed");
        let cfg = config(&["exp_mot01"]);
        let err = generate_device_fields(&cfg, &mut sink).expect_err("conflict");
        assert!(matches!(err, CreateError::ComponentExists(_)));
    }
}
