//! Simple field generator.
//!
//! Builds one component per device name with a fixed
//! entry/instrument/collection group tree and a single field, either
//! reading an inline pass-through client record or referencing an external
//! datasource generated alongside.

use nxs_xml::{Strategy, StrategyMode, XmlDoc};
use tracing::info;

use crate::artifact::ArtifactCatalog;
use crate::sink::Sink;
use crate::{expand_names, CreateError};

/// Configuration of one simple-field run.
#[derive(Debug, Clone)]
pub struct ClientFieldConfig {
    /// Device names, or range prefixes when `first`/`last` are set.
    pub names: Vec<String>,
    pub first: Option<u32>,
    pub last: Option<u32>,
    /// Entry group name.
    pub entry_name: String,
    /// Instrument group name.
    pub instrument_name: String,
    /// Collection group name.
    pub collection_name: String,
    /// NeXus data type of the generated field.
    pub data_type: String,
    pub units: Option<String>,
    pub mode: StrategyMode,
    /// Emit a named CLIENT datasource per field and reference it from the
    /// field instead of embedding the record inline.
    pub client_datasources: bool,
    pub overwrite: bool,
    /// Normalize generated names to lower case.
    pub lower: bool,
}

impl Default for ClientFieldConfig {
    fn default() -> Self {
        ClientFieldConfig {
            names: Vec::new(),
            first: None,
            last: None,
            entry_name: "scan".into(),
            instrument_name: "instrument".into(),
            collection_name: "collection".into(),
            data_type: "NX_FLOAT64".into(),
            units: None,
            mode: StrategyMode::Step,
            client_datasources: false,
            overwrite: false,
            lower: false,
        }
    }
}

/// Run the simple field generator against `sink`.
pub fn generate_client_fields(
    config: &ClientFieldConfig,
    sink: &mut dyn Sink,
) -> Result<ArtifactCatalog, CreateError> {
    let mut names = expand_names(&config.names, config.first, config.last)?;
    if config.lower {
        for name in &mut names {
            *name = name.to_lowercase();
        }
    }

    let mut catalog = ArtifactCatalog::new();
    for name in &names {
        info!("CREATING component '{name}'");
        catalog.insert_component(name, component_for(config, name).to_xml());
        if config.client_datasources {
            info!("CREATING datasource '{name}'");
            catalog.insert_datasource(name, client_datasource(name)?.to_xml());
        }
    }

    catalog.check_conflicts(sink, config.overwrite)?;
    catalog.flush(sink)?;
    Ok(catalog)
}

fn component_for(config: &ClientFieldConfig, name: &str) -> XmlDoc {
    let mut doc = XmlDoc::new();
    let entry = doc.group(doc.root(), &config.entry_name, "NXentry");
    let instrument = doc.group(entry, &config.instrument_name, "NXinstrument");
    let collection = doc.group(instrument, &config.collection_name, "NXcollection");
    let field = doc.field(collection, name, &config.data_type, config.units.as_deref());
    if config.client_datasources {
        doc.text(field, &format!("$datasources.{name}"));
    } else {
        let ds = doc.datasource(field, None);
        // Inline init on a fresh node cannot collide with another type.
        let _ = doc.init_client(ds, name);
    }
    doc.set_strategy(field, &Strategy::new(config.mode));
    doc
}

fn client_datasource(name: &str) -> Result<XmlDoc, CreateError> {
    let mut doc = XmlDoc::new();
    let ds = doc.datasource(doc.root(), Some(name));
    doc.init_client(ds, name)?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::{generate_client_fields, ClientFieldConfig};
    use crate::sink::{MemSink, Sink};
    use crate::CreateError;
    use nxs_xml::XmlDoc;

    fn config(names: &[&str]) -> ClientFieldConfig {
        ClientFieldConfig {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..ClientFieldConfig::default()
        }
    }

    #[test]
    fn client_linking_emits_a_client_datasource() {
        let mut cfg = config(&["starttimetest"]);
        cfg.client_datasources = true;
        let mut sink = MemSink::new();
        generate_client_fields(&cfg, &mut sink).expect("generate");

        let ds_xml = sink.datasource("starttimetest").expect("datasource stored");
        let doc = XmlDoc::parse(ds_xml).expect("parse datasource");
        let sources: Vec<_> = doc
            .children(doc.root())
            .iter()
            .filter(|id| doc.tag(**id) == Some("datasource"))
            .copied()
            .collect();
        assert_eq!(sources.len(), 1);
        assert_eq!(doc.attr(sources[0], "type"), Some("CLIENT"));
        let record = doc
            .children(sources[0])
            .iter()
            .find(|id| doc.tag(**id) == Some("record"))
            .copied()
            .expect("record child");
        assert_eq!(doc.attr(record, "name"), Some("starttimetest"));

        let comp_xml = sink.component("starttimetest").expect("component stored");
        assert!(comp_xml.contains("$datasources.starttimetest"));
    }

    #[test]
    fn inline_mode_embeds_the_record() {
        let cfg = config(&["exp_p01"]);
        let mut sink = MemSink::new();
        generate_client_fields(&cfg, &mut sink).expect("generate");
        assert!(sink.datasource("exp_p01").is_none());
        let xml = sink.component("exp_p01").expect("component stored");
        assert!(xml.contains("type=\"CLIENT\""));
        assert!(xml.contains("<record name=\"exp_p01\"/>"));
    }

    #[test]
    fn group_tree_is_entry_instrument_collection() {
        let cfg = config(&["exp_c01"]);
        let mut sink = MemSink::new();
        generate_client_fields(&cfg, &mut sink).expect("generate");
        let xml = sink.component("exp_c01").expect("component stored");
        let entry_pos = xml.find("type=\"NXentry\"").expect("entry group");
        let instrument_pos = xml.find("type=\"NXinstrument\"").expect("instrument group");
        let collection_pos = xml.find("type=\"NXcollection\"").expect("collection group");
        assert!(entry_pos < instrument_pos && instrument_pos < collection_pos);
    }

    #[test]
    fn range_expansion_creates_one_component_per_index() {
        let mut cfg = config(&["exp_c"]);
        cfg.first = Some(1);
        cfg.last = Some(3);
        let mut sink = MemSink::new();
        generate_client_fields(&cfg, &mut sink).expect("generate");
        assert_eq!(
            sink.list_components().expect("list"),
            vec!["exp_c01", "exp_c02", "exp_c03"]
        );
    }

    #[test]
    fn existing_component_aborts_without_overwrite() {
        let mut sink = MemSink::new();
        sink.store_component("exp_c01", "<definition/>").expect("seed");
        let cfg = config(&["exp_c01"]);
        let err = generate_client_fields(&cfg, &mut sink).expect_err("conflict");
        assert!(matches!(err, CreateError::ComponentExists(_)));
        // The pre-existing artifact is untouched.
        assert_eq!(sink.component("exp_c01"), Some("<definition/>"));
    }

    #[test]
    fn overwrite_replaces_existing_artifacts() {
        let mut sink = MemSink::new();
        sink.store_component("exp_c01", "<definition/>").expect("seed");
        let mut cfg = config(&["exp_c01"]);
        cfg.overwrite = true;
        generate_client_fields(&cfg, &mut sink).expect("generate");
        assert!(sink.component("exp_c01").expect("stored").contains("NXentry"));
    }

    #[test]
    fn lower_normalizes_generated_names() {
        let mut cfg = config(&["Exp_C01"]);
        cfg.lower = true;
        let mut sink = MemSink::new();
        generate_client_fields(&cfg, &mut sink).expect("generate");
        assert_eq!(sink.list_components().expect("list"), vec!["exp_c01"]);
    }
}
