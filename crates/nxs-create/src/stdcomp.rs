//! Standard-template generator.
//!
//! Instantiates the templates of a standard component type with a value
//! table built from caller-supplied `name value` pairs, computed specials
//! and the declared defaults, then applies the substitution engine with its
//! missing-placeholder pruning and reports what stayed missing.

use nxs_template::{substitute, Variables};
use tracing::{info, warn};

use crate::artifact::ArtifactCatalog;
use crate::sink::Sink;
use crate::templates::TemplateCatalog;
use crate::CreateError;

/// Configuration of one standard-template run.
#[derive(Debug, Clone, Default)]
pub struct StdCompConfig {
    /// Standard component type key.
    pub comp_type: String,
    /// Base name of the generated artifacts; the type key by default.
    pub name: Option<String>,
    /// Caller-supplied `name value` pairs.
    pub values: Vec<(String, String)>,
    /// Bus database host:port backing `__tangohost__`/`__tangoport__`.
    pub bus_host_port: Option<String>,
    /// Remote store identity backing `__configdevice__`.
    pub store_name: Option<String>,
    pub overwrite: bool,
}

/// Run the standard-template generator against `sink`.
///
/// Returns the names of the placeholders left missing so the operator can
/// audit the run.
pub fn generate_standard(
    config: &StdCompConfig,
    templates: &TemplateCatalog,
    sink: &mut dyn Sink,
) -> Result<Vec<String>, CreateError> {
    let declared = templates.variables(&config.comp_type).ok_or_else(|| {
        CreateError::Parameter(format!(
            "unknown component type '{}'; available: {}",
            config.comp_type,
            templates.component_types().join(", ")
        ))
    })?;
    let files = templates
        .component_files(&config.comp_type)
        .unwrap_or_default();

    let mut vars = Variables::new();
    for (name, value) in &config.values {
        vars.set(name, value);
    }
    if let Some(host_port) = config.bus_host_port.as_deref() {
        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => (host, port),
            None => (host_port, "10000"),
        };
        vars.set_special("__tangohost__", host);
        vars.set_special("__tangoport__", port);
    }
    if let Some(store) = config.store_name.as_deref() {
        vars.set_special("__configdevice__", store);
    }
    for (name, var) in declared {
        if let Some(default) = &var.default {
            vars.set_default(name, default);
        }
    }

    let base = config.name.as_deref().unwrap_or(&config.comp_type);
    let mut catalog = ArtifactCatalog::new();
    let mut missing = Vec::new();

    for file in files {
        let text = templates.file_text(file).ok_or_else(|| {
            CreateError::Parameter(format!(
                "component type '{}' references unknown template file '{file}'",
                config.comp_type
            ))
        })?;
        let result = substitute(text, &vars)?;
        for name in result.missing() {
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }

        if let Some(stem) = file.strip_suffix(".ds.xml") {
            let name = artifact_name(&config.comp_type, base, stem);
            info!("CREATING datasource '{name}'");
            catalog.insert_datasource(&name, result.text);
        } else if let Some(stem) = file.strip_suffix(".xml") {
            let name = artifact_name(&config.comp_type, base, stem);
            info!("CREATING component '{name}'");
            catalog.insert_component(&name, result.text);
        }
    }

    if !missing.is_empty() {
        warn!("MISSING {}", missing.join(" "));
    }

    catalog.check_conflicts(sink, config.overwrite)?;
    catalog.flush(sink)?;
    Ok(missing)
}

/// Template file stems are type-based; artifacts are named after `base`:
/// with `-n mon1`, `beammonitor.ds.xml` becomes datasource `mon1`.
fn artifact_name(comp_type: &str, base: &str, stem: &str) -> String {
    match stem.strip_prefix(comp_type) {
        Some(rest) => format!("{base}{rest}"),
        None => format!("{base}_{stem}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{generate_standard, StdCompConfig};
    use crate::sink::{MemSink, Sink};
    use crate::templates::TemplateCatalog;
    use crate::CreateError;

    fn config(comp_type: &str, values: &[(&str, &str)]) -> StdCompConfig {
        StdCompConfig {
            comp_type: comp_type.into(),
            values: values
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            ..StdCompConfig::default()
        }
    }

    #[test]
    fn defaults_fill_unsupplied_placeholders() {
        let mut sink = MemSink::new();
        let missing = generate_standard(
            &config("source", &[("beamcurrent", "bc1")]),
            &TemplateCatalog::default(),
            &mut sink,
        )
        .expect("generate");
        assert!(missing.is_empty());
        let xml = sink.component("source").expect("stored");
        assert!(xml.contains("name=\"scan\""));
        assert!(xml.contains("PETRA III"));
        assert!(xml.contains("$datasources.bc1"));
    }

    #[test]
    fn specials_resolve_bus_host_and_port() {
        let mut cfg = config("beammonitor", &[("monitordevice", "p09/mon/exp.01")]);
        cfg.bus_host_port = Some("haspp09:10000".into());
        let mut sink = MemSink::new();
        generate_standard(&cfg, &TemplateCatalog::default(), &mut sink).expect("generate");
        let xml = sink.datasource("beammonitor").expect("stored");
        assert!(xml.contains("hostname=\"haspp09\""));
        assert!(xml.contains("port=\"10000\""));
    }

    #[test]
    fn missing_placeholder_is_reported_and_pruned() {
        let mut sink = MemSink::new();
        let missing = generate_standard(
            &config("source", &[]),
            &TemplateCatalog::default(),
            &mut sink,
        )
        .expect("generate");
        assert_eq!(missing, ["beamcurrent"]);
        let xml = sink.component("source").expect("stored");
        // The current field depended on the missing datasource name; its
        // siblings survive.
        assert!(!xml.contains("name=\"current\""));
        assert!(!xml.contains("$("));
        assert!(xml.contains("PETRA III"));
        assert!(xml.contains("x-ray"));
    }

    #[test]
    fn multi_file_types_route_by_suffix_under_the_base_name() {
        let mut cfg = config(
            "beammonitor",
            &[("monitordevice", "p09/mon/exp.01"), ("monitorname", "mon1")],
        );
        cfg.name = Some("mon1".into());
        cfg.bus_host_port = Some("haspp09:10000".into());
        let mut sink = MemSink::new();
        let missing =
            generate_standard(&cfg, &TemplateCatalog::default(), &mut sink).expect("generate");
        assert!(missing.is_empty());
        assert_eq!(sink.list_components().expect("list"), vec!["mon1"]);
        assert_eq!(sink.list_datasources().expect("list"), vec!["mon1"]);
        let ds = sink.datasource("mon1").expect("stored");
        assert!(ds.contains("<record name=\"Counts\"/>"));
        let comp = sink.component("mon1").expect("stored");
        assert!(comp.contains("$datasources.mon1"));
    }

    #[test]
    fn unknown_type_lists_the_available_ones() {
        let mut sink = MemSink::new();
        let err = generate_standard(
            &config("nope", &[]),
            &TemplateCatalog::default(),
            &mut sink,
        )
        .expect_err("unknown type");
        let message = err.to_string();
        assert!(message.contains("nope"));
        assert!(message.contains("source"));
    }

    #[test]
    fn existing_artifact_aborts_without_overwrite() {
        let mut sink = MemSink::new();
        sink.store_component("source", "<definition/>").expect("seed");
        let err = generate_standard(
            &config("source", &[]),
            &TemplateCatalog::default(),
            &mut sink,
        )
        .expect_err("conflict");
        assert!(matches!(err, CreateError::ComponentExists(_)));
        assert_eq!(sink.component("source"), Some("<definition/>"));
    }
}
