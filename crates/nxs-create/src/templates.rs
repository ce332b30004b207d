//! Template catalog.
//!
//! Maps standard component types to their template files and declared
//! placeholder variables, and module names to module template files. The
//! built-in set covers the common beamline components; a directory of
//! additional `.xml` / `.ds.xml` files can be layered on top.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::CreateError;

/// Declared placeholder of a standard component template.
#[derive(Debug, Clone)]
pub struct TemplateVar {
    /// Default substituted when the caller supplies no value.
    pub default: Option<String>,
    /// Human-readable description shown by type listings.
    pub description: String,
}

/// Immutable template lookup injected into the generators.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    component_files: BTreeMap<String, Vec<String>>,
    component_vars: BTreeMap<String, BTreeMap<String, TemplateVar>>,
    files: BTreeMap<String, String>,
}

impl TemplateCatalog {
    /// A catalog with no types and no files.
    pub fn empty() -> Self {
        TemplateCatalog {
            component_files: BTreeMap::new(),
            component_vars: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    /// Known standard component types, sorted.
    pub fn component_types(&self) -> Vec<&str> {
        self.component_files.keys().map(String::as_str).collect()
    }

    /// Template files of a standard component type.
    pub fn component_files(&self, comp_type: &str) -> Option<&[String]> {
        self.component_files.get(comp_type).map(Vec::as_slice)
    }

    /// Declared variables of a standard component type.
    pub fn variables(&self, comp_type: &str) -> Option<&BTreeMap<String, TemplateVar>> {
        self.component_vars.get(comp_type)
    }

    /// Text of a template file.
    pub fn file_text(&self, file: &str) -> Option<&str> {
        self.files.get(file).map(String::as_str)
    }

    /// Register a component type with its files and variable declarations.
    pub fn add_component(
        &mut self,
        comp_type: &str,
        files: &[&str],
        vars: &[(&str, Option<&str>, &str)],
    ) {
        self.component_files.insert(
            comp_type.to_string(),
            files.iter().map(|f| f.to_string()).collect(),
        );
        let vars = vars
            .iter()
            .map(|(name, default, description)| {
                (
                    name.to_string(),
                    TemplateVar {
                        default: default.map(str::to_string),
                        description: description.to_string(),
                    },
                )
            })
            .collect();
        self.component_vars.insert(comp_type.to_string(), vars);
    }

    /// Register a template file body.
    pub fn add_file(&mut self, name: &str, text: &str) {
        self.files.insert(name.to_string(), text.to_string());
    }

    /// Layer every `.xml` file of `dir` over the catalog; returns how many
    /// files were loaded. File names shadow built-in ones.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CreateError> {
        let entries = fs::read_dir(dir).map_err(|err| {
            CreateError::Parameter(format!("template directory {}: {err}", dir.display()))
        })?;
        let mut loaded = 0usize;
        for entry in entries {
            let entry = entry.map_err(|err| {
                CreateError::Parameter(format!("template directory {}: {err}", dir.display()))
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".xml") {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|err| {
                CreateError::Parameter(format!("template {}: {err}", path.display()))
            })?;
            self.add_file(name, &text);
            loaded += 1;
        }
        Ok(loaded)
    }
}

impl Default for TemplateCatalog {
    /// The built-in standard set.
    fn default() -> Self {
        let mut catalog = TemplateCatalog::empty();

        catalog.add_component(
            "default",
            &["default.xml"],
            &[
                ("entryname", Some("scan"), "name of the entry group"),
                ("beamtimeid", None, "beamtime identifier of the experiment"),
            ],
        );
        catalog.add_file("default.xml", DEFAULT_XML);

        catalog.add_component(
            "source",
            &["source.xml"],
            &[
                ("entryname", Some("scan"), "name of the entry group"),
                ("sourcename", Some("PETRA III"), "name of the machine source"),
                (
                    "sourcetype",
                    Some("Synchrotron X-ray Source"),
                    "NeXus type of the source",
                ),
                ("probe", Some("x-ray"), "radiation probe"),
                (
                    "beamcurrent",
                    None,
                    "datasource name of the beam current reading",
                ),
            ],
        );
        catalog.add_file("source.xml", SOURCE_XML);

        catalog.add_component(
            "beammonitor",
            &["beammonitor.xml", "beammonitor.ds.xml"],
            &[
                ("entryname", Some("scan"), "name of the entry group"),
                ("monitorname", Some("beam_monitor"), "name of the monitor group"),
                ("monitordevice", None, "bus address of the monitor device"),
                ("monitorattr", Some("Counts"), "attribute holding the counts"),
            ],
        );
        catalog.add_file("beammonitor.xml", BEAMMONITOR_XML);
        catalog.add_file("beammonitor.ds.xml", BEAMMONITOR_DS_XML);

        catalog.add_file("pilatus.xml", PILATUS_XML);
        catalog.add_file("pilatus_postrun.ds.xml", PILATUS_POSTRUN_DS_XML);
        catalog.add_file("lambda.xml", LAMBDA_XML);
        catalog.add_file("lambda_postrun.ds.xml", LAMBDA_POSTRUN_DS_XML);
        catalog.add_file("mca_xia.xml", MCA_XIA_XML);

        catalog
    }
}

const DEFAULT_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <group type="NXentry" name="$(entryname)">
    <field name="title" type="NX_CHAR">$datasources.title<strategy mode="INIT"/></field>
    <field name="start_time" type="NX_DATE_TIME">$datasources.start_time<strategy mode="INIT"/></field>
    <field name="end_time" type="NX_DATE_TIME">$datasources.end_time<strategy mode="FINAL"/></field>
    <field name="experiment_identifier" type="NX_CHAR">$(beamtimeid)<strategy mode="INIT"/></field>
    <group type="NXinstrument" name="instrument">
      <group type="NXcollection" name="collection"/>
    </group>
    <group type="NXdata" name="data"/>
  </group>
</definition>
"#;

const SOURCE_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <group type="NXentry" name="$(entryname)">
    <group type="NXinstrument" name="instrument">
      <group type="NXsource" name="source">
        <field name="name" type="NX_CHAR">$(sourcename)<strategy mode="INIT"/></field>
        <field name="type" type="NX_CHAR">$(sourcetype)<strategy mode="INIT"/></field>
        <field name="probe" type="NX_CHAR">$(probe)<strategy mode="INIT"/></field>
        <field name="current" type="NX_FLOAT64" units="mA">$datasources.$(beamcurrent)<strategy mode="STEP"/></field>
      </group>
    </group>
  </group>
</definition>
"#;

const BEAMMONITOR_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <group type="NXentry" name="$(entryname)">
    <group type="NXinstrument" name="instrument">
      <group type="NXmonitor" name="$(monitorname)">
        <field name="mode" type="NX_CHAR">monitor<strategy mode="INIT"/></field>
        <field name="data" type="NX_FLOAT64">$datasources.$(monitorname)<strategy mode="STEP"/></field>
      </group>
    </group>
  </group>
</definition>
"#;

const BEAMMONITOR_DS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <datasource type="TANGO" name="$(monitorname)">
    <device name="$(monitordevice)" member="attribute" hostname="$(__tangohost__)" port="$(__tangoport__)"/>
    <record name="$(monitorattr)"/>
  </datasource>
</definition>
"#;

const PILATUS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <group type="NXentry" name="$(__entryname__)">
    <group type="NXinstrument" name="instrument">
      <group type="NXdetector" name="$(name)">
        <field name="description" type="NX_CHAR">$(device)<strategy mode="INIT"/></field>
        <field name="data" type="NX_UINT32">$datasources.$(name)_postrun<dimensions rank="2"/><strategy mode="POSTRUN" compression="true" rate="5"/></field>
      </group>
    </group>
  </group>
</definition>
"#;

const PILATUS_POSTRUN_DS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <datasource type="CLIENT" name="$(name)_postrun">
    <record name="$(name)_postrun"/>
  </datasource>
</definition>
"#;

const LAMBDA_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <group type="NXentry" name="$(__entryname__)">
    <group type="NXinstrument" name="instrument">
      <group type="NXdetector" name="$(name)">
        <field name="description" type="NX_CHAR">$(device)<strategy mode="INIT"/></field>
        <field name="layout" type="NX_CHAR">area<strategy mode="INIT"/></field>
        <field name="data" type="NX_UINT16">$datasources.$(name)_postrun<dimensions rank="3"/><strategy mode="POSTRUN" compression="true" rate="2" shuffle="true"/></field>
      </group>
    </group>
  </group>
</definition>
"#;

const LAMBDA_POSTRUN_DS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <datasource type="CLIENT" name="$(name)_postrun">
    <record name="$(name)_postrun"/>
  </datasource>
</definition>
"#;

const MCA_XIA_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<definition>
  <group type="NXentry" name="$(__entryname__)">
    <group type="NXinstrument" name="instrument">
      <group type="NXdetector" name="$(name)">
        <field name="description" type="NX_CHAR">$(device) at $(hostname)<strategy mode="INIT"/></field>
        <field name="data" type="NX_FLOAT64">$datasources.$(name)_spectrum<dimensions rank="1"/><strategy mode="STEP" grows="1"/></field>
      </group>
    </group>
  </group>
</definition>
"#;
