//! Per-module generation rules.
//!
//! The tables are immutable configuration injected at startup; generators
//! and tests substitute their own catalog instead of reaching for process
//! globals. Module lookups are case-insensitive.

use std::collections::{BTreeMap, BTreeSet};

/// Rules mapping a driver module onto generation behavior.
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    motor_modules: BTreeSet<String>,
    motor_type_tags: BTreeSet<String>,
    attributes: BTreeMap<String, (String, Option<String>)>,
    multi_attributes: BTreeMap<String, Vec<String>>,
    template_files: BTreeMap<String, Vec<String>>,
}

impl ModuleCatalog {
    /// An empty catalog; every module falls through to "no rule".
    pub fn empty() -> Self {
        ModuleCatalog {
            motor_modules: BTreeSet::new(),
            motor_type_tags: BTreeSet::new(),
            attributes: BTreeMap::new(),
            multi_attributes: BTreeMap::new(),
            template_files: BTreeMap::new(),
        }
    }

    /// Whether `module` is motor-like (default attribute `Position`).
    pub fn is_motor_module(&self, module: &str) -> bool {
        self.motor_modules.contains(&module.to_lowercase())
    }

    /// Whether `type_tag` marks a stepping motor.
    pub fn is_motor_type(&self, type_tag: &str) -> bool {
        self.motor_type_tags.contains(&type_tag.to_lowercase())
    }

    /// Primary and fallback attribute declared for `module`.
    pub fn attribute_rule(&self, module: &str) -> Option<(&str, Option<&str>)> {
        self.attributes
            .get(&module.to_lowercase())
            .map(|(primary, fallback)| (primary.as_str(), fallback.as_deref()))
    }

    /// Attributes a multi-attribute module exposes, each emitted as its own
    /// datasource.
    pub fn multi_attributes(&self, module: &str) -> Option<&[String]> {
        self.multi_attributes
            .get(&module.to_lowercase())
            .map(Vec::as_slice)
    }

    /// Template files registered for `module`.
    pub fn template_files(&self, module: &str) -> Option<&[String]> {
        self.template_files
            .get(&module.to_lowercase())
            .map(Vec::as_slice)
    }

    /// Register a motor-like module.
    pub fn add_motor_module(&mut self, module: &str) {
        self.motor_modules.insert(module.to_lowercase());
    }

    /// Register a stepping-motor type tag.
    pub fn add_motor_type(&mut self, type_tag: &str) {
        self.motor_type_tags.insert(type_tag.to_lowercase());
    }

    /// Register the attribute rule of a module.
    pub fn add_attribute_rule(&mut self, module: &str, primary: &str, fallback: Option<&str>) {
        self.attributes.insert(
            module.to_lowercase(),
            (primary.to_string(), fallback.map(str::to_string)),
        );
    }

    /// Register the attribute list of a multi-attribute module.
    pub fn add_multi_attributes(&mut self, module: &str, attributes: &[&str]) {
        self.multi_attributes.insert(
            module.to_lowercase(),
            attributes.iter().map(|a| a.to_string()).collect(),
        );
    }

    /// Register the template files of a module.
    pub fn add_template_files(&mut self, module: &str, files: &[&str]) {
        self.template_files.insert(
            module.to_lowercase(),
            files.iter().map(|f| f.to_string()).collect(),
        );
    }
}

impl Default for ModuleCatalog {
    /// The standard beamline table set.
    fn default() -> Self {
        let mut catalog = ModuleCatalog::empty();

        for module in [
            "oms58",
            "omsvme58",
            "spk",
            "e6c",
            "kohzu",
            "smchydra",
            "lom",
            "motor_pool",
            "absbox",
        ] {
            catalog.add_motor_module(module);
        }
        for type_tag in ["stepping_motor", "servo_motor"] {
            catalog.add_motor_type(type_tag);
        }

        catalog.add_attribute_rule("counter_tango", "Counts", Some("Value"));
        catalog.add_attribute_rule("vfcadc", "Counts", Some("Value"));
        catalog.add_attribute_rule("dgg2", "SampleTime", None);
        catalog.add_attribute_rule("mca_8701", "Data", None);
        catalog.add_attribute_rule("tangoattributectctrl", "Value", None);

        catalog.add_multi_attributes(
            "pilatus",
            &[
                "DelayTime",
                "ExposurePeriod",
                "ExposureTime",
                "NbExposures",
                "NbFrames",
            ],
        );
        catalog.add_multi_attributes("mca_xia", &["ICR", "OCR"]);
        catalog.add_multi_attributes(
            "lambda",
            &[
                "DelayTime",
                "DepthBits",
                "EnergyThreshold",
                "FrameNumbers",
                "ShutterTime",
            ],
        );
        catalog.add_multi_attributes(
            "eigerdectris",
            &["NbImages", "NbTriggers", "TriggerMode", "CountTime"],
        );

        catalog.add_template_files("pilatus", &["pilatus.xml", "pilatus_postrun.ds.xml"]);
        catalog.add_template_files("lambda", &["lambda.xml", "lambda_postrun.ds.xml"]);
        catalog.add_template_files("mca_xia", &["mca_xia.xml"]);

        catalog
    }
}
