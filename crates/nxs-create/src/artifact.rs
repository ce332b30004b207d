//! In-memory artifact catalog of one generation run.

use tracing::info;

use crate::sink::Sink;
use crate::CreateError;

/// Insertion-ordered mappings from artifact name to serialized XML,
/// accumulated during a run and flushed to the sink at its end.
#[derive(Debug, Clone, Default)]
pub struct ArtifactCatalog {
    components: Vec<(String, String)>,
    datasources: Vec<(String, String)>,
}

impl ArtifactCatalog {
    pub fn new() -> Self {
        ArtifactCatalog::default()
    }

    /// Add a component; a repeated name replaces the XML in place, keeping
    /// the original position.
    pub fn insert_component(&mut self, name: &str, xml: String) {
        insert(&mut self.components, name, xml);
    }

    /// Add a datasource; a repeated name replaces the XML in place.
    pub fn insert_datasource(&mut self, name: &str, xml: String) {
        insert(&mut self.datasources, name, xml);
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &str)> {
        self.components.iter().map(|(n, x)| (n.as_str(), x.as_str()))
    }

    pub fn datasources(&self) -> impl Iterator<Item = (&str, &str)> {
        self.datasources.iter().map(|(n, x)| (n.as_str(), x.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.datasources.is_empty()
    }

    /// Fail on the first target name that already exists in the sink.
    ///
    /// Called before flushing; with `overwrite` the check is skipped.
    pub fn check_conflicts(&self, sink: &dyn Sink, overwrite: bool) -> Result<(), CreateError> {
        if overwrite {
            return Ok(());
        }
        let existing = sink.list_components()?;
        for (name, _) in &self.components {
            if existing.iter().any(|e| e == name) {
                return Err(CreateError::ComponentExists(name.clone()));
            }
        }
        let existing = sink.list_datasources()?;
        for (name, _) in &self.datasources {
            if existing.iter().any(|e| e == name) {
                return Err(CreateError::DataSourceExists(name.clone()));
            }
        }
        Ok(())
    }

    /// Store every artifact in insertion order.
    ///
    /// A sink failure part-way through leaves earlier artifacts in place;
    /// there is no compensating rollback.
    pub fn flush(&self, sink: &mut dyn Sink) -> Result<(), CreateError> {
        for (name, xml) in &self.components {
            info!("STORING component '{name}'");
            sink.store_component(name, xml)?;
        }
        for (name, xml) in &self.datasources {
            info!("STORING datasource '{name}'");
            sink.store_datasource(name, xml)?;
        }
        Ok(())
    }
}

fn insert(entries: &mut Vec<(String, String)>, name: &str, xml: String) {
    if let Some(slot) = entries.iter_mut().find(|(n, _)| n == name) {
        slot.1 = xml;
    } else {
        entries.push((name.to_string(), xml));
    }
}

#[cfg(test)]
mod tests {
    use super::ArtifactCatalog;
    use crate::sink::{MemSink, Sink};
    use crate::CreateError;

    #[test]
    fn flush_preserves_insertion_order() {
        let mut catalog = ArtifactCatalog::new();
        catalog.insert_component("zeta", "<definition/>".into());
        catalog.insert_component("alpha", "<definition/>".into());
        let names: Vec<_> = catalog.components().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn repeated_insert_replaces_in_place() {
        let mut catalog = ArtifactCatalog::new();
        catalog.insert_datasource("a", "one".into());
        catalog.insert_datasource("b", "two".into());
        catalog.insert_datasource("a", "three".into());
        let entries: Vec<_> = catalog.datasources().collect();
        assert_eq!(entries, [("a", "three"), ("b", "two")]);
    }

    #[test]
    fn conflicts_abort_before_any_store() {
        let mut sink = MemSink::new();
        sink.store_component("taken", "<definition/>").expect("seed");

        let mut catalog = ArtifactCatalog::new();
        catalog.insert_component("taken", "<definition/>".into());
        let err = catalog
            .check_conflicts(&sink, false)
            .expect_err("conflict must fail");
        assert!(matches!(err, CreateError::ComponentExists(name) if name == "taken"));

        catalog.check_conflicts(&sink, true).expect("overwrite skips the check");
    }

    #[test]
    fn flush_stores_components_and_datasources() {
        let mut catalog = ArtifactCatalog::new();
        catalog.insert_component("c", "<definition/>".into());
        catalog.insert_datasource("d", "<definition/>".into());
        let mut sink = MemSink::new();
        catalog.flush(&mut sink).expect("flush");
        assert!(sink.component("c").is_some());
        assert!(sink.datasource("d").is_some());
    }
}
