//! Artifact sinks.
//!
//! A [`Sink`] persists named components and datasources. [`FsSink`] writes
//! `<prefix><name>.xml` / `<prefix><name>.ds.xml` files into a directory;
//! [`MemSink`] keeps everything in memory and stands in for the remote
//! configuration store in tests. The live remote store client is an
//! external collaborator implementing the same trait.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type produced by sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Remote store failure reported by the collaborator.
    #[error("store: {0}")]
    Store(String),
}

/// Persistence for generated artifacts. Store and delete are idempotent per
/// named artifact; a whole run is not atomic across calls.
pub trait Sink {
    fn store_component(&mut self, name: &str, xml: &str) -> Result<(), SinkError>;
    fn store_datasource(&mut self, name: &str, xml: &str) -> Result<(), SinkError>;
    fn delete_component(&mut self, name: &str) -> Result<(), SinkError>;
    fn delete_datasource(&mut self, name: &str) -> Result<(), SinkError>;
    fn list_components(&self) -> Result<Vec<String>, SinkError>;
    fn list_datasources(&self) -> Result<Vec<String>, SinkError>;
}

const DS_SUFFIX: &str = ".ds.xml";
const COMP_SUFFIX: &str = ".xml";

/// Filesystem sink writing one file per artifact.
#[derive(Debug, Clone)]
pub struct FsSink {
    dir: PathBuf,
    prefix: String,
}

impl FsSink {
    /// A sink writing into `dir`, prepending `prefix` to every file name.
    pub fn new(dir: &Path, prefix: Option<&str>) -> Self {
        FsSink {
            dir: dir.to_path_buf(),
            prefix: prefix.unwrap_or_default().to_string(),
        }
    }

    fn path_for(&self, name: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{name}{suffix}", self.prefix))
    }

    fn write(&self, path: PathBuf, xml: &str) -> Result<(), SinkError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, xml).map_err(|source| SinkError::Io { path, source })
    }

    fn remove(&self, path: PathBuf) -> Result<(), SinkError> {
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            // Deleting an absent artifact is a no-op.
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SinkError::Io { path, source }),
        }
    }

    fn list(&self, datasources: bool) -> Result<Vec<String>, SinkError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SinkError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SinkError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(rest) = file_name.strip_prefix(&self.prefix) else {
                continue;
            };
            let is_ds = rest.ends_with(DS_SUFFIX);
            if datasources && is_ds {
                names.push(rest[..rest.len() - DS_SUFFIX.len()].to_string());
            } else if !datasources && !is_ds {
                if let Some(stem) = rest.strip_suffix(COMP_SUFFIX) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Sink for FsSink {
    fn store_component(&mut self, name: &str, xml: &str) -> Result<(), SinkError> {
        self.write(self.path_for(name, COMP_SUFFIX), xml)
    }

    fn store_datasource(&mut self, name: &str, xml: &str) -> Result<(), SinkError> {
        self.write(self.path_for(name, DS_SUFFIX), xml)
    }

    fn delete_component(&mut self, name: &str) -> Result<(), SinkError> {
        self.remove(self.path_for(name, COMP_SUFFIX))
    }

    fn delete_datasource(&mut self, name: &str) -> Result<(), SinkError> {
        self.remove(self.path_for(name, DS_SUFFIX))
    }

    fn list_components(&self) -> Result<Vec<String>, SinkError> {
        self.list(false)
    }

    fn list_datasources(&self) -> Result<Vec<String>, SinkError> {
        self.list(true)
    }
}

/// In-memory sink mirroring the remote store's name/xml interface.
#[derive(Debug, Clone, Default)]
pub struct MemSink {
    components: BTreeMap<String, String>,
    datasources: BTreeMap<String, String>,
}

impl MemSink {
    pub fn new() -> Self {
        MemSink::default()
    }

    /// Stored component text, if any.
    pub fn component(&self, name: &str) -> Option<&str> {
        self.components.get(name).map(String::as_str)
    }

    /// Stored datasource text, if any.
    pub fn datasource(&self, name: &str) -> Option<&str> {
        self.datasources.get(name).map(String::as_str)
    }
}

impl Sink for MemSink {
    fn store_component(&mut self, name: &str, xml: &str) -> Result<(), SinkError> {
        self.components.insert(name.to_string(), xml.to_string());
        Ok(())
    }

    fn store_datasource(&mut self, name: &str, xml: &str) -> Result<(), SinkError> {
        self.datasources.insert(name.to_string(), xml.to_string());
        Ok(())
    }

    fn delete_component(&mut self, name: &str) -> Result<(), SinkError> {
        self.components.remove(name);
        Ok(())
    }

    fn delete_datasource(&mut self, name: &str) -> Result<(), SinkError> {
        self.datasources.remove(name);
        Ok(())
    }

    fn list_components(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.components.keys().cloned().collect())
    }

    fn list_datasources(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.datasources.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{FsSink, MemSink, Sink};
    use std::fs;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("nxs-sink-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn fs_sink_routes_suffixes_and_lists_names() {
        let dir = temp_dir("routes");
        let mut sink = FsSink::new(&dir, None);
        sink.store_component("scan", "<definition/>").expect("store component");
        sink.store_datasource("scan", "<definition/>").expect("store datasource");

        assert!(dir.join("scan.xml").is_file());
        assert!(dir.join("scan.ds.xml").is_file());
        assert_eq!(sink.list_components().expect("list"), vec!["scan"]);
        assert_eq!(sink.list_datasources().expect("list"), vec!["scan"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn fs_sink_prefix_round_trips_through_listing() {
        let dir = temp_dir("prefix");
        let mut sink = FsSink::new(&dir, Some("test_"));
        sink.store_component("mot01", "<definition/>").expect("store");
        assert!(dir.join("test_mot01.xml").is_file());
        assert_eq!(sink.list_components().expect("list"), vec!["mot01"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn fs_sink_delete_is_idempotent() {
        let dir = temp_dir("delete");
        let mut sink = FsSink::new(&dir, None);
        sink.store_component("gone", "<definition/>").expect("store");
        sink.delete_component("gone").expect("first delete");
        sink.delete_component("gone").expect("second delete is a no-op");
        assert!(sink.list_components().expect("list").is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn fs_sink_missing_directory_lists_empty() {
        let sink = FsSink::new(&temp_dir("missing"), None);
        assert!(sink.list_components().expect("list").is_empty());
        assert!(sink.list_datasources().expect("list").is_empty());
    }

    #[test]
    fn mem_sink_stores_and_deletes() {
        let mut sink = MemSink::new();
        sink.store_datasource("a", "<definition/>").expect("store");
        assert_eq!(sink.datasource("a"), Some("<definition/>"));
        assert_eq!(sink.list_datasources().expect("list"), vec!["a"]);
        sink.delete_datasource("a").expect("delete");
        assert_eq!(sink.datasource("a"), None);
    }
}
