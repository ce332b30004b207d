//! Generators for NXS writer configuration artifacts.
//!
//! Four generator variants produce components and datasources into an
//! insertion-ordered [`ArtifactCatalog`], which is flushed to a [`Sink`]
//! (filesystem directory or remote store) at the end of a run. All variants
//! share one run shape: collect inputs, validate expansion counts, check
//! pre-existing names unless overwrite was requested, generate per item
//! (single-device failures are logged and skipped), flush.

mod artifact;
pub mod compare;
mod devds;
mod fields;
mod online;
mod sink;
mod stdcomp;
mod templates;

pub use artifact::ArtifactCatalog;
pub use devds::{generate_device_fields, DeviceDsConfig};
pub use fields::{generate_client_fields, ClientFieldConfig};
pub use online::{generate_online, OnlineDsConfig};
pub use sink::{FsSink, MemSink, Sink, SinkError};
pub use stdcomp::{generate_standard, StdCompConfig};
pub use templates::{TemplateCatalog, TemplateVar};

use thiserror::Error;

/// Error type produced by generation runs.
#[derive(Debug, Error)]
pub enum CreateError {
    /// Bad or inconsistent caller input; aborts before any generation.
    #[error("parameter error: {0}")]
    Parameter(String),
    /// A target component name already exists and overwrite was not
    /// requested.
    #[error("component '{0}' already exists; pass overwrite to replace it")]
    ComponentExists(String),
    /// A target datasource name already exists and overwrite was not
    /// requested.
    #[error("datasource '{0}' already exists; pass overwrite to replace it")]
    DataSourceExists(String),
    #[error(transparent)]
    Xml(#[from] nxs_xml::BuildError),
    #[error(transparent)]
    Template(#[from] nxs_template::TemplateError),
    #[error(transparent)]
    Device(#[from] nxs_device::DeviceError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Expand device names over an inclusive `[first, last]` range.
///
/// With a range, every entry of `names` is a prefix and indices are
/// zero-padded to at least two digits: `exp_c` over `[1, 3]` gives
/// `exp_c01 exp_c02 exp_c03`. Without a range the names pass through
/// unchanged.
pub fn expand_names(
    names: &[String],
    first: Option<u32>,
    last: Option<u32>,
) -> Result<Vec<String>, CreateError> {
    match (first, last) {
        (None, None) => Ok(names.to_vec()),
        (Some(first), Some(last)) => {
            if last < first {
                return Err(CreateError::Parameter(format!(
                    "empty device range: last {last} is smaller than first {first}"
                )));
            }
            let mut out = Vec::new();
            for prefix in names {
                for index in first..=last {
                    out.push(format!("{prefix}{index:02}"));
                }
            }
            Ok(out)
        }
        _ => Err(CreateError::Parameter(
            "a device range needs both its first and last index".into(),
        )),
    }
}
