use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use nxs_create::{generate_device_fields, DeviceDsConfig};

use crate::common;

#[derive(Args, Debug)]
pub struct DevDsArgs {
    /// Device names, or range prefixes with --first/--last
    #[arg(short = 'd', long = "device", value_name = "NAME")]
    pub devices: Vec<String>,
    /// First index of the device range
    #[arg(long)]
    pub first: Option<u32>,
    /// Last index of the device range
    #[arg(long)]
    pub last: Option<u32>,
    /// Datasource names matched 1:1 against the device names
    #[arg(short = 's', long = "datasource", value_name = "NAME")]
    pub datasources: Vec<String>,
    /// Nexus path of the generated field, e.g.
    /// `scan:NXentry/instrument/detector:NXdetector/data`
    #[arg(short = 'p', long)]
    pub path: Option<String>,
    /// Entry group name used by the default path
    #[arg(long, default_value = "scan")]
    pub entry: String,
    /// NeXus data type of the field
    #[arg(long = "type", default_value = "NX_FLOAT64", value_name = "NXTYPE")]
    pub data_type: String,
    /// Units of the field
    #[arg(long)]
    pub units: Option<String>,
    /// Strategy mode (INIT, STEP, FINAL, POSTRUN)
    #[arg(long, default_value = "STEP")]
    pub mode: String,
    /// Replace artifacts that already exist
    #[arg(long)]
    pub overwrite: bool,
    /// Lower-case generated names
    #[arg(long)]
    pub lower: bool,
    /// Output directory
    #[arg(long, default_value = ".")]
    pub directory: PathBuf,
    /// Prefix prepended to generated file names
    #[arg(long)]
    pub file_prefix: Option<String>,
}

pub fn run(args: DevDsArgs) -> Result<()> {
    if args.devices.is_empty() {
        info!("nothing to do: no device names given");
        return Ok(());
    }
    let config = DeviceDsConfig {
        names: args.devices,
        first: args.first,
        last: args.last,
        datasources: args.datasources,
        path: args.path,
        entry_name: args.entry,
        data_type: args.data_type,
        units: args.units,
        mode: common::parse_mode(&args.mode)?,
        overwrite: args.overwrite,
        lower: args.lower,
    };
    let mut sink = common::make_sink(&args.directory, args.file_prefix.as_deref());
    generate_device_fields(&config, &mut sink).context("generate device components")?;
    Ok(())
}
