use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use nxs_create::{generate_client_fields, ClientFieldConfig};

use crate::common;

#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// Device names, or range prefixes with --first/--last
    #[arg(short = 'd', long = "device", value_name = "NAME")]
    pub devices: Vec<String>,
    /// First index of the device range
    #[arg(long)]
    pub first: Option<u32>,
    /// Last index of the device range
    #[arg(long)]
    pub last: Option<u32>,
    /// Entry group name
    #[arg(long, default_value = "scan")]
    pub entry: String,
    /// Instrument group name
    #[arg(long, default_value = "instrument")]
    pub instrument: String,
    /// Collection group name
    #[arg(long, default_value = "collection")]
    pub collection: String,
    /// NeXus data type of the field
    #[arg(long = "type", default_value = "NX_FLOAT64", value_name = "NXTYPE")]
    pub data_type: String,
    /// Units of the field
    #[arg(long)]
    pub units: Option<String>,
    /// Strategy mode (INIT, STEP, FINAL, POSTRUN)
    #[arg(long, default_value = "STEP")]
    pub mode: String,
    /// Emit a CLIENT datasource per field and link it instead of embedding
    /// the record
    #[arg(long = "client-ds")]
    pub client_datasources: bool,
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

pub fn run(args: FieldsArgs) -> Result<()> {
    if args.devices.is_empty() {
        info!("nothing to do: no device names given");
        return Ok(());
    }
    let config = ClientFieldConfig {
        names: args.devices,
        first: args.first,
        last: args.last,
        entry_name: args.entry,
        instrument_name: args.instrument,
        collection_name: args.collection,
        data_type: args.data_type,
        units: args.units,
        mode: common::parse_mode(&args.mode)?,
        client_datasources: args.client_datasources,
        overwrite: args.overwrite,
        lower: args.lower,
    };
    let mut sink = common::make_sink(&args.directory, args.file_prefix.as_deref());
    generate_client_fields(&config, &mut sink).context("generate field components")?;
    Ok(())
}
