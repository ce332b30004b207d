use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use nxs_create::{generate_online, OnlineDsConfig};
use nxs_device::{BusLookup, ModuleCatalog};

use crate::common;

#[derive(Args, Debug)]
pub struct OnlineArgs {
    /// Inventory document file
    pub inventory: PathBuf,
    /// Entry group name substituted into module templates
    #[arg(long, default_value = "scan")]
    pub entry: String,
    /// Poll motor attributes from the bus instead of marking them
    /// pass-through
    #[arg(long)]
    pub polled: bool,
    /// Prefix prepended to generated datasource names
    #[arg(long)]
    pub ds_prefix: Option<String>,
    /// Default bus host:port consulted for peer identities
    #[arg(long)]
    pub peer_host: Option<String>,
    /// JSON bus snapshot backing live lookups in offline runs
    #[arg(long, value_name = "FILE")]
    pub bus_snapshot: Option<PathBuf>,
    /// Directory of additional template files
    #[arg(long, value_name = "DIR")]
    pub template_dir: Option<PathBuf>,
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

pub fn run(args: OnlineArgs) -> Result<()> {
    let inventory = fs::read_to_string(&args.inventory)
        .with_context(|| format!("read inventory {}", args.inventory.display()))?;
    let templates = common::load_templates(args.template_dir.as_deref())?;
    let bus = common::load_bus(args.bus_snapshot.as_deref())?;

    let config = OnlineDsConfig {
        inventory,
        entry_name: args.entry,
        client_like: !args.polled,
        ds_prefix: args.ds_prefix,
        peer_host: args
            .peer_host
            .or_else(|| bus.as_ref().and_then(|b| b.host().map(str::to_string))),
        overwrite: args.overwrite,
        lower: args.lower,
    };
    let mut sink = common::make_sink(&args.directory, args.file_prefix.as_deref());
    generate_online(
        &config,
        &ModuleCatalog::default(),
        &templates,
        bus.as_ref().map(|b| b as &dyn BusLookup),
        &mut sink,
    )
    .context("generate from inventory")?;
    Ok(())
}
