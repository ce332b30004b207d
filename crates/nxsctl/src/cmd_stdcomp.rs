use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use nxs_create::{generate_standard, StdCompConfig};

use crate::common;

#[derive(Args, Debug)]
pub struct StdCompArgs {
    /// Standard component type
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub comp_type: Option<String>,
    /// Name of the generated artifacts; the type key by default
    #[arg(short = 'n', long)]
    pub name: Option<String>,
    /// Placeholder values as `name value` pairs
    #[arg(value_name = "NAME VALUE")]
    pub values: Vec<String>,
    /// List the available component types and their variables
    #[arg(long)]
    pub list_types: bool,
    /// Bus database host:port backing `__tangohost__`/`__tangoport__`
    #[arg(long, value_name = "HOST:PORT")]
    pub bus: Option<String>,
    /// Remote store identity backing `__configdevice__`
    #[arg(long, value_name = "NAME")]
    pub store: Option<String>,
    /// Directory of additional template files
    #[arg(long, value_name = "DIR")]
    pub template_dir: Option<PathBuf>,
    /// Replace artifacts that already exist
    #[arg(long)]
    pub overwrite: bool,
    /// Output directory
    #[arg(long, default_value = ".")]
    pub directory: PathBuf,
    /// Prefix prepended to generated file names
    #[arg(long)]
    pub file_prefix: Option<String>,
}

pub fn run(args: StdCompArgs) -> Result<()> {
    let templates = common::load_templates(args.template_dir.as_deref())?;

    if args.list_types {
        for comp_type in templates.component_types() {
            println!("{comp_type}");
            if let Some(vars) = templates.variables(comp_type) {
                for (name, var) in vars {
                    match &var.default {
                        Some(default) => {
                            println!("  {name} [{default}]: {}", var.description)
                        }
                        None => println!("  {name}: {}", var.description),
                    }
                }
            }
        }
        return Ok(());
    }

    let Some(comp_type) = args.comp_type else {
        bail!("a component type is required (or --list-types)");
    };
    let config = StdCompConfig {
        comp_type,
        name: args.name,
        values: common::pair_values(&args.values)?,
        bus_host_port: args.bus,
        store_name: args.store,
        overwrite: args.overwrite,
    };
    let mut sink = common::make_sink(&args.directory, args.file_prefix.as_deref());
    let missing = generate_standard(&config, &templates, &mut sink)
        .context("instantiate standard component")?;
    if !missing.is_empty() {
        println!("MISSING {}", missing.join(" "));
    }
    Ok(())
}
