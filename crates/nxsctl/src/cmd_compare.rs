use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use nxs_create::compare::compare_inventories;

use crate::common;

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// First inventory document file
    pub first: PathBuf,
    /// Second inventory document file
    pub second: PathBuf,
    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: CompareArgs) -> Result<()> {
    let first = fs::read_to_string(&args.first)
        .with_context(|| format!("read inventory {}", args.first.display()))?;
    let second = fs::read_to_string(&args.second)
        .with_context(|| format!("read inventory {}", args.second.display()))?;
    let report = compare_inventories(&first, &second).context("compare inventories")?;

    if args.json {
        common::print_json(&report)?;
    } else {
        print!("{report}");
    }
    Ok(())
}
