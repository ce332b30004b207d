use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_compare;
mod cmd_devds;
mod cmd_fields;
mod cmd_online;
mod cmd_stdcomp;
mod common;

use cmd_compare::CompareArgs;
use cmd_devds::DevDsArgs;
use cmd_fields::FieldsArgs;
use cmd_online::OnlineArgs;
use cmd_stdcomp::StdCompArgs;

/// Exit code used for usage and validation errors.
const USAGE_EXIT: u8 = 255;

#[derive(Parser, Debug)]
#[command(name = "nxsctl", version, about = "NXS configuration generator CLI")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create simple field components, optionally with CLIENT datasources
    Fields(FieldsArgs),
    /// Create per-device field components referencing named datasources
    Devds(DevDsArgs),
    /// Create datasources and components from a device inventory
    Online(OnlineArgs),
    /// Instantiate a standard component template
    Stdcomp(StdCompArgs),
    /// Compare two device inventories
    Compare(CompareArgs),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => USAGE_EXIT,
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .init();

    match run(cli.cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(USAGE_EXIT)
        }
    }
}

fn run(cmd: Cmd) -> Result<()> {
    match cmd {
        Cmd::Fields(args) => cmd_fields::run(args),
        Cmd::Devds(args) => cmd_devds::run(args),
        Cmd::Online(args) => cmd_online::run(args),
        Cmd::Stdcomp(args) => cmd_stdcomp::run(args),
        Cmd::Compare(args) => cmd_compare::run(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_fields_defaults() {
        let cli = Cli::parse_from(["nxsctl", "fields", "-d", "exp_c01"]);
        match cli.cmd {
            Cmd::Fields(args) => {
                assert_eq!(args.devices, vec!["exp_c01"]);
                assert_eq!(args.entry, "scan");
                assert_eq!(args.mode, "STEP");
                assert!(!args.client_datasources);
                assert_eq!(args.directory, PathBuf::from("."));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn parse_fields_range_and_linking() {
        let cli = Cli::parse_from([
            "nxsctl", "fields", "-d", "exp_c", "--first", "1", "--last", "3", "--client-ds",
        ]);
        match cli.cmd {
            Cmd::Fields(args) => {
                assert_eq!(args.first, Some(1));
                assert_eq!(args.last, Some(3));
                assert!(args.client_datasources);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn parse_online_inventory_path() {
        let cli = Cli::parse_from(["nxsctl", "online", "online.xml", "--polled"]);
        match cli.cmd {
            Cmd::Online(args) => {
                assert_eq!(args.inventory, PathBuf::from("online.xml"));
                assert!(args.polled);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn parse_stdcomp_pairs() {
        let cli = Cli::parse_from([
            "nxsctl", "stdcomp", "--type", "source", "-n", "mysource", "beamcurrent", "bc1",
        ]);
        match cli.cmd {
            Cmd::Stdcomp(args) => {
                assert_eq!(args.comp_type.as_deref(), Some("source"));
                assert_eq!(args.name.as_deref(), Some("mysource"));
                assert_eq!(args.values, vec!["beamcurrent", "bc1"]);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn parse_compare_json_flag() {
        let cli = Cli::parse_from(["nxsctl", "compare", "a.xml", "b.xml", "--json"]);
        match cli.cmd {
            Cmd::Compare(args) => {
                assert_eq!(args.first, PathBuf::from("a.xml"));
                assert_eq!(args.second, PathBuf::from("b.xml"));
                assert!(args.json);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
