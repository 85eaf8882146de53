//! Command-line entry point: a `clap`-derive parser for the binary's
//! top-level arguments.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "ethcore-node", author, version, about = "An Ethereum execution-layer full node")]
pub struct Cli {
    /// Path to a TOML node configuration file. Falls back to built-in
    /// defaults (mainnet fork schedule, ./data, port 30303) if absent.
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to a TOML chain spec file, overriding whatever the config
    /// file names.
    #[clap(long, value_name = "FILE")]
    pub chain_spec: Option<PathBuf>,

    /// Override the data directory from the config file.
    #[clap(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}
