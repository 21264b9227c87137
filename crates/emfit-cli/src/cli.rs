use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "emfit CLI - score an atomic model against a cryo-EM density map represented as a Gaussian mixture model."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate the density-fit score and per-atom gradient once.
    Score(ScoreArgs),
}

/// Arguments for the `score` subcommand.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Path to the data-GMM parameter file (CSV with Id,Weight,Mean_*,Cov_** columns).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub gmm: PathBuf,

    /// Path to the atoms file (CSV with serial,name,x,y,z columns; positions in nm).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub atoms: PathBuf,

    /// Thermal energy scale kT, in the energy units of the simulation.
    #[arg(short, long, required = true, value_name = "KT")]
    pub temp: f64,

    /// Evaluate on a single worker regardless of the thread pool.
    #[arg(long)]
    pub serial: bool,

    /// Prune (data, model) pairs with a neighbor list.
    #[arg(long)]
    pub nlist: bool,

    /// Overlap cutoff for the neighbor list (required with --nlist).
    #[arg(long, value_name = "OVERLAP", requires = "nlist")]
    pub nl_cutoff: Option<f64>,

    /// Rebuild stride for the neighbor list, in steps (required with --nlist).
    #[arg(long, value_name = "STEPS", requires = "nlist")]
    pub nl_stride: Option<u64>,

    /// Write the per-atom gradient as CSV to this path instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}
