//! Argument definitions for the `fw` binary, mirroring
//! `assay-cli::cli::args`'s `clap::Parser`/`Subcommand` split.

use clap::{Parser, Subcommand, ValueEnum};
use fw_common::log::LogType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fw", version, about = "Smart-home firewall profile compiler, classifier and verdict reconciler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Loads a device profile, compiles it, and writes the nftables ruleset
    /// plus the classifier configuration artifact.
    Translate(TranslateArgs),
    /// Runs the classifier runtime against a compiled configuration.
    Classify(ClassifyArgs),
    /// Merges a kernel log and a classifier log into one CSV.
    Merge(MergeArgs),
    /// Links a merged log against a profile's expected interaction
    /// sequences, producing a final reconciled log.
    Reconcile(ReconcileArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogTypeArg {
    None,
    Csv,
    Pcap,
}

impl From<LogTypeArg> for LogType {
    fn from(value: LogTypeArg) -> Self {
        match value {
            LogTypeArg::None => LogType::None,
            LogTypeArg::Csv => LogType::Csv,
            LogTypeArg::Pcap => LogType::Pcap,
        }
    }
}

#[derive(Parser)]
pub struct TranslateArgs {
    /// Path to the device's YAML profile.
    pub profile_path: PathBuf,
    /// First NFQUEUE number this profile's policies may use.
    pub queue_base: u16,
    /// What the generated ruleset logs on each matched rule.
    #[arg(long = "log-type", value_enum, default_value_t = LogTypeArg::None)]
    pub log_type: LogTypeArg,
    /// nftables log group to use when `--log-type` requires one.
    #[arg(long = "log-group")]
    pub log_group: Option<u16>,
    /// Parse and compile the profile without writing any output files.
    #[arg(long)]
    pub test: bool,
    /// Directory the ruleset and classifier config are written into.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
    /// nftables table name for the generated chain.
    #[arg(long, default_value = "firewall")]
    pub table: String,
    /// nftables chain name for the generated chain.
    #[arg(long, default_value = "input")]
    pub chain: String,
}

#[derive(Parser)]
pub struct ClassifyArgs {
    /// Path to a `fw translate`-produced classifier configuration.
    pub config_path: PathBuf,
    /// Directory classifier CSV logs are appended to.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct MergeArgs {
    pub kernel_log: PathBuf,
    pub classifier_log: PathBuf,
    pub out_log: PathBuf,
}

#[derive(Parser)]
pub struct ReconcileArgs {
    pub merged_log: PathBuf,
    pub edit_log: PathBuf,
    pub profile_path: PathBuf,
    pub ground_truth_log: PathBuf,
    pub out_log: PathBuf,
}
