//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Parse and merge Paradox-style script directories into one document
#[derive(Parser, Debug)]
#[command(name = "pdxmerge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge every script below DIR into one file
    Merge {
        /// Directory to scan
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,

        /// Output file (default: settings.output_file)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Write @name = value defines before the merged nodes
        #[arg(long)]
        emit_defines: bool,
    },

    /// Parse one file and print its normalized form
    Parse {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Report lines the parser skipped or could not read
    Check {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
    },

    /// List @defines found below DIR
    Defines {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
    },

    /// List script files in merge order
    Files {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
    },

    /// Manage settings
    Config {
        /// Directory whose local .pdxmerge.toml is included
        #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
        dir: Option<PathBuf>,

        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print a config template
    Init,
}
