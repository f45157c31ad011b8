//! Command-line definition

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "netplanctl")]
#[command(about = "Transactional netplan configuration engine")]
#[command(version)]
#[command(long_about = "
Transactional netplan configuration engine

Edits the managed netplan document, resolves interface conflicts and
applies the result with automatic rollback on failure.

Examples:
  echo '{\"action\":\"load\"}' | netplanctl request
  netplanctl request -f add-bond.json
  netplanctl show
  netplanctl validate -f /etc/netplan/50-cloud-init.yaml
  netplanctl status
")]
pub struct Cli {
    /// Settings file (default /etc/netplanctl/settings.toml)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Handle one JSON request and print the JSON response
    Request {
        /// Read the request from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the managed document as YAML
    Show,

    /// Report conflicts without writing anything
    Validate {
        /// Document to check instead of the managed one
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print live interface status
    Status,
}
