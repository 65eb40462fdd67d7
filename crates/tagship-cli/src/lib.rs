//! tagship - release versions and source archives from git tags
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Command-line front end for `tagship-core`. Every command works on the
//! repository in the current directory (or the one given with `-C`).

pub mod cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tagship_core::ArchiveFormat;
use tagship_core::config::CONFIG_FILE;
use tagship_core::package::PackageFormat;

#[derive(Debug, Parser)]
#[command(name = "tagship")]
#[command(author, version, about = "tagship - release versions and source archives from git tags")]
pub struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, env = "TAGSHIP_CONFIG", default_value = CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the nearest version tag, distance and worktree state
    Describe,
    /// Print the semantic version of HEAD
    Version,
    /// List the files of the nearest tag's tree
    List,
    /// Write a source archive of the tagged tree
    Archive {
        /// Archive format (tar.gz or zip)
        #[arg(long, env = "TAGSHIP_ARCHIVE_FORMAT")]
        format: Option<ArchiveFormat>,
        /// Entry prefix (defaults to <name>-<version>)
        #[arg(long)]
        prefix: Option<String>,
        /// Output file (defaults to <prefix>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Archive extra paths alone if the tag's tree cannot be read
        #[arg(long)]
        allow_unreadable_tree: bool,
        /// Extra paths to include, relative to the repository root
        extra: Vec<String>,
    },
    /// Print the package file name for this version
    Package {
        /// Target architecture (amd64, arm64, 386, arm7, ...)
        #[arg(long, env = "TAGSHIP_ARCH", default_value = std::env::consts::ARCH)]
        arch: String,
        /// Package format
        #[arg(long, default_value = "deb")]
        format: PackageFormat,
    },
    /// Run the test suite
    Test {
        /// Include integration tests
        #[arg(long)]
        integration: bool,
        /// Extra arguments for cargo test
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run cargo build
    Build {
        /// Arguments for cargo build
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run cargo install
    Install {
        /// Arguments for cargo install
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}
