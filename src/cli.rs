//! CLI struct definitions for the backspec command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "backspec",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactively assemble a declarative backend specification: data tables, sign-in providers and REST APIs, kept consistent across features."
)]
pub(crate) struct Cli {
    /// Project directory holding backend-project.yml (defaults to the current directory).
    #[clap(long, global = true)]
    pub dir: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create a starter project document
    Init {
        /// Project name (defaults to the directory name)
        #[clap(long)]
        name: Option<String>,
        /// Provisioning region (defaults to config, then us-east-1)
        #[clap(long)]
        region: Option<String>,
    },
    /// Render a summary of the project document
    Show {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// List every known feature with its configured status
    Features {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Run one feature's interactive editor
    Configure {
        /// Feature to configure: database, sign-in, cloudlogic, ...
        feature: String,
        /// JSON array of pre-recorded answers for non-interactive runs
        #[clap(long)]
        answers: Option<PathBuf>,
    },
    /// Render the workflow journal
    Journal {
        /// Show at most N most recent events
        #[clap(long, default_value = "50")]
        limit: usize,
    },
}
