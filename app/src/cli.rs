//! Command line surface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in, load the mailbox, and print new mail as it arrives
    Watch,

    /// Send a message and exit
    Send {
        /// Semicolon-delimited recipient list
        #[arg(long)]
        to: String,

        /// Subject line (may be empty)
        #[arg(long, default_value = "")]
        subject: String,

        /// Message body
        #[arg(long)]
        body: String,
    },

    /// Open the webmail view in the default browser
    OpenWeb,
}
