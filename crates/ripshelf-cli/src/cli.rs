use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ripshelf",
    about = "Unattended optical-disc ingestion for a home media library",
    version
)]
pub struct Cli {
    /// Base URL of a running ripshelf server, for the inspection commands.
    #[arg(
        long,
        env = "RIPSHELF_URL",
        global = true,
        default_value = "http://127.0.0.1:7979"
    )]
    pub server: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline and the control surface.
    Serve {
        /// Keep all state in memory instead of the on-disk store.
        #[arg(long)]
        ephemeral: bool,
    },

    /// Show job counts and the active-mode flag.
    Status,

    /// List recent jobs.
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Include archived jobs.
        #[arg(long)]
        include_archived: bool,
    },

    /// Run the pipeline consistency check.
    Check,

    /// Return surplus encoding jobs to the queue.
    FixEncoding,
}
