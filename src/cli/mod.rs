use clap::{Parser, Subcommand};

/// Walk-in clinic intake, triage, and realtime queue server
#[derive(Parser)]
#[command(name = "carelane-server", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server (default when no command is given)
    Serve,
    /// Grab a single frame from the configured camera and report on it
    ProbeCamera,
}
