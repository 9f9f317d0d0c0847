use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/vista.toml";

#[derive(Parser)]
#[command(
    name = "vista",
    about = "Vista: many dashboard sources, one page",
    version
)]
pub struct Cli {
    /// Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file.
    #[arg(short, long, global = true, env = "VISTA_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Refresh periodically, serve over HTTP, send the daily email
    Serve,
    /// Run one refresh cycle and print the document
    Render(RenderArgs),
    /// Validate the configuration
    Check,
    /// Run one refresh cycle and email the result
    SendEmail,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Print the simplified document
    #[arg(long)]
    pub simplified: bool,
    /// Convert to plain text
    #[arg(long)]
    pub text: bool,
}
