#![deny(unsafe_code)]

mod config;
mod constants;
mod debugger;
mod gui;
mod scanner;
mod symbols;
mod types;

use anyhow::Result;
use clap::Parser;
use tracing::Level as TraceLevel;
use tracing_subscriber::FmtSubscriber;

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "dump-triage")]
#[command(version)]
#[command(about = "Memory dump triage for support cases", long_about = None)]
struct Cli {
    /// Enable debug-level logging
    #[arg(long)]
    debug: bool,

    /// Case number to scan for dumps on startup
    #[arg(long)]
    case: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.debug {
        TraceLevel::DEBUG
    } else {
        TraceLevel::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let settings = Settings::load()?;
    gui::run_gui(settings, cli.case)
}
