//! Command-line interface for chess_arbiter.

use clap::Parser;
use std::path::PathBuf;

/// Chess Arbiter - automated chess matches between LLM agents
#[derive(Parser, Debug)]
#[command(name = "chess_arbiter")]
#[command(about = "Automated chess matches between LLM agents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Run one full match and save the record
    #[arg(long, conflicts_with_all = ["replay", "list"])]
    pub play: bool,

    /// Step through a saved match (filename, or ordinal from --list)
    #[arg(long, value_name = "FILE", conflicts_with = "list")]
    pub replay: Option<String>,

    /// Print saved matches, newest first
    #[arg(long)]
    pub list: bool,

    /// Path to the match configuration file
    #[arg(short, long, default_value = "arbiter.toml")]
    pub config: PathBuf,
}
