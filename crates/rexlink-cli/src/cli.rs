//! Command-line interface definitions and parsing

use clap::{Args, Parser, Subcommand};
use rexlink_core::{Direction, Region, Selection, SubPart};

use crate::error::Result;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect, perform one gesture and disconnect
    Press(GestureArgs),
    /// Perform one gesture without connecting and print the packets
    Preview(GestureArgs),
    /// Print which directions each region and part accepts
    Capabilities,
    /// Connect and drive the animatronic from stdin
    Console,
}

/// One press-hold-release gesture
#[derive(Args, Debug, Clone)]
pub struct GestureArgs {
    /// Body region (headNeck, arms, tailSpine, legsPelvis)
    #[arg(short, long)]
    pub region: Region,

    /// Sub-part of the region; the whole region when omitted
    #[arg(short, long)]
    pub part: Option<SubPart>,

    /// Direction to press (up, down, left, right, center)
    #[arg(short, long)]
    pub direction: Direction,

    /// How long to hold before releasing
    #[arg(long, default_value_t = 500)]
    pub hold_ms: u64,
}

impl GestureArgs {
    pub fn selection(&self) -> Result<Selection> {
        Ok(Selection::new(self.region, self.part.unwrap_or(SubPart::Full))?)
    }
}
