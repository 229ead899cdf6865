//! rexlink CLI library
//!
//! Components behind the `rexlink` binary: argument parsing, configuration
//! loading, the console line parser and the command handlers.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;

pub use app::RexApp;
pub use cli::{Cli, Commands, GestureArgs};
pub use config::AppConfig;
pub use error::{CliError, Result};
