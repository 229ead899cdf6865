//! Command handlers for the rexlink CLI

use std::time::Duration;

use rexlink_core::{Delivery, Region, RexResolver, Selection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::app::RexApp;
use crate::cli::{Cli, Commands, GestureArgs};
use crate::config::AppConfig;
use crate::console::{self, ConsoleCommand, HELP};
use crate::error::Result;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Press(args) => Self::handle_press_command(config, args).await,
            Commands::Preview(args) => Self::handle_preview_command(config, args).await,
            Commands::Capabilities => {
                print!("{}", render_capabilities(&RexResolver::default()));
                Ok(())
            }
            Commands::Console => Self::handle_console_command(config).await,
        }
    }

    /// Connect, run one gesture, disconnect
    async fn handle_press_command(config: AppConfig, args: GestureArgs) -> Result<()> {
        let selection = args.selection()?;
        let app = RexApp::new(config)?;
        let _events = app.echo_link_events();

        let connection = app.connect().await?;
        println!("Connected to {}", connection.peer());

        let result = app
            .gesture(selection, args.direction, Duration::from_millis(args.hold_ms))
            .await;
        app.shutdown().await;
        result
    }

    /// Run one gesture with no link and print what would have been sent
    async fn handle_preview_command(config: AppConfig, args: GestureArgs) -> Result<()> {
        let selection = args.selection()?;
        let app = RexApp::new(config)?;
        let _printer = app.dispatcher().on_outbound(|record| {
            if record.delivery == Delivery::Preview {
                print!("{}", record.line);
            }
        });

        let result = app
            .gesture(selection, args.direction, Duration::from_millis(args.hold_ms))
            .await;
        app.shutdown().await;
        result
    }

    /// Interactive stdin loop over a live connection
    async fn handle_console_command(config: AppConfig) -> Result<()> {
        let app = RexApp::new(config)?;
        let _events = app.echo_link_events();

        let connection = app.connect().await?;
        println!("Connected to {}. Type help for commands.", connection.peer());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            };
            let Some(line) = line else {
                break;
            };

            let command = match console::parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    eprintln!("{:#}", e);
                    continue;
                }
            };
            if command == ConsoleCommand::Quit {
                break;
            }
            if let Err(e) = Self::run_console_command(&app, command).await {
                eprintln!("{}", e);
            }
        }

        app.shutdown().await;
        Ok(())
    }

    async fn run_console_command(app: &RexApp, command: ConsoleCommand) -> Result<()> {
        let dispatcher = app.dispatcher();
        match command {
            ConsoleCommand::Select(selection) => dispatcher.select(selection).await,
            ConsoleCommand::Press(direction) => app.press(direction).await?,
            ConsoleCommand::Release => {
                if !dispatcher.release().await {
                    println!("Nothing to release");
                }
            }
            ConsoleCommand::Hold(direction, hold) => {
                app.press(direction).await?;
                tokio::time::sleep(hold).await;
                dispatcher.release().await;
            }
            ConsoleCommand::Request(request) => {
                if !dispatcher.send_request(&request).await? {
                    warn!("Request not valid for {}/{}", request.target, request.part);
                }
            }
            ConsoleCommand::Status => println!("{}", app.status()),
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => {}
        }
        Ok(())
    }
}

/// One line per accepted gesture with its command and stop rule
pub fn render_capabilities(resolver: &RexResolver) -> String {
    let mut out = String::new();
    for region in Region::ALL {
        for part in region.parts() {
            let Ok(selection) = Selection::new(region, *part) else {
                continue;
            };
            for direction in resolver.capabilities().directions(selection) {
                let Some(family) = resolver.family(selection, *direction) else {
                    continue;
                };
                out.push_str(&format!(
                    "{:<11} {:<7} {:<6} {:<18} {}\n",
                    region.as_str(),
                    part.as_str(),
                    direction.as_str(),
                    family.cmd(),
                    family.stop_semantics()
                ));
            }
        }
    }
    out
}
