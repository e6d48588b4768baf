//! CLI command definitions for the `parl` binary.
//!
//! Uses clap derive macros for argument parsing. Two commands: `serve` runs
//! the HTTP/WebSocket server, `user add` provisions a user and prints its
//! bearer token once.

use clap::{Parser, Subcommand};

use crate::state::AppState;

/// Run the Parlance conversational chat service.
#[derive(Parser)]
#[command(name = "parl", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Export traces via OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP and WebSocket server.
    Serve {
        /// Host to bind to (overrides config.toml).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config.toml).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create a user and print its bearer token.
    Add {
        /// Username, unique across the instance.
        username: String,
    },
}

/// `parl user add <username>` -- provision a user and print the token.
pub async fn user_add(state: &AppState, username: &str) -> anyhow::Result<()> {
    let issued = state.user_store.create_user(username).await?;

    println!();
    println!(
        "  {} User '{}' created",
        console::style("✓").green(),
        console::style(&issued.username).cyan()
    );
    println!();
    println!(
        "  {} Token (save this -- it won't be shown again):",
        console::style("🔑").bold()
    );
    println!();
    println!("  {}", console::style(&issued.token).yellow().bold());
    println!();

    Ok(())
}
