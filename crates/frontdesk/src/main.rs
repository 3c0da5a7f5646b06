// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frontdesk - online queue service for clinic front desks.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod token;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use frontdesk_config::{ConfigError, FrontdeskConfig};

/// Frontdesk - online queue service for clinic front desks.
#[derive(Parser, Debug)]
#[command(name = "frontdesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the gateway, broadcast hub, and auto-close scheduler.
    Serve,
    /// Validate configuration and exit.
    CheckConfig,
    /// Print a signed join token for a resource (e.g. for a QR poster).
    Token {
        /// Resource (doctor/room) identifier.
        resource_id: String,
        /// Queue day as YYYY-MM-DD. Defaults to today in clinic time.
        #[arg(long)]
        day: Option<NaiveDate>,
    },
}

fn load(path: Option<&std::path::Path>) -> Result<FrontdeskConfig, Vec<ConfigError>> {
    match path {
        Some(path) => frontdesk_config::load_and_validate_path(path),
        None => frontdesk_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            frontdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::CheckConfig) => {
            println!(
                "frontdesk: config ok (clinic.name={}, gateway={}:{})",
                config.clinic.name, config.gateway.host, config.gateway.port
            );
            Ok(())
        }
        Some(Commands::Token { resource_id, day }) => {
            token::print_token(&config, &resource_id, day)
        }
        None => {
            println!("frontdesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
