// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatvault - multi-tenant WhatsApp conversation backup service.
//!
//! Binary entry point: the long-running `serve` daemon plus operator
//! commands for accounts, connections, and on-demand backups.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod account;
mod backup;
mod providers;
mod serve;
mod shutdown;
mod status;

/// Chatvault - multi-tenant WhatsApp conversation backup service.
#[derive(Parser, Debug)]
#[command(name = "chatvault", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the backup service with both tier schedulers.
    Serve,
    /// Create a user account on the express tier.
    Signup {
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Store business API credentials for a pro user and verify them.
    ConnectApi {
        user_id: String,
        phone_id: String,
        access_token: String,
    },
    /// Start a QR-linked bridge session for an express user.
    ConnectBridge { user_id: String },
    /// Tear down a user's bridge session.
    Disconnect { user_id: String },
    /// Run one backup for a user now.
    Backup { user_id: String },
    /// Show a user's provider connection and plan usage.
    Status { user_id: String },
    /// List a user's recent backup runs.
    History {
        user_id: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Search a user's archived messages.
    Search { user_id: String, query: String },
    /// Upgrade a user to the pro tier.
    Upgrade { user_id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match chatvault_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            chatvault_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    serve::init_tracing(&config.service.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Signup { email, name, phone }) => {
            account::run_signup(config, &email, name, phone).await
        }
        Some(Commands::ConnectApi {
            user_id,
            phone_id,
            access_token,
        }) => account::run_connect_api(config, &user_id, &phone_id, &access_token).await,
        Some(Commands::ConnectBridge { user_id }) => {
            account::run_connect_bridge(config, &user_id).await
        }
        Some(Commands::Disconnect { user_id }) => account::run_disconnect(config, &user_id).await,
        Some(Commands::Backup { user_id }) => backup::run_backup(config, &user_id).await,
        Some(Commands::Status { user_id }) => status::run_status(config, &user_id).await,
        Some(Commands::History { user_id, limit }) => {
            status::run_history(config, &user_id, limit).await
        }
        Some(Commands::Search { user_id, query }) => {
            status::run_search(config, &user_id, &query).await
        }
        Some(Commands::Upgrade { user_id }) => account::run_upgrade(config, &user_id).await,
        None => {
            println!("chatvault: use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
