//! Storecart CLI - Inspect and edit a cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with totals
//! storecart show
//!
//! # Add one unit of product 7
//! storecart add 7
//!
//! # Set product 7 to three units
//! storecart update 7 3
//!
//! # Remove product 7
//! storecart remove 7
//! ```
//!
//! # Commands
//!
//! - `show` - Print entries, item count and subtotal
//! - `add` - Add one unit of a product
//! - `remove` - Remove a product
//! - `update` - Set a product's amount
//!
//! Configuration comes from the environment; see `storecart_client::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use storecart_client::ClientConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "storecart")]
#[command(author, version, about = "Storecart cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        id: i32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        id: i32,
    },
    /// Set the amount of a product already in the cart
    Update {
        /// Product ID
        id: i32,

        /// Desired amount (zero or less is ignored)
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed before tracing so Sentry can be wired in
    let config = ClientConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storecart_client=info,storecart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), commands::CliError> {
    let store = commands::open_store(config).await?;

    match cli.command {
        Commands::Show => {}
        Commands::Add { id } => commands::add(&store, id).await?,
        Commands::Remove { id } => commands::remove(&store, id).await?,
        Commands::Update { id, amount } => commands::update(&store, id, amount).await?,
    }

    commands::print_summary(&store.summary());
    Ok(())
}
