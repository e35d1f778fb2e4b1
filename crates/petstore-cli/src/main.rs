//! # petstore CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// Pet-store commerce toolchain.
///
/// Validates catalog packs, seeds the database, mints bearer tokens, and
/// computes shipping quotes.
#[derive(Parser, Debug)]
#[command(name = "petstore", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Parse and validate a catalog pack YAML.
    Validate(petstore_cli::validate::ValidateArgs),
    /// Upsert a catalog pack into Postgres.
    Seed(petstore_cli::seed::SeedArgs),
    /// Mint a bearer token in the API's format.
    Token(petstore_cli::token::TokenArgs),
    /// Compute a shipping quote.
    Quote(petstore_cli::quote::QuoteArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => petstore_cli::validate::run(&args),
        Commands::Seed(args) => petstore_cli::seed::run(&args).await,
        Commands::Token(args) => petstore_cli::token::run(&args),
        Commands::Quote(args) => petstore_cli::quote::run(&args),
    }
}
