//! Twin CLI - Command-line interface for Twin Anchor
//!
//! # Usage
//!
//! ```bash
//! # Compute a cross-ledger root offline
//! twin link --public <tx> --private <tx> --scan <uuid>
//!
//! # Anchor a scan described in a JSON file
//! twin anchor --file scan.json
//!
//! # Check a root or a single transaction against a running server
//! twin verify-root <root>
//! twin verify-tx public <tx>
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;

use commands::{anchor, link, verify};

/// Twin Anchor - dual-ledger scan anchoring
#[derive(Parser)]
#[command(
    name = "twin",
    version,
    about = "Twin Anchor CLI - cross-ledger roots and anchor checks",
    long_about = "Twin Anchor commits scan facts to a public ledger and a shielded\n\
                  ledger and binds both transactions with a cross-ledger root.\n\n\
                  This CLI computes roots offline and talks to a running server."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Base URL of the Twin Anchor server
    #[arg(
        long,
        env = "TWIN_SERVER_URL",
        default_value = "http://localhost:8080",
        global = true
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a cross-ledger root without contacting any ledger
    #[command(name = "link")]
    Link(link::LinkArgs),

    /// Anchor a scan through the server
    #[command(name = "anchor")]
    Anchor(anchor::AnchorArgs),

    /// Check a cross-ledger root
    #[command(name = "verify-root")]
    VerifyRoot(verify::VerifyRootArgs),

    /// Check confirmation of one transaction
    #[command(name = "verify-tx")]
    VerifyTx(verify::VerifyTxArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Link(args) => link::run(args),
        Commands::Anchor(args) => anchor::run(&cli.server, args).await,
        Commands::VerifyRoot(args) => verify::run_root(&cli.server, args).await,
        Commands::VerifyTx(args) => verify::run_tx(&cli.server, args).await,
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();
}

/// Print a success message with a checkmark
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print a failure message with an X
pub fn print_failure(msg: &str) {
    println!("{} {}", "✗".red().bold(), msg);
}
