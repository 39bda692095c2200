//! Verify commands - cross-ledger roots and single transactions
//!
//! ```bash
//! twin verify-root <root>
//! twin verify-tx public <tx>
//! ```

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::json;

use super::{client, endpoint, read_response};

#[derive(Args)]
pub struct VerifyRootArgs {
    /// Cross-ledger root, 64 hex characters
    root: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LedgerArg {
    Public,
    Private,
}

impl LedgerArg {
    fn path_segment(&self) -> &'static str {
        match self {
            LedgerArg::Public => "public",
            LedgerArg::Private => "private",
        }
    }
}

#[derive(Args)]
pub struct VerifyTxArgs {
    /// Which ledger to query
    #[arg(value_enum)]
    ledger: LedgerArg,

    /// Transaction id, 64 hex characters
    tx_id: String,
}

pub async fn run_root(server: &str, args: VerifyRootArgs) -> Result<()> {
    let response = client()?
        .post(endpoint(server, "/tx/verify-root"))
        .json(&json!({"crosschain_root_hash": args.root.trim()}))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", server))?;
    let body = read_response(response).await?;

    if body["is_consistent"].as_bool().unwrap_or(false) {
        crate::print_success(&format!("Root {} is consistent", args.root.trim()));
    } else {
        crate::print_failure(&format!("Root {} is not consistent", args.root.trim()));
    }
    Ok(())
}

pub async fn run_tx(server: &str, args: VerifyTxArgs) -> Result<()> {
    let path = format!(
        "/tx/verify/{}/{}",
        args.ledger.path_segment(),
        args.tx_id.trim()
    );
    let response = client()?
        .get(endpoint(server, &path))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", server))?;
    let body = read_response(response).await?;

    let ledger = body["ledger"].as_str().unwrap_or("?");
    if body["confirmed"].as_bool().unwrap_or(false) {
        crate::print_success(&format!("{} transaction {} is confirmed", ledger, args.tx_id.trim()));
    } else {
        crate::print_failure(&format!(
            "{} transaction {} is not confirmed",
            ledger,
            args.tx_id.trim()
        ));
    }
    Ok(())
}
