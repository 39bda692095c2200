//! Anchor command - submit a scan to the server
//!
//! The file holds the same JSON body `POST /tx/anchor-scan` accepts:
//!
//! ```json
//! {"scan_id": "...", "garment_id": "...", "resolved_scope": "public",
//!  "policy_version": "policy-1",
//!  "allowed_facets": [{"facet_type": "authenticity", "payload_preview": {}}]}
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use twin_core::{AnchorRequest, Facet};

use super::{client, endpoint, read_response};

/// Arguments for the anchor command
#[derive(Args)]
pub struct AnchorArgs {
    /// Path to the anchor request JSON file
    #[arg(long, short = 'f', value_name = "FILE")]
    file: PathBuf,

    /// Validate the file locally without contacting the server
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(server: &str, args: AnchorArgs) -> Result<()> {
    let body = load_request(&args.file)?;

    if args.dry_run {
        crate::print_success(&format!("{} is a valid anchor request", args.file.display()));
        return Ok(());
    }

    tracing::info!(server = %server, "Submitting anchor request");
    let response = client()?
        .post(endpoint(server, "/tx/anchor-scan"))
        .json(&body)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", server))?;
    let result = read_response(response).await?;

    println!("{}", "Scan anchored".bold().cyan());
    println!("{}", "═".repeat(40).cyan());
    for (label, key) in [
        ("public tx ", "cardano_tx_hash"),
        ("private tx", "midnight_tx_hash"),
        ("root      ", "crosschain_root_hash"),
    ] {
        println!("  {} {}", label.dimmed(), result[key].as_str().unwrap_or("-"));
    }
    Ok(())
}

/// Read the request file and check it the way the server will
fn load_request(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;
    let body: Value = serde_json::from_str(&content).context("Failed to parse request JSON")?;
    if !body.is_object() {
        bail!("Request file must contain a JSON object");
    }

    let text = |key: &str| body[key].as_str().unwrap_or_default().to_string();
    let facets: Vec<Facet> = match body.get("allowed_facets") {
        Some(v) => serde_json::from_value(v.clone()).context("Invalid allowed_facets")?,
        None => Vec::new(),
    };

    if let Err(e) = AnchorRequest::from_wire(
        &text("scan_id"),
        &text("garment_id"),
        &text("resolved_scope"),
        facets,
        &text("policy_version"),
    ) {
        let lines: Vec<String> = e.fields().iter().map(|f| format!("  {}", f)).collect();
        bail!("Request file is invalid:\n{}", lines.join("\n"));
    }
    Ok(body)
}
