//! Subcommands and the small HTTP helper they share

pub mod anchor;
pub mod link;
pub mod verify;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::Duration;

pub(crate) fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("Failed to build HTTP client")
}

/// Server response body, or the server's error envelope as an error
pub(crate) async fn read_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .with_context(|| format!("Server returned {} with a non-JSON body", status))?;

    if status.is_success() {
        return Ok(body);
    }

    let code = body["error"]["code"].as_str().unwrap_or("UNKNOWN");
    let message = body["error"]["message"].as_str().unwrap_or("no message");
    let mut text = format!("{} {}: {}", status.as_u16(), code, message);
    if let Some(details) = body["error"]["details"].as_array() {
        for d in details {
            text.push_str(&format!(
                "\n  {}: {}",
                d["field"].as_str().unwrap_or("?"),
                d["message"].as_str().unwrap_or("?")
            ));
        }
    }
    bail!(text)
}

pub(crate) fn endpoint(server: &str, path: &str) -> String {
    format!("{}{}", server.trim_end_matches('/'), path)
}
