//! Per-ledger submission strategy

use std::fmt;
use std::str::FromStr;

/// Operator-selected mode for one ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerMode {
    /// Real when an endpoint is configured, simulated otherwise
    #[default]
    Auto,
    Real,
    Simulated,
}

impl FromStr for LedgerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(LedgerMode::Auto),
            "real" => Ok(LedgerMode::Real),
            "simulated" | "sim" => Ok(LedgerMode::Simulated),
            other => Err(format!(
                "unknown ledger mode '{}', expected auto, real or simulated",
                other
            )),
        }
    }
}

/// Resolved submission path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Real,
    Simulated,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Real => f.write_str("real"),
            Strategy::Simulated => f.write_str("simulated"),
        }
    }
}

/// Inputs to strategy selection for one ledger
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerSettings {
    pub mode: LedgerMode,
    pub endpoint: Option<String>,
    /// Substitute a simulated id when a real submission fails
    pub fallback: bool,
}

/// Decide once, at construction, how a ledger is reached
pub fn choose_strategy(settings: &LedgerSettings) -> Strategy {
    match settings.mode {
        LedgerMode::Real => Strategy::Real,
        LedgerMode::Simulated => Strategy::Simulated,
        LedgerMode::Auto if settings.endpoint.is_some() => Strategy::Real,
        LedgerMode::Auto => Strategy::Simulated,
    }
}
