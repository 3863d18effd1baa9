// ============================================================
// RESOLUTION TYPES
// ============================================================
// Outcome of one ISP lookup, kept tagged so callers can tell a real
// ISP name apart from a failed lookup

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label written for lookups that returned no ISP
pub const UNKNOWN_ISP: &str = "Unknown";

/// One (row index, IP) pair submitted to the resolver during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTask {
    pub row_index: usize,
    pub ip: String,
}

impl ResolutionTask {
    pub fn new(row_index: usize, ip: impl Into<String>) -> Self {
        Self {
            row_index,
            ip: ip.into(),
        }
    }
}

/// Why a lookup did not produce an ISP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ResolutionFailure {
    /// The service answered with a non-200 status
    Status(u16),
    /// Connection, timeout or body decoding failure
    Transport(String),
}

/// Result of resolving one IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionResult {
    Resolved { isp: String },
    Unknown,
    Failed { failure: ResolutionFailure },
}

impl ResolutionResult {
    pub fn resolved(isp: impl Into<String>) -> Self {
        Self::Resolved { isp: isp.into() }
    }

    pub fn status(code: u16) -> Self {
        Self::Failed {
            failure: ResolutionFailure::Status(code),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Failed {
            failure: ResolutionFailure::Transport(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Text written into `application_type` for this result.
    pub fn label(&self) -> String {
        match self {
            Self::Resolved { isp } => isp.clone(),
            Self::Unknown => UNKNOWN_ISP.to_string(),
            Self::Failed {
                failure: ResolutionFailure::Status(code),
            } => format!("Error: Status code {}", code),
            Self::Failed {
                failure: ResolutionFailure::Transport(message),
            } => format!("Error: {}", message),
        }
    }
}

impl fmt::Display for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
