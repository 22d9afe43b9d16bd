//! Per-call policy switches and attempt tags.

use serde::{Deserialize, Serialize};

/// Tri-state switch for failover, replication and load balancing.
///
/// Resolved once at the start of a call against the registry's global
/// defaults and never re-read while the call is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoMode {
    /// Off for this call.
    Disabled,
    /// Defer to the global setting.
    #[default]
    UseGlobalDefault,
    /// On for this call.
    Enabled,
}

impl AutoMode {
    /// Resolves the mode against the global default.
    pub fn resolve(self, global_default: bool) -> bool {
        match self {
            AutoMode::Disabled => false,
            AutoMode::UseGlobalDefault => global_default,
            AutoMode::Enabled => true,
        }
    }
}

/// Why a provider attempt was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// The preferred provider.
    FirstAttempt,
    /// A provider from the failover list after an earlier failure.
    AutoFailover,
    /// A replica write after a successful primary write.
    AutoReplication,
    /// An extra write to spread read traffic.
    AutoLoadBalance,
}

impl std::fmt::Display for SaveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveMode::FirstAttempt => write!(f, "first attempt"),
            SaveMode::AutoFailover => write!(f, "auto-failover"),
            SaveMode::AutoReplication => write!(f, "auto-replication"),
            SaveMode::AutoLoadBalance => write!(f, "auto-load-balance"),
        }
    }
}
