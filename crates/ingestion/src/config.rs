//! Ingest policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When a delivered file is removed from the spool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Remove every file once handled, including skipped and failed ones
    #[default]
    Always,
    /// Keep files whose processing failed, for reprocessing
    OnSuccess,
    Never,
}

impl CleanupPolicy {
    /// Whether a file whose processing ended with `failed` is removed.
    pub fn removes(self, failed: bool) -> bool {
        match self {
            CleanupPolicy::Always => true,
            CleanupPolicy::OnSuccess => !failed,
            CleanupPolicy::Never => false,
        }
    }
}

impl FromStr for CleanupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "always" => Ok(CleanupPolicy::Always),
            "on_success" => Ok(CleanupPolicy::OnSuccess),
            "never" => Ok(CleanupPolicy::Never),
            other => Err(format!(
                "unknown cleanup policy '{}' (expected always, on-success or never)",
                other
            )),
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CleanupPolicy::Always => "always",
            CleanupPolicy::OnSuccess => "on-success",
            CleanupPolicy::Never => "never",
        })
    }
}

/// Options for an ingest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestOptions {
    #[serde(default)]
    pub cleanup: CleanupPolicy,
    /// Turn the first failed file into a fatal error that stops the batch
    #[serde(default)]
    pub exit_on_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_policy_removes() {
        assert!(CleanupPolicy::Always.removes(true));
        assert!(CleanupPolicy::OnSuccess.removes(false));
        assert!(!CleanupPolicy::OnSuccess.removes(true));
        assert!(!CleanupPolicy::Never.removes(false));
    }

    #[test]
    fn test_cleanup_policy_parse() {
        assert_eq!("on-success".parse(), Ok(CleanupPolicy::OnSuccess));
        assert_eq!("ON_SUCCESS".parse(), Ok(CleanupPolicy::OnSuccess));
        assert_eq!("never".parse(), Ok(CleanupPolicy::Never));
        assert!("sometimes".parse::<CleanupPolicy>().is_err());
        assert_eq!(CleanupPolicy::OnSuccess.to_string(), "on-success");
    }

    #[test]
    fn test_options_default() {
        let options = IngestOptions::default();
        assert_eq!(options.cleanup, CleanupPolicy::Always);
        assert!(!options.exit_on_error);
    }
}
