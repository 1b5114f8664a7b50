//! The `YML_STATUS` field of a node.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Load state of a node's YAML definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum YmlStatus {
    /// Nothing loaded yet, or loading was stopped.
    #[default]
    NotLoaded,
    /// A sync was requested and the clone is being set up.
    GitConnecting,
    /// The clone is transferring data.
    GitLoading,
    /// The clone finished; content not merged yet.
    GitLoaded,
    /// Content was merged into the node definition.
    Found,
    /// The last sync failed; see `YML_ERROR_MSG`.
    Error,
}

impl YmlStatus {
    pub const ALL: [YmlStatus; 6] = [
        YmlStatus::NotLoaded,
        YmlStatus::GitConnecting,
        YmlStatus::GitLoading,
        YmlStatus::GitLoaded,
        YmlStatus::Found,
        YmlStatus::Error,
    ];

    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            YmlStatus::NotLoaded => "NOT_LOADED",
            YmlStatus::GitConnecting => "GIT_CONNECTING",
            YmlStatus::GitLoading => "GIT_LOADING",
            YmlStatus::GitLoaded => "GIT_LOADED",
            YmlStatus::Found => "FOUND",
            YmlStatus::Error => "ERROR",
        }
    }

    /// True while a sync owns the field.
    ///
    /// A task that sees any other value has been stopped or superseded and
    /// must not write `ERROR`.
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            YmlStatus::GitConnecting | YmlStatus::GitLoading | YmlStatus::GitLoaded
        )
    }

    /// True once a clone has completed successfully.
    pub fn is_loaded(self) -> bool {
        matches!(self, YmlStatus::GitLoaded | YmlStatus::Found)
    }
}

impl fmt::Display for YmlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored status value is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown YML status '{0}'")]
pub struct ParseYmlStatusError(pub String);

impl FromStr for YmlStatus {
    type Err = ParseYmlStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        YmlStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseYmlStatusError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_set() {
        assert!(YmlStatus::GitConnecting.is_loading());
        assert!(YmlStatus::GitLoading.is_loading());
        assert!(YmlStatus::GitLoaded.is_loading());
        assert!(!YmlStatus::NotLoaded.is_loading());
        assert!(!YmlStatus::Found.is_loading());
        assert!(!YmlStatus::Error.is_loading());
    }

    #[test]
    fn test_loaded_set() {
        assert!(YmlStatus::GitLoaded.is_loaded());
        assert!(YmlStatus::Found.is_loaded());
        assert!(!YmlStatus::GitLoading.is_loaded());
    }

    #[test]
    fn test_parse_matches_display() {
        for status in YmlStatus::ALL {
            assert_eq!(status.to_string().parse::<YmlStatus>().unwrap(), status);
        }
        assert_eq!(
            "LOADING".parse::<YmlStatus>(),
            Err(ParseYmlStatusError("LOADING".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_stored_names() {
        let json = serde_json::to_string(&YmlStatus::GitLoading).unwrap();
        assert_eq!(json, "\"GIT_LOADING\"");
    }
}
