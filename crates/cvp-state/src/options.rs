//! Reconciliation options
//!
//! Each option serializes the way it is written in YAML and parses from the
//! same spelling (used for environment variables).

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the declared resources should exist
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Create or update
    #[default]
    Present,

    /// Delete
    Absent,

    /// Reset devices back to ZTP (devices only)
    FactoryReset,
}

/// How attached configlets are reconciled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Only attach missing configlets
    #[default]
    Loose,

    /// Attach missing and detach undeclared configlets
    Strict,
}

/// How declared containers are reconciled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContainerMode {
    #[default]
    Merge,
    Override,
    Delete,
}

/// Which device attribute identifies a declared device in the inventory
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SearchKey {
    #[default]
    Hostname,
    Fqdn,
    SerialNumber,
}

/// How a declared device missing from the inventory is treated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InventoryMode {
    /// Warn and skip
    Loose,

    /// Fail the device manager
    #[default]
    Strict,
}

/// Target state of the listed tasks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Executed,
    Cancelled,
}

macro_rules! option_strings {
    ($ty:ident, $option:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = StateError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(StateError::UnknownOption {
                        option: $option,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

option_strings!(ResourceState, "state", {
    Present => "present",
    Absent => "absent",
    FactoryReset => "factory_reset",
});

option_strings!(ApplyMode, "apply mode", {
    Loose => "loose",
    Strict => "strict",
});

option_strings!(ContainerMode, "container mode", {
    Merge => "merge",
    Override => "override",
    Delete => "delete",
});

option_strings!(SearchKey, "search key", {
    Hostname => "hostname",
    Fqdn => "fqdn",
    SerialNumber => "serialNumber",
});

option_strings!(InventoryMode, "inventory mode", {
    Loose => "loose",
    Strict => "strict",
});

option_strings!(TaskState, "task state", {
    Executed => "executed",
    Cancelled => "cancelled",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matches_yaml_spelling() {
        assert_eq!("factory_reset".parse::<ResourceState>().unwrap(), ResourceState::FactoryReset);
        assert_eq!("serialNumber".parse::<SearchKey>().unwrap(), SearchKey::SerialNumber);
        assert_eq!(" strict ".parse::<ApplyMode>().unwrap(), ApplyMode::Strict);

        let yaml: SearchKey = serde_yaml::from_str("serialNumber").unwrap();
        assert_eq!(yaml, SearchKey::SerialNumber);
        assert_eq!(SearchKey::SerialNumber.to_string(), "serialNumber");
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let err = "replace".parse::<ContainerMode>().unwrap_err();
        assert!(err.to_string().contains("container mode"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ResourceState::default(), ResourceState::Present);
        assert_eq!(ApplyMode::default(), ApplyMode::Loose);
        assert_eq!(ContainerMode::default(), ContainerMode::Merge);
        assert_eq!(InventoryMode::default(), InventoryMode::Strict);
        assert_eq!(TaskState::default(), TaskState::Executed);
    }
}
