//! Bridge configuration
//!
//! Only two things are configurable at this layer: which identifiers may be
//! instantiated, and how the server introduces itself to clients.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Bridge configuration
///
/// # Example
/// ```
/// use automation_bridge_core::BridgeConfig;
///
/// let config: BridgeConfig = serde_json::from_str(r#"{"allow_list": ["Calc.App"]}"#).unwrap();
/// assert_eq!(config.allow_list, vec!["Calc.App".to_string()]);
/// assert_eq!(config.server_name, "automation-bridge");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Identifiers allowed for creation; empty allows everything
    pub allow_list: Vec<String>,

    /// Name reported in the protocol handshake
    pub server_name: String,

    /// Version reported in the protocol handshake
    pub server_version: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            allow_list: Vec::new(),
            server_name: "automation-bridge".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn with_allow_list<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = identifiers.into_iter().map(Into::into).collect();
        self
    }
}

/// Gate on creatable identifiers
///
/// Matching is exact: `Calc.App` does not admit `calc.app`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllowList {
    entries: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: identifiers
                .into_iter()
                .map(Into::into)
                .filter(|id: &String| !id.trim().is_empty())
                .collect(),
        }
    }

    /// An empty list allows every identifier
    pub fn is_allowed(&self, identifier: &str) -> bool {
        self.entries.is_empty() || self.entries.contains(identifier)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl From<&BridgeConfig> for AllowList {
    fn from(config: &BridgeConfig) -> Self {
        AllowList::new(config.allow_list.iter().cloned())
    }
}
