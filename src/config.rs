//! Runtime link configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::*;
use crate::error::Result;
use crate::handshake::HandshakeConfig;

/// Serial settings and retry bounds for one device link.
///
/// Every field has a default, so a JSON file only needs the values it changes:
///
/// ```
/// use si8900_protocol::LinkConfig;
///
/// let config = LinkConfig::from_json(r#"{ "baud_rate": 19200 }"#).unwrap();
/// assert_eq!(config.baud_rate, 19200);
/// assert_eq!(config.echo_retries, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub baud_rate: u32,
    /// Per-byte wait when reading responses
    pub read_timeout_ms: u64,
    pub handshake: HandshakeConfig,
    /// Command transmissions before an echo mismatch is reported
    pub echo_retries: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            baud_rate: BAUD_RATE,
            read_timeout_ms: READ_TIMEOUT_MS,
            handshake: HandshakeConfig::default(),
            echo_retries: ECHO_RETRIES,
        }
    }
}

impl LinkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
