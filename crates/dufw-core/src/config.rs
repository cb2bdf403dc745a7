//! Configuration types for dufw
//!
//! This module defines the configuration consumed by the reconciler and the
//! ufw adapter. The daemon fills it from environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main dufw configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DufwConfig {
    /// DNS name whose address should be allowed through the firewall
    pub domain: String,

    /// Seconds between reconciliation steps
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Command used to invoke ufw, program first (e.g. `["sudo", "ufw"]`)
    #[serde(default = "default_ufw_command")]
    pub ufw_command: Vec<String>,

    /// Capacity of the reconciler event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl DufwConfig {
    /// Create a configuration for `domain` with default settings
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            interval_secs: default_interval_secs(),
            ufw_command: default_ufw_command(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Set the poll interval in seconds
    pub fn with_interval_secs(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    /// Set the ufw command line
    pub fn with_ufw_command(mut self, command: Vec<String>) -> Self {
        self.ufw_command = command;
        self
    }

    /// Poll interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("Domain cannot be empty"));
        }

        if self.interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }

        if self.ufw_command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(crate::Error::config("ufw command cannot be empty"));
        }

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

fn default_interval_secs() -> u64 {
    300
}

fn default_ufw_command() -> Vec<String> {
    vec!["ufw".to_string()]
}

fn default_event_channel_capacity() -> usize {
    100
}
