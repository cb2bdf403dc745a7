//! Error types for dufw
//!
//! Every step error is recoverable: the reconciler logs it and the next
//! poll retries. Only [`Error::ToolUnavailable`] is meant to stop startup.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Result type alias for dufw operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dufw
#[derive(Error, Debug)]
pub enum Error {
    /// Hostname lookup failed or yielded no IPv4 address
    #[error("Failed to resolve {host}: {message}")]
    Resolution {
        /// Hostname that was looked up
        host: String,
        /// Error message
        message: String,
    },

    /// Rule listing failed or produced unreadable output
    #[error("Rule query failed: {0}")]
    RuleQuery(String),

    /// Adding an allow-rule failed
    #[error("Failed to add allow rule for {addr}: {message}")]
    RuleAdd {
        /// Address the rule was for
        addr: Ipv4Addr,
        /// Error message
        message: String,
    },

    /// Deleting an allow-rule failed
    #[error("Failed to delete allow rule for {addr}: {message}")]
    RuleDelete {
        /// Address the rule was for
        addr: Ipv4Addr,
        /// Error message
        message: String,
    },

    /// The packet-filter tool is missing or not runnable
    #[error("Packet-filter tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

}

impl Error {
    /// Create a resolution error
    pub fn resolution(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a rule query error
    pub fn rule_query(msg: impl Into<String>) -> Self {
        Self::RuleQuery(msg.into())
    }

    /// Create a rule add error
    pub fn rule_add(addr: Ipv4Addr, message: impl Into<String>) -> Self {
        Self::RuleAdd {
            addr,
            message: message.into(),
        }
    }

    /// Create a rule delete error
    pub fn rule_delete(addr: Ipv4Addr, message: impl Into<String>) -> Self {
        Self::RuleDelete {
            addr,
            message: message.into(),
        }
    }

    /// Create a tool-unavailable error
    pub fn tool_unavailable(msg: impl Into<String>) -> Self {
        Self::ToolUnavailable(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short machine-friendly name of the failing stage, used in events
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Resolution { .. } => "resolve",
            Error::RuleQuery(_) => "query",
            Error::RuleAdd { .. } => "add",
            Error::RuleDelete { .. } => "delete",
            Error::ToolUnavailable(_) => "startup",
            Error::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_address() {
        let err = Error::rule_delete(Ipv4Addr::new(1, 2, 3, 4), "exit status: 1");
        assert_eq!(
            err.to_string(),
            "Failed to delete allow rule for 1.2.3.4: exit status: 1"
        );
        assert_eq!(err.stage(), "delete");
    }

    #[test]
    fn test_error_stage() {
        assert_eq!(Error::resolution("example.com", "nxdomain").stage(), "resolve");
        assert_eq!(Error::rule_query("boom").stage(), "query");
        assert_eq!(Error::rule_add(Ipv4Addr::LOCALHOST, "boom").stage(), "add");
    }
}
