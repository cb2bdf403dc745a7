// # Rule Set Trait
//
// Defines the narrow port between the reconciler and the packet-filter tool.
//
// ## Implementations
//
// - ufw: [`crate::rules::UfwRuleSet`]
//
// Three operations only: list, add, delete. Everything the reconciler knows
// about installed rules comes from a [`RuleSnapshot`].

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Textual capture of the packet filter's numbered rule list
///
/// Lives for a single reconciliation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSnapshot {
    text: String,
}

impl RuleSnapshot {
    /// Wrap the raw status output
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Whether the dotted-quad form of `addr` appears anywhere in the output
    ///
    /// This is a plain substring search: `1.2.3.4` also matches inside
    /// `11.2.3.45`. The ufw status format gives nothing sturdier to key on.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.text.contains(&addr.to_string())
    }

    /// Whether the tool reports itself as inactive (rules not enforced)
    pub fn is_inactive(&self) -> bool {
        self.text
            .lines()
            .any(|line| line.trim().eq_ignore_ascii_case("status: inactive"))
    }

    /// Raw status output
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Trait for packet-filter rule management
///
/// # Contract
///
/// - Every call is a single invocation of the tool; no retries
/// - A call returns only after the tool has exited
/// - Success means the tool exited with status 0
#[async_trait]
pub trait RuleSet: Send + Sync {
    /// Capture the current numbered rule list
    ///
    /// Fails with [`crate::Error::RuleQuery`].
    async fn list(&self) -> Result<RuleSnapshot, crate::Error>;

    /// Install an allow-rule for traffic from `addr`
    ///
    /// Fails with [`crate::Error::RuleAdd`].
    async fn allow_from(&self, addr: Ipv4Addr) -> Result<(), crate::Error>;

    /// Remove the allow-rule for traffic from `addr`
    ///
    /// Fails with [`crate::Error::RuleDelete`].
    async fn delete_allow_from(&self, addr: Ipv4Addr) -> Result<(), crate::Error>;

    /// Name of the backing tool, for logs
    fn tool_name(&self) -> &'static str;
}
