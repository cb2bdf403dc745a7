// # dufw-core
//
// Core library for keeping a single ufw allow-rule pointed at the current
// address of a dynamic DNS hostname.
//
// ## Architecture Overview
//
// - **Resolver**: Trait for turning the tracked hostname into an IPv4 address
// - **RuleSet**: Trait for listing, adding and deleting allow-rules
// - **Reconciler**: Owns the last applied address and drives the
//   resolve → compare → update-rules cycle
//
// ## Design Principles
//
// 1. **Ports, not globals**: Resolver and rule set are injected, the last
//    applied address lives in the reconciler
// 2. **Fail-safe**: No firewall mutation against unknown or unresolved state
// 3. **Confirm before remember**: The last applied address only moves after
//    the firewall confirms the change
// 4. **Library-First**: The daemon is a thin wrapper around this crate

pub mod traits;
pub mod reconciler;
pub mod resolver;
pub mod rules;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{Resolver, RuleSet, RuleSnapshot};
pub use reconciler::{Reconciler, ReconcileEvent, StepOutcome};
pub use resolver::SystemResolver;
pub use rules::UfwRuleSet;
pub use config::DufwConfig;
pub use error::{Error, Result};
