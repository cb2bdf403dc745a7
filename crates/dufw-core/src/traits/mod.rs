//! Core traits for dufw
//!
//! This module defines the abstract interfaces the reconciler drives.
//!
//! - [`Resolver`]: Turn the tracked hostname into an IPv4 address
//! - [`RuleSet`]: List, add and delete allow-rules in the packet filter

pub mod resolver;
pub mod rule_set;

pub use resolver::Resolver;
pub use rule_set::{RuleSet, RuleSnapshot};
