//! Packet-filter backends
//!
//! - [`UfwRuleSet`]: shells out to `ufw`

pub mod ufw;

pub use ufw::UfwRuleSet;
