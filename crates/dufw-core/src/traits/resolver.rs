// # Resolver Trait
//
// Defines the interface for looking up the current address of the tracked
// hostname.
//
// ## Implementations
//
// - OS resolver: [`crate::resolver::SystemResolver`]
//
// ## Usage
//
// ```rust,ignore
// use dufw_core::Resolver;
//
// #[tokio::main]
// async fn main() -> dufw_core::Result<()> {
//     let resolver = /* Resolver implementation */;
//     let addr = resolver.resolve_v4("home.example.com").await?;
//     println!("{addr}");
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for hostname resolution
///
/// # Contract
///
/// - Return the first IPv4 address the lookup yields
/// - Fail with [`crate::Error::Resolution`] when the lookup fails or yields
///   no IPv4 address
/// - Do not retry; the reconciler's poll interval is the retry cadence
/// - Hold no state between calls
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `host` to an IPv4 address
    async fn resolve_v4(&self, host: &str) -> Result<Ipv4Addr, crate::Error>;
}
