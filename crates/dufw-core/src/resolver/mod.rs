// # System Resolver
//
// Resolves the tracked hostname through the operating system's resolver
// (getaddrinfo via `tokio::net::lookup_host`).
//
// Only IPv4 results are considered; a name with AAAA records only is treated
// as a resolution failure.

use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use tracing::trace;

use crate::traits::Resolver;
use crate::{Error, Result};

/// OS-backed [`Resolver`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    /// Create a new system resolver
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve_v4(&self, host: &str) -> Result<Ipv4Addr> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| Error::resolution(host, e.to_string()))?;

        let mut seen = 0usize;
        for addr in addrs {
            seen += 1;
            if let IpAddr::V4(v4) = addr.ip() {
                trace!("Resolved {} -> {}", host, v4);
                return Ok(v4);
            }
        }

        Err(Error::resolution(
            host,
            format!("no IPv4 address among {} result(s)", seen),
        ))
    }
}
