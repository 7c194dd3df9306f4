//! System DNS resolution primitive using getaddrinfo.
//!
//! This primitive uses the operating system's native DNS resolution via
//! `getaddrinfo`, executed in a thread pool to avoid blocking the async runtime.
//!
//! # When to Use
//!
//! - When you need to respect system DNS configuration (/etc/hosts, nsswitch, etc.)
//! - When DoH/DoT is not required
//! - As a fallback when hickory-dns is not available

use super::{AddressRecord, Family, Name, ResolveFamily, ResolvingFamily};
use crate::base::context::ResolveResultExt;
use crate::base::neterror::{LookupError, ResolverCode};
use std::{collections::HashSet, net::ToSocketAddrs, time::Duration};

/// System DNS resolution primitive using `getaddrinfo` in a thread pool.
///
/// `getaddrinfo` does not report record TTLs, so every answer is stamped
/// with a fixed TTL (60 seconds unless configured otherwise).
///
/// # Performance
///
/// Each resolution spawns a blocking task. For high-throughput scenarios,
/// consider using `HickoryResolver` which is fully async.
#[derive(Clone, Debug)]
pub struct GaiResolver {
    ttl: u32,
}

impl Default for GaiResolver {
    fn default() -> Self {
        Self { ttl: 60 }
    }
}

impl GaiResolver {
    /// Creates a new `GaiResolver`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `GaiResolver` that stamps answers with `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl))
    }
}

impl ResolveFamily for GaiResolver {
    fn resolve_family(&self, name: Name, family: Family) -> ResolvingFamily {
        let ttl = self.ttl;
        Box::pin(async move {
            let host = name.as_str().to_string();
            let domain = host.clone();

            let result = tokio::task::spawn_blocking(move || {
                tracing::debug!(host = %host, family = %family, "resolving via getaddrinfo");
                (host.as_str(), 0u16)
                    .to_socket_addrs()
                    .map(|iter| iter.map(|addr| addr.ip()).collect::<Vec<_>>())
                    .resolve_context(&host)
            })
            .await;

            // Handle task join error (cancellation, panic)
            let addrs = result
                .map_err(|e| {
                    tracing::error!(error = %e, "DNS resolution task failed");
                    LookupError::upstream(ResolverCode::Cancelled, domain.as_str())
                })?
                .inspect_err(|e| {
                    tracing::debug!(domain = %domain, error = %e, "DNS resolution failed");
                })?;

            // getaddrinfo repeats addresses once per socket type.
            let mut seen = HashSet::new();
            let records: Vec<AddressRecord> = addrs
                .into_iter()
                .filter(|ip| Family::of(ip) == family && seen.insert(*ip))
                .map(|ip| AddressRecord::new(ip, ttl))
                .collect();

            tracing::debug!(domain = %domain, count = records.len(), "DNS resolution complete");
            Ok(records)
        })
    }
}
