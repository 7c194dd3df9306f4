//! Async DNS resolution primitive using hickory-dns.
//!
//! This primitive provides fully async per-family resolution with support for:
//! - DNS-over-HTTPS (DoH)
//! - DNS-over-TLS (DoT)
//! - System DNS configuration auto-detection
//!
//! Each query is a plain A or AAAA lookup; the record TTL handed back is the
//! remaining validity of the answer.

use super::{AddressRecord, Family, Name, ResolveFamily, ResolvingFamily};
use crate::base::neterror::{LookupError, ResolverCode};
use hickory_resolver::{
    config::ResolverConfig, name_server::TokioConnectionProvider, proto::ProtoErrorKind,
    ResolveError, ResolveErrorKind, TokioResolver,
};
use std::{io, net::IpAddr, sync::LazyLock, time::Instant};

/// Async DNS resolution primitive backed by hickory-dns.
///
/// The underlying resolver is lazily initialized on first use and shared
/// across all instances via a static `LazyLock`. It automatically configures
/// itself based on the system's DNS settings.
///
/// # Example
///
/// ```rust,ignore
/// use hostcache::dns::{Family, HickoryResolver, Name, ResolveFamily};
///
/// let resolver = HickoryResolver::new();
/// let records = resolver.resolve_family(Name::new("example.com"), Family::V4).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HickoryResolver {
    resolver: &'static LazyLock<TokioResolver>,
}

impl HickoryResolver {
    /// Creates a new `HickoryResolver`.
    ///
    /// The underlying resolver is lazily initialized on first DNS query.
    /// It will attempt to read system DNS configuration; if that fails,
    /// it falls back to sensible defaults.
    pub fn new() -> Self {
        static RESOLVER: LazyLock<TokioResolver> = LazyLock::new(|| {
            let builder = match TokioResolver::builder_tokio() {
                Ok(builder) => {
                    tracing::debug!("Using system DNS configuration");
                    builder
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Failed to read system DNS config, using defaults"
                    );
                    TokioResolver::builder_with_config(
                        ResolverConfig::default(),
                        TokioConnectionProvider::default(),
                    )
                }
            };

            builder.build()
        });

        Self {
            resolver: &RESOLVER,
        }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Seconds left until `valid_until`, saturating at zero.
fn remaining_ttl(valid_until: Instant) -> u32 {
    let secs = valid_until
        .saturating_duration_since(Instant::now())
        .as_secs();
    u32::try_from(secs).unwrap_or(u32::MAX)
}

fn code_for(e: &ResolveError) -> ResolverCode {
    if e.is_nx_domain() {
        return ResolverCode::NotFound;
    }
    if e.is_no_records_found() {
        return ResolverCode::NoData;
    }
    match e.kind() {
        ResolveErrorKind::Proto(proto) => match proto.kind() {
            ProtoErrorKind::Timeout => ResolverCode::Timeout,
            ProtoErrorKind::Io(err) if err.kind() == io::ErrorKind::TimedOut => ResolverCode::Timeout,
            ProtoErrorKind::Io(_) => ResolverCode::ConnRefused,
            _ => ResolverCode::ServFail,
        },
        _ => ResolverCode::ServFail,
    }
}

fn classify(e: ResolveError, hostname: &str, family: Family) -> LookupError {
    let code = code_for(&e);
    let syscall = match family {
        Family::V4 => "queryA",
        Family::V6 => "queryAaaa",
    };
    LookupError::upstream(code, hostname)
        .with_syscall(syscall)
        .with_source(e)
}

impl ResolveFamily for HickoryResolver {
    fn resolve_family(&self, name: Name, family: Family) -> ResolvingFamily {
        let resolver = self.clone();
        Box::pin(async move {
            let domain = name.as_str();
            tracing::debug!(domain = %domain, family = %family, "resolving via hickory-dns");

            let records: Vec<AddressRecord> = match family {
                Family::V4 => {
                    let lookup = resolver.resolver.ipv4_lookup(domain).await.map_err(|e| {
                        tracing::debug!(domain = %domain, error = %e, "hickory-dns A lookup failed");
                        classify(e, domain, family)
                    })?;
                    let ttl = remaining_ttl(lookup.valid_until());
                    lookup
                        .iter()
                        .map(|a| AddressRecord::new(IpAddr::V4(a.0), ttl))
                        .collect()
                }
                Family::V6 => {
                    let lookup = resolver.resolver.ipv6_lookup(domain).await.map_err(|e| {
                        tracing::debug!(domain = %domain, error = %e, "hickory-dns AAAA lookup failed");
                        classify(e, domain, family)
                    })?;
                    let ttl = remaining_ttl(lookup.valid_until());
                    lookup
                        .iter()
                        .map(|aaaa| AddressRecord::new(IpAddr::V6(aaaa.0), ttl))
                        .collect()
                }
            };

            tracing::debug!(domain = %domain, count = records.len(), "hickory-dns resolution complete");
            Ok(records)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hickory_resolver_known_domain() {
        let resolver = HickoryResolver::new();
        let result = resolver
            .resolve_family(Name::new("localhost"), Family::V4)
            .await;

        // Depends on the host's resolver setup; only check the shape.
        if let Ok(records) = result {
            assert!(records.iter().all(|r| r.family() == Family::V4));
        }
    }

    #[tokio::test]
    #[ignore = "requires external DNS/network access"]
    async fn test_hickory_resolver_invalid_domain() {
        let resolver = HickoryResolver::new();
        let err = resolver
            .resolve_family(
                Name::new("this-domain-definitely-does-not-exist.invalid"),
                Family::V4,
            )
            .await
            .expect_err("Should have error");

        assert_eq!(
            err.hostname(),
            Some("this-domain-definitely-does-not-exist.invalid")
        );
        assert!(err.normalize().is_not_found());
    }

    #[test]
    fn test_hickory_resolver_is_clone() {
        let r1 = HickoryResolver::new();
        let r2 = r1.clone();
        // Both should point to the same static resolver
        assert!(std::ptr::eq(r1.resolver, r2.resolver));
    }

    #[test]
    fn test_transport_errors_keep_their_code() {
        use hickory_resolver::proto::ProtoError;

        let timeout = ResolveError::from(ProtoError::from(ProtoErrorKind::Timeout));
        let err = classify(timeout, "slow.example", Family::V4);
        assert_eq!(err.code(), "ETIMEOUT");
        assert_eq!(err.syscall(), Some("queryA"));
        assert!(!err.normalize().is_not_found());

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let err = classify(
            ResolveError::from(ProtoError::from(refused)),
            "down.example",
            Family::V6,
        );
        assert_eq!(err.code(), "ECONNREFUSED");
        assert_eq!(err.syscall(), Some("queryAaaa"));

        let other = ResolveError::from("malformed response");
        assert_eq!(code_for(&other), ResolverCode::ServFail);
    }

    #[test]
    fn test_remaining_ttl_saturates() {
        let past = Instant::now() - std::time::Duration::from_secs(5);
        assert_eq!(remaining_ttl(past), 0);

        let future = Instant::now() + std::time::Duration::from_secs(120);
        let ttl = remaining_ttl(future);
        assert!((119..=120).contains(&ttl));
    }
}
