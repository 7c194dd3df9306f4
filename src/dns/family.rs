//! Single-family resolution through the cache and single-flight layers.

use super::{cache_key, AddressCache, Family, Name, RecordSet, ResolveFamily, ResolvedAddress, SingleFlight};
use crate::base::neterror::LookupError;
use std::sync::Arc;

/// Resolves one address family for a hostname, consulting the cache first.
#[derive(Clone)]
pub struct FamilyResolver {
    resolver: Arc<dyn ResolveFamily>,
    cache: AddressCache,
    flight: SingleFlight,
}

impl FamilyResolver {
    pub fn new(resolver: Arc<dyn ResolveFamily>) -> Self {
        Self {
            resolver,
            cache: AddressCache::new(),
            flight: SingleFlight::new(),
        }
    }

    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    pub fn flight(&self) -> &SingleFlight {
        &self.flight
    }

    /// Resolve `hostname` for `family`.
    ///
    /// With `all`, every record is returned in stored order. Otherwise one
    /// record is picked by round-robin over the cached list.
    pub async fn resolve(
        &self,
        hostname: &str,
        family: Family,
        all: bool,
    ) -> Result<Vec<ResolvedAddress>, LookupError> {
        let records = self.records(hostname, family).await?;

        if all {
            return Ok(records.records().iter().map(ResolvedAddress::from).collect());
        }
        Ok(records
            .next_round_robin()
            .map(ResolvedAddress::from)
            .into_iter()
            .collect())
    }

    async fn records(&self, hostname: &str, family: Family) -> Result<Arc<RecordSet>, LookupError> {
        let key = cache_key(hostname, family);

        if let Some(records) = self.cache.get(&key) {
            tracing::trace!(host = %hostname, family = %family, "cache hit");
            return Ok(records);
        }

        tracing::trace!(host = %hostname, family = %family, "cache miss");
        let resolver = Arc::clone(&self.resolver);
        let name = Name::new(hostname);
        self.flight
            .resolve_once(&key, hostname, &self.cache, move || {
                tracing::debug!(host = %name, family = %family, "resolving");
                resolver.resolve_family(name, family)
            })
            .await
    }
}

impl std::fmt::Debug for FamilyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyResolver")
            .field("cache", &self.cache)
            .field("flight", &self.flight)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::neterror::ResolverCode;
    use crate::dns::{AddressRecord, ResolvingFamily};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
        records: Vec<AddressRecord>,
    }

    impl ResolveFamily for CountingResolver {
        fn resolve_family(&self, name: Name, family: Family) -> ResolvingFamily {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let records: Vec<_> = self
                .records
                .iter()
                .filter(|r| r.family() == family)
                .copied()
                .collect();
            Box::pin(async move {
                if records.is_empty() {
                    return Err(LookupError::upstream(ResolverCode::NoData, name.as_str()));
                }
                Ok(records)
            })
        }
    }

    fn v4(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(203, 0, 113, last))
    }

    fn resolver_with(records: Vec<AddressRecord>) -> (Arc<CountingResolver>, FamilyResolver) {
        let primitive = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
            records,
        });
        let resolver = FamilyResolver::new(primitive.clone());
        (primitive, resolver)
    }

    #[tokio::test]
    async fn test_second_resolve_hits_cache() {
        let (primitive, resolver) = resolver_with(vec![AddressRecord::new(v4(1), 300)]);

        resolver.resolve("cached.test", Family::V4, true).await.unwrap();
        resolver.resolve("cached.test", Family::V4, true).await.unwrap();

        assert_eq!(primitive.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_round_robin_across_lookups() {
        let (_, resolver) = resolver_with(vec![
            AddressRecord::new(v4(1), 300),
            AddressRecord::new(v4(2), 300),
            AddressRecord::new(v4(3), 300),
        ]);

        let mut picked = Vec::new();
        for _ in 0..4 {
            let result = resolver.resolve("rr.test", Family::V4, false).await.unwrap();
            assert_eq!(result.len(), 1);
            picked.push(result[0].address);
        }

        assert_eq!(picked, vec![v4(1), v4(2), v4(3), v4(1)]);
    }

    #[tokio::test]
    async fn test_all_returns_stored_order_without_rotation() {
        let (_, resolver) = resolver_with(vec![
            AddressRecord::new(v4(1), 300),
            AddressRecord::new(v4(2), 300),
        ]);

        for _ in 0..3 {
            let result = resolver.resolve("all.test", Family::V4, true).await.unwrap();
            let addrs: Vec<_> = result.iter().map(|a| a.address).collect();
            assert_eq!(addrs, vec![v4(1), v4(2)]);
            assert!(result.iter().all(|a| a.family == Family::V4));
        }
    }

    #[tokio::test]
    async fn test_missing_family_is_not_found() {
        let (_, resolver) = resolver_with(vec![AddressRecord::new(v4(1), 300)]);

        let err = resolver.resolve("v4only.test", Family::V6, false).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.errno(), Some(&ResolverCode::NoData));
        assert!(resolver.cache().is_empty());
    }
}
