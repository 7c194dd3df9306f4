//! Caching, coalescing hostname lookup.
//!
//! [`CachingLookup`] is the entry point: it applies defaults and
//! getaddrinfo-style hints, then dispatches to single-family or dual-stack
//! resolution backed by the TTL cache and single-flight layers.

use super::{
    dualstack, map_v4_to_v6, Addrs, Family, FamilyResolver, HickoryResolver, Hints,
    InterfaceSource, Name, ResolveFamily, ResolvedAddress, Resolve, Resolving,
    SupportedFamilyCache, SystemInterfaces,
};
use crate::base::neterror::LookupError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// Defaults applied when a lookup leaves family or hints unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupDefaults {
    /// `0`, `null` or absent for unset, otherwise `4` or `6`.
    #[serde(with = "family_number")]
    pub family: Option<Family>,
    pub hints: Hints,
}

impl LookupDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default family.
    pub fn family(mut self, family: Family) -> Self {
        self.family = Some(family);
        self
    }

    /// Set the default hints.
    pub fn hints(mut self, hints: Hints) -> Self {
        self.hints = hints;
        self
    }

    /// Parse defaults from JSON, e.g. `{"family": 6, "hints": 32}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Options for a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupOptions {
    /// `None` uses the default family; if that is unset too, both families.
    #[serde(with = "family_number")]
    pub family: Option<Family>,
    /// `None` uses the default hints.
    pub hints: Option<Hints>,
    /// Return every address instead of one.
    pub all: bool,
}

impl LookupOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a specific family.
    pub fn family(mut self, family: Family) -> Self {
        self.family = Some(family);
        self
    }

    /// Set hints for this lookup.
    pub fn hints(mut self, hints: Hints) -> Self {
        self.hints = Some(hints);
        self
    }

    /// Return all addresses.
    pub fn all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }
}

/// Outcome of [`CachingLookup::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    One(ResolvedAddress),
    All(Vec<ResolvedAddress>),
}

impl LookupResult {
    pub fn first(&self) -> Option<&ResolvedAddress> {
        match self {
            LookupResult::One(addr) => Some(addr),
            LookupResult::All(addrs) => addrs.first(),
        }
    }

    pub fn into_vec(self) -> Vec<ResolvedAddress> {
        match self {
            LookupResult::One(addr) => vec![addr],
            LookupResult::All(addrs) => addrs,
        }
    }
}

/// Hostname lookup with TTL caching, request coalescing, dual-stack merging
/// and round-robin selection.
///
/// Each instance owns its cache, in-flight map, supported-family cache and
/// defaults; separately constructed instances never share state. Clones are
/// handles onto the same state.
///
/// # Example
///
/// ```rust,ignore
/// use hostcache::dns::{CachingLookup, HickoryResolver, LookupOptions};
///
/// let lookup = CachingLookup::new(Arc::new(HickoryResolver::new()));
/// let addr = lookup.lookup_one("example.com").await?;
/// let all = lookup.lookup_all("example.com").await?;
/// ```
#[derive(Clone)]
pub struct CachingLookup {
    resolver: FamilyResolver,
    supported: Arc<SupportedFamilyCache>,
    defaults: Arc<RwLock<LookupDefaults>>,
}

impl CachingLookup {
    /// Creates a lookup backed by `resolver`, using the host's interfaces
    /// for `ADDRCONFIG`.
    pub fn new(resolver: Arc<dyn ResolveFamily>) -> Self {
        Self::with_interfaces(resolver, Arc::new(SystemInterfaces))
    }

    /// Creates a lookup with an explicit interface source.
    pub fn with_interfaces(
        resolver: Arc<dyn ResolveFamily>,
        interfaces: Arc<dyn InterfaceSource>,
    ) -> Self {
        Self {
            resolver: FamilyResolver::new(resolver),
            supported: Arc::new(SupportedFamilyCache::new(interfaces)),
            defaults: Arc::new(RwLock::new(LookupDefaults::default())),
        }
    }

    /// Process-wide instance backed by [`HickoryResolver`].
    pub fn global() -> &'static CachingLookup {
        static GLOBAL: LazyLock<CachingLookup> =
            LazyLock::new(|| CachingLookup::new(Arc::new(HickoryResolver::new())));
        &GLOBAL
    }

    /// Current defaults.
    pub fn defaults(&self) -> LookupDefaults {
        *self.defaults.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the defaults used by subsequent lookups.
    pub fn set_defaults(&self, defaults: LookupDefaults) {
        *self.defaults.write().unwrap_or_else(PoisonError::into_inner) = defaults;
    }

    /// Force the supported-family set to be recomputed on next use.
    pub fn invalidate_supported_families(&self) {
        self.supported.invalidate();
    }

    /// Drop every cached address.
    pub fn clear_cache(&self) {
        self.resolver.cache().clear();
    }

    /// Number of cache entries currently stored.
    pub fn cached_entries(&self) -> usize {
        self.resolver.cache().len()
    }

    /// Number of resolutions currently in flight.
    pub fn pending_resolutions(&self) -> usize {
        self.resolver.flight().pending_count()
    }

    /// Look up `hostname` with `options`.
    pub async fn lookup(
        &self,
        hostname: &str,
        options: &LookupOptions,
    ) -> Result<LookupResult, LookupError> {
        let defaults = self.defaults();
        let mut family = options.family.or(defaults.family);
        let hints = options.hints.unwrap_or(defaults.hints);
        let all = options.all;

        if hostname.is_empty() {
            return Ok(if all {
                LookupResult::All(Vec::new())
            } else {
                LookupResult::One(unspecified(family.unwrap_or(Family::V4)))
            });
        }

        if hints.contains(Hints::ADDRCONFIG) {
            if let Some(only) = self.supported.get().await.only() {
                match family {
                    None => family = Some(only),
                    Some(requested) if requested != only => {
                        tracing::debug!(
                            host = %hostname,
                            requested = %requested,
                            supported = %only,
                            "requested family is not configured on this host"
                        );
                        return Err(LookupError::not_found(hostname));
                    }
                    Some(_) => {}
                }
            }
        }

        let addresses = match family {
            Some(Family::V6) if hints.contains(Hints::V4MAPPED) => {
                let addresses = dualstack::resolve_both(&self.resolver, hostname, all).await?;
                map_v4_to_v6(addresses, hints.contains(Hints::ALL))
            }
            Some(family) => self.resolver.resolve(hostname, family, all).await?,
            None => dualstack::resolve_both(&self.resolver, hostname, all).await?,
        };

        if all {
            return Ok(LookupResult::All(addresses));
        }
        addresses
            .into_iter()
            .next()
            .map(LookupResult::One)
            .ok_or_else(|| LookupError::not_found(hostname))
    }

    /// Look up a single address using the defaults.
    pub async fn lookup_one(&self, hostname: &str) -> Result<ResolvedAddress, LookupError> {
        self.lookup_family(hostname, 0).await
    }

    /// Look up every address using the defaults.
    pub async fn lookup_all(&self, hostname: &str) -> Result<Vec<ResolvedAddress>, LookupError> {
        self.lookup(hostname, &LookupOptions::new().all(true))
            .await
            .map(LookupResult::into_vec)
    }

    /// Look up a single address for a numeric family: `0` (unset), `4` or `6`.
    pub async fn lookup_family(
        &self,
        hostname: &str,
        family: u8,
    ) -> Result<ResolvedAddress, LookupError> {
        let mut options = LookupOptions::new();
        options.family = Family::from_number(family)?;
        self.lookup(hostname, &options)
            .await?
            .into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::not_found(hostname))
    }
}

/// Adapter for consumers of the [`Resolve`] trait: all addresses, port 0.
impl Resolve for CachingLookup {
    fn resolve(&self, name: Name) -> Resolving {
        let lookup = self.clone();
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = lookup
                .lookup_all(name.as_str())
                .await?
                .into_iter()
                .map(|a| SocketAddr::new(a.address, 0))
                .collect();
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

impl std::fmt::Debug for CachingLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingLookup")
            .field("resolver", &self.resolver)
            .field("supported", &self.supported)
            .field("defaults", &self.defaults())
            .finish()
    }
}

/// Numeric family on the wire, `0` meaning unset.
mod family_number {
    use super::Family;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(family: &Option<Family>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(family.map_or(0, Family::as_u8))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Family>, D::Error> {
        let number = Option::<u8>::deserialize(deserializer)?.unwrap_or(0);
        Family::from_number(number).map_err(D::Error::custom)
    }
}

fn unspecified(family: Family) -> ResolvedAddress {
    match family {
        Family::V4 => ResolvedAddress::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), Family::V4),
        Family::V6 => ResolvedAddress::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), Family::V6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{AddressRecord, ResolvingFamily, StaticInterfaces};

    struct FixedResolver;

    impl ResolveFamily for FixedResolver {
        fn resolve_family(&self, _name: Name, family: Family) -> ResolvingFamily {
            let addr = match family {
                Family::V4 => IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                Family::V6 => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            Box::pin(async move { Ok(vec![AddressRecord::new(addr, 30)]) })
        }
    }

    fn lookup() -> CachingLookup {
        CachingLookup::with_interfaces(Arc::new(FixedResolver), Arc::new(StaticInterfaces::default()))
    }

    #[test]
    fn test_lookup_result_accessors() {
        let one = LookupResult::One(unspecified(Family::V6));
        assert_eq!(one.first().map(|a| a.family), Some(Family::V6));
        assert_eq!(one.into_vec().len(), 1);

        let none = LookupResult::All(Vec::new());
        assert!(none.first().is_none());
    }

    #[test]
    fn test_options_deserialize() {
        let options: LookupOptions =
            serde_json::from_str(r#"{"family": 4, "hints": 16, "all": true}"#).unwrap();
        assert_eq!(
            options,
            LookupOptions::new().family(Family::V4).hints(Hints::ALL).all(true)
        );

        let empty: LookupOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, LookupOptions::new());

        let unset: LookupOptions = serde_json::from_str(r#"{"family": 0}"#).unwrap();
        assert_eq!(unset.family, None);
        assert!(serde_json::from_str::<LookupOptions>(r#"{"family": 5}"#).is_err());
    }

    #[test]
    fn test_defaults_serialize_numeric() {
        let json = serde_json::to_string(&LookupDefaults::new().hints(Hints::ADDRCONFIG)).unwrap();
        assert_eq!(json, r#"{"family":0,"hints":32}"#);

        let back = LookupDefaults::from_json(&json).unwrap();
        assert_eq!(back, LookupDefaults::new().hints(Hints::ADDRCONFIG));
    }

    #[test]
    fn test_defaults_round_trip_through_handle() {
        let lookup = lookup();
        assert_eq!(lookup.defaults(), LookupDefaults::default());

        let defaults = LookupDefaults::new()
            .family(Family::V6)
            .hints(Hints::ADDRCONFIG);
        lookup.clone().set_defaults(defaults);
        assert_eq!(lookup.defaults(), defaults);
    }

    #[tokio::test]
    async fn test_resolve_adapter_returns_all_addresses() {
        let lookup = lookup();
        let addrs: Vec<SocketAddr> = lookup.resolve(Name::new("fixed.test")).await.unwrap().collect();

        assert_eq!(
            addrs,
            vec![
                "10.0.0.1:0".parse::<SocketAddr>().unwrap(),
                "[::1]:0".parse::<SocketAddr>().unwrap(),
            ]
        );
        assert_eq!(lookup.cached_entries(), 2);
    }

    #[tokio::test]
    async fn test_empty_interface_list_leaves_family_unset() {
        let lookup = lookup();
        let options = LookupOptions::new().hints(Hints::ADDRCONFIG).all(true);
        let result = lookup.lookup("fixed.test", &options).await.unwrap();
        assert_eq!(result.into_vec().len(), 2);
    }
}
