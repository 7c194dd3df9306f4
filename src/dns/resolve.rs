//! Core DNS resolution types and traits.
//!
//! This module defines the resolution primitive consumed by the lookup
//! engine (`ResolveFamily`), the integration trait it exposes (`Resolve`),
//! and the record types flowing between them.

use crate::base::neterror::LookupError;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    collections::HashMap,
    fmt,
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    sync::Arc,
};

/// A domain name to resolve into IP addresses.
///
/// This is a lightweight wrapper around a hostname string that provides
/// a type-safe way to pass domain names to resolvers.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new [`Name`] from any string-like type.
    #[inline]
    pub fn new(host: impl Into<Box<str>>) -> Self {
        Self { host: host.into() }
    }

    /// View the hostname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// IP address family.
///
/// Serialized as the numeric family (`4` or `6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Numeric family, as used in lookup options and cache keys.
    pub fn as_u8(self) -> u8 {
        match self {
            Family::V4 => 4,
            Family::V6 => 6,
        }
    }

    /// Parse a numeric family where `0` means "unset".
    pub fn from_number(family: u8) -> Result<Option<Family>, LookupError> {
        match family {
            0 => Ok(None),
            other => Family::try_from(other).map(Some),
        }
    }

    /// Family of an address.
    pub fn of(addr: &IpAddr) -> Family {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

impl TryFrom<u8> for Family {
    type Error = LookupError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Family::V4),
            6 => Ok(Family::V6),
            other => Err(LookupError::InvalidFamily(other)),
        }
    }
}

impl From<Family> for u8 {
    fn from(family: Family) -> u8 {
        family.as_u8()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A single address returned by a resolution primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRecord {
    pub address: IpAddr,
    /// Seconds the record stays valid.
    pub ttl: u32,
}

impl AddressRecord {
    pub fn new(address: IpAddr, ttl: u32) -> Self {
        Self { address, ttl }
    }

    pub fn family(&self) -> Family {
        Family::of(&self.address)
    }
}

/// An address handed back to lookup callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub address: IpAddr,
    pub family: Family,
}

impl ResolvedAddress {
    pub fn new(address: IpAddr, family: Family) -> Self {
        Self { address, family }
    }
}

impl From<&AddressRecord> for ResolvedAddress {
    fn from(record: &AddressRecord) -> Self {
        Self {
            address: record.address,
            family: record.family(),
        }
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.address, f)
    }
}

/// Alias for the `Future` returned by a single-family resolution primitive.
pub type ResolvingFamily =
    Pin<Box<dyn Future<Output = Result<Vec<AddressRecord>, LookupError>> + Send>>;

/// Resolution primitive: performs the actual network query for one family.
///
/// Implementations report "no data" / "no such name" conditions as
/// `LookupError::Upstream` with a [`ResolverCode`](crate::base::neterror::ResolverCode)
/// in the no-data class, and every other failure with its own code.
/// An empty `Ok` list is allowed and is treated as not-found by the caller.
pub trait ResolveFamily: Send + Sync {
    /// Resolves `name` to the records of `family`, in server order.
    fn resolve_family(&self, name: Name, family: Family) -> ResolvingFamily;
}

/// Blanket implementation for Arc-wrapped primitives.
impl<R: ResolveFamily + ?Sized> ResolveFamily for Arc<R> {
    fn resolve_family(&self, name: Name, family: Family) -> ResolvingFamily {
        (**self).resolve_family(name, family)
    }
}

/// Alias for an `Iterator` trait object over `SocketAddr`.
pub type Addrs = Box<dyn Iterator<Item = SocketAddr> + Send>;

/// Alias for the `Future` type returned by a [`Resolve`] implementation.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Addrs, LookupError>> + Send>>;

/// Hostname-to-address integration point.
///
/// This is the shape connectors consume: all usable addresses for a name,
/// with port 0; callers set the port for the target service.
pub trait Resolve: Send + Sync {
    fn resolve(&self, name: Name) -> Resolving;
}

impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, name: Name) -> Resolving {
        (**self).resolve(name)
    }
}

/// Resolution primitive wrapper that supports hostname overrides.
///
/// This primitive first checks a map of hostname-to-address overrides before
/// falling back to the underlying primitive. Useful for:
/// - Testing without real DNS
/// - Forcing specific IPs for certain domains
/// - Local development with custom hostnames
///
/// Overridden names still go through the lookup cache; each override is
/// split by family when answering a query.
///
/// # Example
///
/// ```rust,ignore
/// use hostcache::dns::{AddressRecord, HickoryResolver, ResolverWithOverrides};
/// use std::collections::HashMap;
///
/// let mut overrides = HashMap::new();
/// overrides.insert(
///     "api.local".into(),
///     vec![AddressRecord::new("127.0.0.1".parse().unwrap(), 3600)],
/// );
///
/// let resolver = ResolverWithOverrides::new(Arc::new(HickoryResolver::new()), overrides);
/// ```
pub struct ResolverWithOverrides {
    inner: Arc<dyn ResolveFamily>,
    overrides: Arc<HashMap<Cow<'static, str>, Vec<AddressRecord>>>,
}

impl ResolverWithOverrides {
    /// Creates a new primitive with the given overrides.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fallback primitive for non-overridden hostnames.
    /// * `overrides` - Map of hostnames to their records.
    pub fn new(
        inner: Arc<dyn ResolveFamily>,
        overrides: HashMap<Cow<'static, str>, Vec<AddressRecord>>,
    ) -> Self {
        Self {
            inner,
            overrides: Arc::new(overrides),
        }
    }

    /// Returns the number of configured overrides.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl ResolveFamily for ResolverWithOverrides {
    fn resolve_family(&self, name: Name, family: Family) -> ResolvingFamily {
        if let Some(records) = self.overrides.get(name.as_str()) {
            let records: Vec<AddressRecord> = records
                .iter()
                .filter(|r| r.family() == family)
                .copied()
                .collect();
            return Box::pin(std::future::ready(Ok(records)));
        }
        self.inner.resolve_family(name, family)
    }
}

impl fmt::Debug for ResolverWithOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverWithOverrides")
            .field("override_count", &self.overrides.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_name_from_str() {
        let name = Name::from("example.com");
        assert_eq!(name.as_str(), "example.com");
        assert_eq!(name.to_string(), "example.com");
    }

    #[test]
    fn test_name_equality() {
        let name1 = Name::new("example.com");
        let name2 = Name::new("example.com");
        let name3 = Name::new("other.com");

        assert_eq!(name1, name2);
        assert_ne!(name1, name3);
    }

    #[test]
    fn test_family_numbers() {
        assert_eq!(Family::from_number(0).unwrap(), None);
        assert_eq!(Family::from_number(4).unwrap(), Some(Family::V4));
        assert_eq!(Family::from_number(6).unwrap(), Some(Family::V6));
        assert!(matches!(
            Family::from_number(5),
            Err(LookupError::InvalidFamily(5))
        ));
        assert_eq!(Family::V6.to_string(), "6");
    }

    #[test]
    fn test_family_serde() {
        let family: Family = serde_json::from_str("6").unwrap();
        assert_eq!(family, Family::V6);
        assert_eq!(serde_json::to_string(&Family::V4).unwrap(), "4");
        assert!(serde_json::from_str::<Family>("7").is_err());
    }

    #[test]
    fn test_record_family() {
        let v4 = AddressRecord::new(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), 60);
        let v6 = AddressRecord::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 60);
        assert_eq!(v4.family(), Family::V4);
        assert_eq!(v6.family(), Family::V6);
        assert_eq!(ResolvedAddress::from(&v6).family, Family::V6);
    }

    struct MockResolver {
        response: Vec<AddressRecord>,
    }

    impl ResolveFamily for MockResolver {
        fn resolve_family(&self, _name: Name, family: Family) -> ResolvingFamily {
            let records: Vec<_> = self
                .response
                .iter()
                .filter(|r| r.family() == family)
                .copied()
                .collect();
            Box::pin(async move { Ok(records) })
        }
    }

    #[tokio::test]
    async fn test_override_resolver_hit() {
        let mock = Arc::new(MockResolver {
            response: vec![AddressRecord::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 60)],
        });

        let mut overrides = HashMap::new();
        overrides.insert(
            Cow::Borrowed("override.local"),
            vec![
                AddressRecord::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3600),
                AddressRecord::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 3600),
            ],
        );

        let resolver = ResolverWithOverrides::new(mock, overrides);
        let v4 = resolver
            .resolve_family(Name::new("override.local"), Family::V4)
            .await
            .unwrap();
        let v6 = resolver
            .resolve_family(Name::new("override.local"), Family::V6)
            .await
            .unwrap();

        assert_eq!(v4, vec![AddressRecord::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3600)]);
        assert_eq!(v6, vec![AddressRecord::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 3600)]);
    }

    #[tokio::test]
    async fn test_override_resolver_miss() {
        let mock = Arc::new(MockResolver {
            response: vec![AddressRecord::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 60)],
        });

        let resolver = ResolverWithOverrides::new(mock, HashMap::new());
        assert_eq!(resolver.override_count(), 0);

        let records = resolver
            .resolve_family(Name::new("not-overridden.com"), Family::V4)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
    }
}
