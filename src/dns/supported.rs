//! Which address families the host can actually use.
//!
//! Computed lazily from the non-loopback interface addresses and cached
//! until explicitly invalidated.

use super::Family;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Families usable on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedFamilies {
    /// Both families, or no usable interface at all: no restriction applies.
    Unrestricted,
    OnlyV4,
    OnlyV6,
}

impl SupportedFamilies {
    /// The single supported family, if restricted.
    pub fn only(self) -> Option<Family> {
        match self {
            SupportedFamilies::Unrestricted => None,
            SupportedFamilies::OnlyV4 => Some(Family::V4),
            SupportedFamilies::OnlyV6 => Some(Family::V6),
        }
    }

    fn from_families(families: &HashSet<Family>) -> Self {
        match (families.contains(&Family::V4), families.contains(&Family::V6)) {
            (true, false) => SupportedFamilies::OnlyV4,
            (false, true) => SupportedFamilies::OnlyV6,
            _ => SupportedFamilies::Unrestricted,
        }
    }
}

/// One address assigned to a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub family: Family,
    /// Loopback / internal interface.
    pub internal: bool,
}

/// Source of interface addresses.
pub trait InterfaceSource: Send + Sync {
    fn interface_addresses(&self) -> Vec<InterfaceAddress>;
}

/// Enumerates the host's interfaces via `netdev`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interface_addresses(&self) -> Vec<InterfaceAddress> {
        netdev::get_interfaces()
            .into_iter()
            .flat_map(|iface| {
                let internal = iface.is_loopback();
                let v4 = iface.ipv4.iter().map(move |_| InterfaceAddress {
                    family: Family::V4,
                    internal,
                });
                let v6 = iface.ipv6.iter().map(move |_| InterfaceAddress {
                    family: Family::V6,
                    internal,
                });
                v4.chain(v6).collect::<Vec<_>>()
            })
            .collect()
    }
}

/// A fixed interface list.
#[derive(Debug, Clone, Default)]
pub struct StaticInterfaces(pub Vec<InterfaceAddress>);

impl InterfaceSource for StaticInterfaces {
    fn interface_addresses(&self) -> Vec<InterfaceAddress> {
        self.0.clone()
    }
}

/// Lazily computed, invalidatable [`SupportedFamilies`].
pub struct SupportedFamilyCache {
    source: Arc<dyn InterfaceSource>,
    cached: RwLock<Option<SupportedFamilies>>,
}

impl SupportedFamilyCache {
    pub fn new(source: Arc<dyn InterfaceSource>) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// The cached value, computing it on first use.
    ///
    /// Interface enumeration is a blocking system call, so it runs on the
    /// blocking pool. Concurrent first computations may both run; the result
    /// is deterministic so the last write wins harmlessly.
    pub async fn get(&self) -> SupportedFamilies {
        let cached = *self.cached.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(supported) = cached {
            return supported;
        }

        let source = Arc::clone(&self.source);
        let supported = match tokio::task::spawn_blocking(move || compute(source.as_ref())).await {
            Ok(supported) => supported,
            Err(e) => {
                // Not cached: the next lookup tries again.
                tracing::warn!(error = %e, "interface enumeration failed");
                return SupportedFamilies::Unrestricted;
            }
        };
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(supported);
        supported
    }

    /// Forget the cached value; the next `get` enumerates interfaces again.
    pub fn invalidate(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn compute(source: &dyn InterfaceSource) -> SupportedFamilies {
    let families: HashSet<Family> = source
        .interface_addresses()
        .into_iter()
        .filter(|addr| !addr.internal)
        .map(|addr| addr.family)
        .collect();
    let supported = SupportedFamilies::from_families(&families);
    tracing::debug!(supported = ?supported, "computed supported address families");
    supported
}

impl std::fmt::Debug for SupportedFamilyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportedFamilyCache")
            .field("cached", &*self.cached.read().unwrap_or_else(PoisonError::into_inner))
            .finish_non_exhaustive()
    }
}
