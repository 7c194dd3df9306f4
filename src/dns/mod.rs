//! DNS Lookup Module
//!
//! A caching, coalescing layer in front of a per-family resolution primitive:
//! - TTL-aware address cache with lazy expiry
//! - Single-flight resolution: one upstream query per in-flight key
//! - Dual-stack resolution with "all" / "first family" merging
//! - Round-robin selection over cached answers
//! - getaddrinfo hint emulation (`ADDRCONFIG`, `V4MAPPED`, `ALL`)
//!
//! # Architecture
//!
//! `ResolveFamily` is the resolution primitive: it performs the network query
//! for one family and reports records with their TTL. `CachingLookup` is the
//! entry point wrapping a primitive; it also implements `Resolve`, so it can
//! be plugged in wherever a plain hostname resolver is expected.
//!
//! # Example
//!
//! ```rust,ignore
//! use hostcache::dns::{CachingLookup, Family, HickoryResolver, Hints, LookupOptions};
//!
//! let lookup = CachingLookup::new(Arc::new(HickoryResolver::new()));
//! let options = LookupOptions::new()
//!     .family(Family::V6)
//!     .hints(Hints::V4MAPPED | Hints::ADDRCONFIG)
//!     .all(true);
//! for addr in lookup.lookup("example.com", &options).await?.into_vec() {
//!     println!("Resolved: {}", addr);
//! }
//! ```

mod cache;
mod dualstack;
mod family;
mod gai;
mod hickory;
mod hints;
mod lookup;
mod resolve;
mod singleflight;
mod supported;

pub use cache::{cache_key, AddressCache, RecordSet};
pub use dualstack::resolve_both;
pub use family::FamilyResolver;
pub use gai::GaiResolver;
pub use hickory::HickoryResolver;
pub use hints::{map_v4_to_v6, Hints};
pub use lookup::{CachingLookup, LookupDefaults, LookupOptions, LookupResult};
pub use resolve::{
    AddressRecord, Addrs, Family, Name, Resolve, ResolveFamily, ResolvedAddress, ResolverWithOverrides,
    Resolving, ResolvingFamily,
};
pub use singleflight::SingleFlight;
pub use supported::{
    InterfaceAddress, InterfaceSource, StaticInterfaces, SupportedFamilies, SupportedFamilyCache,
    SystemInterfaces,
};
