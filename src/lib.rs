//! # hostcache
//!
//! A transparent caching and coalescing layer for hostname lookups.
//!
//! `hostcache` sits in front of a name-resolution primitive and serves
//! repeated lookups from memory while honoring record TTLs. Concurrent
//! lookups of the same hostname and family share a single upstream query.
//!
//! ## Features
//!
//! - **TTL Cache**: entries expire at the smallest record TTL, evicted on read
//! - **Single-Flight**: one upstream query per in-flight (hostname, family)
//! - **Dual-Stack**: IPv4 and IPv6 resolved concurrently and merged
//! - **Round-Robin**: repeated single-address lookups rotate through answers
//! - **getaddrinfo Hints**: `ADDRCONFIG`, `V4MAPPED` and `ALL` emulation
//! - **Pluggable Resolvers**: hickory-dns (default) or system `getaddrinfo`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hostcache::dns::CachingLookup;
//!
//! #[tokio::main]
//! async fn main() {
//!     let addr = CachingLookup::global()
//!         .lookup_one("example.com")
//!         .await
//!         .unwrap();
//!     println!("{} (IPv{})", addr.address, addr.family);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions and context helpers
//! - [`dns`] - Lookup engine, cache, and resolution primitives

pub mod base;
pub mod dns;

pub use base::neterror::{LookupError, ResolverCode};
