//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors from system resolution into `LookupError` values.

use crate::base::neterror::{LookupError, ResolverCode};
use std::io;

/// Extension trait for adding resolution context to IO Results.
pub trait ResolveResultExt<T> {
    /// Add DNS resolution context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use hostcache::base::context::ResolveResultExt;
    ///
    /// let addrs = ("example.com", 0).to_socket_addrs()
    ///     .resolve_context("example.com")?;
    /// // Error: "getaddrinfo ENOTFOUND example.com"
    /// ```
    fn resolve_context(self, hostname: &str) -> Result<T, LookupError>;
}

impl<T> ResolveResultExt<T> for Result<T, io::Error> {
    fn resolve_context(self, hostname: &str) -> Result<T, LookupError> {
        self.map_err(|e| LookupError::upstream(classify(&e), hostname).with_source(e))
    }
}

/// Resolver code for a failed system lookup.
///
/// The standard library reports `getaddrinfo` failures as an uncategorized
/// error carrying the `gai_strerror` text, so only that text tells a missing
/// name apart from a transport failure.
fn classify(e: &io::Error) -> ResolverCode {
    match e.kind() {
        io::ErrorKind::NotFound => return ResolverCode::NotFound,
        io::ErrorKind::TimedOut => return ResolverCode::Timeout,
        io::ErrorKind::ConnectionRefused => return ResolverCode::ConnRefused,
        _ => {}
    }

    let message = e.to_string().to_ascii_lowercase();
    if message.contains("not known") || message.contains("no such host") {
        // EAI_NONAME (glibc, BSD) / WSAHOST_NOT_FOUND
        ResolverCode::NotFound
    } else if message.contains("no address associated") {
        // EAI_NODATA
        ResolverCode::NoData
    } else if message.contains("temporary failure") || message.contains("try again") {
        // EAI_AGAIN / WSATRY_AGAIN
        ResolverCode::TryAgain
    } else {
        ResolverCode::ServFail
    }
}
