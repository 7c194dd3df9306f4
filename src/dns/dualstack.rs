//! Dual-stack resolution: IPv4 and IPv6 queried concurrently and merged.

use super::{Family, FamilyResolver, ResolvedAddress};
use crate::base::neterror::LookupError;

/// Resolve both families of `hostname` and combine them.
///
/// Each family that comes back not-found counts as empty. With `all`, the
/// result is the IPv4 answers followed by the IPv6 answers; otherwise the
/// IPv4 answers win when present. Any other error aborts the combination.
pub async fn resolve_both(
    resolver: &FamilyResolver,
    hostname: &str,
    all: bool,
) -> Result<Vec<ResolvedAddress>, LookupError> {
    let (v4, v6) = tokio::try_join!(
        resolve_or_empty(resolver, hostname, Family::V4, all),
        resolve_or_empty(resolver, hostname, Family::V6, all),
    )?;

    let combined = combine(v4, v6, all);
    if combined.is_empty() {
        return Err(LookupError::not_found(hostname));
    }
    Ok(combined)
}

async fn resolve_or_empty(
    resolver: &FamilyResolver,
    hostname: &str,
    family: Family,
    all: bool,
) -> Result<Vec<ResolvedAddress>, LookupError> {
    match resolver.resolve(hostname, family, all).await {
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        other => other,
    }
}

fn combine(
    mut v4: Vec<ResolvedAddress>,
    v6: Vec<ResolvedAddress>,
    all: bool,
) -> Vec<ResolvedAddress> {
    if all {
        v4.extend(v6);
        v4
    } else if !v4.is_empty() {
        v4
    } else {
        v6
    }
}
