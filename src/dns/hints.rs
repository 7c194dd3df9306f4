//! getaddrinfo hint flags and IPv4-mapped IPv6 translation.

use super::{Family, ResolvedAddress};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of getaddrinfo-style hints.
///
/// Values follow glibc's `AI_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hints(u32);

impl Hints {
    /// No hints.
    pub const NONE: Hints = Hints(0);
    /// With an IPv6 request, also return IPv4 answers as IPv4-mapped IPv6.
    pub const V4MAPPED: Hints = Hints(0x08);
    /// With `V4MAPPED`, keep native IPv4 answers next to their mapped form.
    pub const ALL: Hints = Hints(0x10);
    /// Restrict to address families configured on a non-loopback interface.
    pub const ADDRCONFIG: Hints = Hints(0x20);

    const KNOWN: u32 = Self::V4MAPPED.0 | Self::ALL.0 | Self::ADDRCONFIG.0;

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Keep only the bits this crate understands.
    pub const fn from_bits_truncate(bits: u32) -> Hints {
        Hints(bits & Self::KNOWN)
    }

    pub const fn contains(self, other: Hints) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Hints {
    type Output = Hints;

    fn bitor(self, rhs: Hints) -> Hints {
        Hints(self.0 | rhs.0)
    }
}

impl BitOrAssign for Hints {
    fn bitor_assign(&mut self, rhs: Hints) {
        self.0 |= rhs.0;
    }
}

/// Translate IPv4 answers into their IPv4-mapped IPv6 form (`::ffff:a.b.c.d`).
///
/// IPv6 answers pass through. With `keep_ipv4`, each IPv4 answer is kept and
/// followed by its mapped form; otherwise it is replaced by it.
pub fn map_v4_to_v6(addresses: Vec<ResolvedAddress>, keep_ipv4: bool) -> Vec<ResolvedAddress> {
    let mut mapped = Vec::with_capacity(addresses.len() * if keep_ipv4 { 2 } else { 1 });
    for addr in addresses {
        match addr.address {
            IpAddr::V6(_) => mapped.push(addr),
            IpAddr::V4(v4) => {
                if keep_ipv4 {
                    mapped.push(addr);
                }
                mapped.push(ResolvedAddress::new(
                    IpAddr::V6(v4.to_ipv6_mapped()),
                    Family::V6,
                ));
            }
        }
    }
    mapped
}
