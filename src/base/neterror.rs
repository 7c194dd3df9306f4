use std::{borrow::Cow, error::Error as StdError, fmt, sync::Arc};
use thiserror::Error;

/// Code carried by every not-found error, synthesized or translated.
pub const NOT_FOUND_CODE: &str = "ENOTFOUND";

/// Syscall label used for synthesized not-found errors.
pub const GETADDRINFO: &str = "getaddrinfo";

/// Status codes reported by a resolution primitive.
///
/// Mirrors the c-ares style codes surfaced by most stub resolvers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolverCode {
    /// The name exists but has no records of the requested type.
    NoData,
    /// The name does not exist.
    NotFound,
    /// The upstream server failed to complete the query.
    ServFail,
    /// The upstream server refused the query.
    Refused,
    /// The query timed out.
    Timeout,
    /// Temporary failure; the same query may succeed later.
    TryAgain,
    /// Could not contact the upstream server.
    ConnRefused,
    /// The resolution task went away before producing an answer.
    Cancelled,
    /// Any other resolver-specific code.
    Other(String),
}

impl ResolverCode {
    pub fn as_str(&self) -> &str {
        match self {
            ResolverCode::NoData => "ENODATA",
            ResolverCode::NotFound => "ENOTFOUND",
            ResolverCode::ServFail => "ESERVFAIL",
            ResolverCode::Refused => "EREFUSED",
            ResolverCode::Timeout => "ETIMEOUT",
            ResolverCode::TryAgain => "EAI_AGAIN",
            ResolverCode::ConnRefused => "ECONNREFUSED",
            ResolverCode::Cancelled => "ECANCELLED",
            ResolverCode::Other(code) => code,
        }
    }

    /// Whether this code belongs to the "no data / no such name" class.
    pub fn is_no_data(&self) -> bool {
        matches!(self, ResolverCode::NoData | ResolverCode::NotFound)
    }
}

impl From<&str> for ResolverCode {
    fn from(code: &str) -> Self {
        match code {
            "ENODATA" => ResolverCode::NoData,
            "ENOTFOUND" => ResolverCode::NotFound,
            "ESERVFAIL" => ResolverCode::ServFail,
            "EREFUSED" => ResolverCode::Refused,
            "ETIMEOUT" => ResolverCode::Timeout,
            "EAI_AGAIN" => ResolverCode::TryAgain,
            "ECONNREFUSED" => ResolverCode::ConnRefused,
            "ECANCELLED" => ResolverCode::Cancelled,
            other => ResolverCode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ResolverCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, clonable error source.
pub type ErrorSource = Arc<dyn StdError + Send + Sync>;

/// Errors surfaced by a lookup.
///
/// The type is `Clone` so a single resolution outcome can be handed to every
/// caller waiting on the same in-flight query.
#[derive(Debug, Error, Clone)]
pub enum LookupError {
    /// No usable record for the hostname/family combination.
    #[error("{syscall} ENOTFOUND{}", host_suffix(.hostname))]
    NotFound {
        /// Underlying resolver code, when translated from one.
        errno: Option<ResolverCode>,
        syscall: Cow<'static, str>,
        hostname: Option<String>,
    },

    /// The requested address family is neither unset, 4 nor 6.
    #[error("The argument 'family' must be one of: 0, 4, 6. Received {0}")]
    InvalidFamily(u8),

    /// Any other failure reported by the resolution primitive.
    #[error("{syscall} {code}{}", host_suffix(.hostname))]
    Upstream {
        code: ResolverCode,
        syscall: Cow<'static, str>,
        hostname: Option<String>,
        #[source]
        source: Option<ErrorSource>,
    },
}

fn host_suffix(hostname: &Option<String>) -> String {
    match hostname {
        Some(host) => format!(" {host}"),
        None => String::new(),
    }
}

impl LookupError {
    /// A synthesized not-found error for `hostname`.
    pub fn not_found(hostname: impl Into<String>) -> Self {
        LookupError::NotFound {
            errno: None,
            syscall: Cow::Borrowed(GETADDRINFO),
            hostname: Some(hostname.into()),
        }
    }

    /// An upstream failure with no underlying source.
    pub fn upstream(code: ResolverCode, hostname: impl Into<String>) -> Self {
        LookupError::Upstream {
            code,
            syscall: Cow::Borrowed(GETADDRINFO),
            hostname: Some(hostname.into()),
            source: None,
        }
    }

    /// Attach the error that caused an upstream failure.
    pub fn with_source(self, err: impl StdError + Send + Sync + 'static) -> Self {
        match self {
            LookupError::Upstream {
                code,
                syscall,
                hostname,
                ..
            } => LookupError::Upstream {
                code,
                syscall,
                hostname,
                source: Some(Arc::new(err)),
            },
            other => other,
        }
    }

    /// Override the syscall label.
    pub fn with_syscall(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        match &mut self {
            LookupError::NotFound { syscall, .. } | LookupError::Upstream { syscall, .. } => {
                *syscall = label.into();
            }
            LookupError::InvalidFamily(_) => {}
        }
        self
    }

    /// The error code string: `ENOTFOUND`, `EINVAL` or the upstream code.
    pub fn code(&self) -> &str {
        match self {
            LookupError::NotFound { .. } => NOT_FOUND_CODE,
            LookupError::InvalidFamily(_) => "EINVAL",
            LookupError::Upstream { code, .. } => code.as_str(),
        }
    }

    pub fn errno(&self) -> Option<&ResolverCode> {
        match self {
            LookupError::NotFound { errno, .. } => errno.as_ref(),
            LookupError::Upstream { code, .. } => Some(code),
            LookupError::InvalidFamily(_) => None,
        }
    }

    pub fn syscall(&self) -> Option<&str> {
        match self {
            LookupError::NotFound { syscall, .. } | LookupError::Upstream { syscall, .. } => {
                Some(syscall.as_ref())
            }
            LookupError::InvalidFamily(_) => None,
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        match self {
            LookupError::NotFound { hostname, .. } | LookupError::Upstream { hostname, .. } => {
                hostname.as_deref()
            }
            LookupError::InvalidFamily(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }

    /// Rewrite "no data" / "no such name" upstream failures into `NotFound`,
    /// keeping the original code as errno and the original syscall label.
    /// Everything else is returned unchanged.
    pub fn normalize(self) -> Self {
        match self {
            LookupError::Upstream {
                code,
                syscall,
                hostname,
                ..
            } if code.is_no_data() => LookupError::NotFound {
                errno: Some(code),
                syscall,
                hostname,
            },
            other => other,
        }
    }
}
