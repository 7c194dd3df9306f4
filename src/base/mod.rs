//! Base types and error handling.
//!
//! Provides foundational types shared by the lookup engine:
//! - [`LookupError`](neterror::LookupError): the error shape surfaced to callers
//! - [`ResolverCode`](neterror::ResolverCode): status codes reported by resolvers

pub mod context;
pub mod neterror;
