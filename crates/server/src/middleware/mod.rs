//! HTTP middleware and extractors.
//!
//! Authentication itself is owned by an upstream gateway; by the time a
//! request reaches this service, the gateway has verified the session and
//! injected the user's identity as a header. The extractor here only reads
//! that header.

pub mod identity;

pub use identity::{AuthenticatedUser, USER_ID_HEADER};
