//! # snapvm-id
//!
//! Typed identifiers for snapvm resources.
//!
//! ## ID Format
//!
//! All IDs use a prefixed format: `{prefix}-{ulid}` with the ULID rendered in
//! lowercase, so every ID is a valid DNS label and can be used directly as a
//! libvirt domain name, an image file stem and an mDNS hostname.
//!
//! Examples:
//! - `guest-01hv4z2wqxkjnm8gpqy6vbkc3d`
//! - `run-01hv4z3mxnkpqr9hstz7wcld4e`

mod macros;
mod types;

pub use types::*;

/// Re-exported for [`GuestId::from_ulid`] and friends.
pub use ulid::Ulid;
