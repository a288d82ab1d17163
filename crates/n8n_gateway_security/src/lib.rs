//! n8n Gateway Security Module
//!
//! Provides:
//! - **Sanitizer**: recursive credential scrubbing for logs and error surfaces
//! - **Rate limiting**: per-identifier fixed-window counters
//! - **Access control**: instance whitelist + role/operation permission matrix
//! - **Clock**: injectable time source so windows are testable

pub mod access;
pub mod clock;
pub mod rate_limit;
pub mod sanitize;

pub use access::{
    AccessError, AccessPolicy, AnonymousPolicy, Identity, InstanceScope, OperationType, Role,
    UserPermissions,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limit::{RateLimitDecision, RateLimitEntry, RateLimiter};
pub use sanitize::{
    looks_like_secret, sanitize, sanitize_args, sanitize_message, MAX_DEPTH, MAX_DEPTH_SENTINEL,
    REDACTED, REDACTED_ARG, REDACTED_STRING,
};
