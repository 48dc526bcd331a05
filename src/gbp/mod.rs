//! Google Business Profile API access.
//!
//! [`GbpClient`] is the uniform call surface over the account management,
//! business information, v4 (reviews and local posts), performance,
//! notifications and verifications APIs. A client carries exactly one
//! [`Credential`]; which credential to use is decided by
//! [`crate::auth::Negotiator`].

pub mod client;
pub mod endpoints;
pub mod error;
pub mod request;

pub use client::{AuthMode, Credential, DEFAULT_LOCATION_READ_MASK, GbpClient};
pub use endpoints::GbpEndpoints;
pub use error::{Error, Result};
pub use request::{DEFAULT_DAILY_METRICS, GbpRequest, PerformanceQuery};
