//! Credential store and per-request auth negotiation.

pub mod cookies;
pub mod negotiate;

pub use cookies::{ACCESS_TOKEN_COOKIE, CookiePolicy, REFRESH_TOKEN_COOKIE, read_credentials};
pub use negotiate::{CookieUpdate, Negotiation, Negotiator, Outcome, StoredCredentials};
