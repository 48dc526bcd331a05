//! Browser cookies as the credential store.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use super::negotiate::{CookieUpdate, StoredCredentials};
use crate::config::CookieConfig;
use crate::oauth::TokenGrant;

pub const ACCESS_TOKEN_COOKIE: &str = "gbp_access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "gbp_refresh_token";

/// Read whatever tokens the browser sent. Empty values count as absent.
pub fn read_credentials(jar: &CookieJar) -> StoredCredentials {
    let value = |name: &str| {
        jar.get(name)
            .map(|c| c.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };
    StoredCredentials {
        access_token: value(ACCESS_TOKEN_COOKIE),
        refresh_token: value(REFRESH_TOKEN_COOKIE),
    }
}

/// Attributes shared by both token cookies.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    secure: bool,
    access_max_age_secs: i64,
    refresh_max_age_secs: i64,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::from(&CookieConfig::default())
    }
}

impl From<&CookieConfig> for CookiePolicy {
    fn from(config: &CookieConfig) -> Self {
        Self {
            secure: config.secure,
            access_max_age_secs: config.access_max_age_secs,
            refresh_max_age_secs: config.refresh_max_age_secs,
        }
    }
}

impl CookiePolicy {
    /// Apply the directives a negotiation produced.
    pub fn apply(&self, jar: CookieJar, update: &CookieUpdate) -> CookieJar {
        let mut jar = jar;
        if let Some(grant) = &update.access_token {
            jar = self.store_grant(jar, grant);
        }
        if update.clear_refresh_token {
            jar = jar.add(self.removal(REFRESH_TOKEN_COOKIE));
        }
        jar
    }

    /// Store a fresh grant. The refresh cookie is only rewritten when the
    /// grant carries a refresh token.
    pub fn store_grant(&self, jar: CookieJar, grant: &TokenGrant) -> CookieJar {
        let access_age = grant.cookie_max_age(self.access_max_age_secs);
        let mut jar = jar.add(self.token_cookie(
            ACCESS_TOKEN_COOKIE,
            grant.access_token.clone(),
            access_age,
        ));
        if let Some(refresh) = &grant.refresh_token {
            jar = jar.add(self.token_cookie(
                REFRESH_TOKEN_COOKIE,
                refresh.clone(),
                self.refresh_max_age_secs,
            ));
        }
        jar
    }

    /// Expire both token cookies.
    pub fn clear_all(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.removal(ACCESS_TOKEN_COOKIE))
            .add(self.removal(REFRESH_TOKEN_COOKIE))
    }

    fn token_cookie(&self, name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::seconds(max_age_secs))
            .build()
    }

    // Removal must carry the same path as the original or the browser keeps it.
    fn removal(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.token_cookie(name, String::new(), 0);
        cookie.make_removal();
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};
    use axum::response::IntoResponse;

    fn set_cookie_headers(jar: CookieJar) -> Vec<String> {
        let response = jar.into_response();
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn jar_with(cookie_header: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie_header).unwrap());
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_read_credentials() {
        let creds = read_credentials(&jar_with("gbp_access_token=ya29.a; gbp_refresh_token=1//r"));
        assert_eq!(creds.access_token.as_deref(), Some("ya29.a"));
        assert_eq!(creds.refresh_token.as_deref(), Some("1//r"));

        let creds = read_credentials(&jar_with("gbp_access_token=; other=x"));
        assert!(creds.access_token.is_none());
        assert!(creds.refresh_token.is_none());
    }

    #[test]
    fn test_store_grant_attributes() {
        let policy = CookiePolicy::default();
        let grant = TokenGrant::new("ya29.a".into(), Some("1//r".into()), Some(3599));
        let headers = set_cookie_headers(policy.store_grant(CookieJar::new(), &grant));

        let access = headers.iter().find(|h| h.starts_with("gbp_access_token=")).unwrap();
        assert!(access.contains("HttpOnly"));
        assert!(access.contains("SameSite=Lax"));
        assert!(access.contains("Path=/"));
        assert!(access.contains("Max-Age=600"));
        assert!(!access.contains("Secure"));

        let refresh = headers.iter().find(|h| h.starts_with("gbp_refresh_token=")).unwrap();
        assert!(refresh.contains("Max-Age=2592000"));
    }

    #[test]
    fn test_access_cookie_bounded_by_token_lifetime() {
        let policy = CookiePolicy::default();
        let grant = TokenGrant::new("ya29.a".into(), None, Some(120));
        let headers = set_cookie_headers(policy.store_grant(CookieJar::new(), &grant));
        assert_eq!(headers.len(), 1);
        let age: i64 = headers[0]
            .split(';')
            .find_map(|part| part.trim().strip_prefix("Max-Age="))
            .unwrap()
            .parse()
            .unwrap();
        assert!((118..=120).contains(&age));
    }

    #[test]
    fn test_secure_flag_from_config() {
        let policy = CookiePolicy::from(&CookieConfig {
            secure: true,
            ..Default::default()
        });
        let grant = TokenGrant::new("ya29.a".into(), None, Some(3599));
        let headers = set_cookie_headers(policy.store_grant(CookieJar::new(), &grant));
        assert!(headers[0].contains("Secure"));
    }

    #[test]
    fn test_apply_clears_refresh_cookie() {
        let policy = CookiePolicy::default();
        let update = CookieUpdate {
            access_token: None,
            clear_refresh_token: true,
        };
        let headers = set_cookie_headers(policy.apply(jar_with("gbp_refresh_token=1//dead"), &update));
        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with("gbp_refresh_token="));
        assert!(headers[0].contains("Max-Age=0"));
    }

    #[test]
    fn test_apply_noop() {
        let headers = set_cookie_headers(CookiePolicy::default().apply(CookieJar::new(), &CookieUpdate::default()));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_clear_all() {
        let headers = set_cookie_headers(CookiePolicy::default().clear_all(CookieJar::new()));
        assert_eq!(headers.len(), 2);
        assert!(headers.iter().all(|h| h.contains("Max-Age=0")));
    }
}
