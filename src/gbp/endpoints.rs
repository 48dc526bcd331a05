use crate::config::ApiEndpointsConfig;

/// Base URLs of the Business Profile API families, without trailing slash.
#[derive(Debug, Clone, PartialEq)]
pub struct GbpEndpoints {
    pub account_management: String,
    pub business_information: String,
    pub my_business: String,
    pub performance: String,
    pub notifications: String,
    pub verifications: String,
}

impl Default for GbpEndpoints {
    fn default() -> Self {
        Self::from(&ApiEndpointsConfig::default())
    }
}

impl GbpEndpoints {
    /// Point every family at one base URL (mock servers, local proxies).
    pub fn with_base_url(base: &str) -> Self {
        let base = trim(base);
        Self {
            account_management: base.clone(),
            business_information: base.clone(),
            my_business: base.clone(),
            performance: base.clone(),
            notifications: base.clone(),
            verifications: base,
        }
    }
}

impl From<&ApiEndpointsConfig> for GbpEndpoints {
    fn from(config: &ApiEndpointsConfig) -> Self {
        Self {
            account_management: trim(&config.account_management_url),
            business_information: trim(&config.business_information_url),
            my_business: trim(&config.my_business_url),
            performance: trim(&config.performance_url),
            notifications: trim(&config.notifications_url),
            verifications: trim(&config.verifications_url),
        }
    }
}

fn trim(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_google() {
        let endpoints = GbpEndpoints::default();
        assert_eq!(
            endpoints.account_management,
            "https://mybusinessaccountmanagement.googleapis.com"
        );
        assert_eq!(endpoints.my_business, "https://mybusiness.googleapis.com");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let endpoints = GbpEndpoints::with_base_url("http://127.0.0.1:9999/");
        assert_eq!(endpoints.performance, "http://127.0.0.1:9999");
        assert_eq!(endpoints.verifications, "http://127.0.0.1:9999");
    }
}
