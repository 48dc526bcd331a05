//! Request-scoped Business Profile API client.

use std::fmt;
use std::sync::Arc;

use chrono::Datelike;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::endpoints::GbpEndpoints;
use super::error::{Error, Result};
use super::request::{GbpRequest, PerformanceQuery, resource_id};
use crate::net::HttpClient;

/// Fields requested for locations unless the caller asks for others.
pub const DEFAULT_LOCATION_READ_MASK: &str =
    "name,title,storefrontAddress,phoneNumbers,websiteUri,categories,regularHours,metadata";

/// Which credential path produced the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    OAuth,
    ServiceAccount,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::OAuth => write!(f, "oauth"),
            AuthMode::ServiceAccount => write!(f, "service_account"),
        }
    }
}

/// An access token tagged with the mode it was obtained in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub mode: AuthMode,
    pub access_token: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("mode", &self.mode)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Credential {
    pub fn oauth(access_token: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::OAuth,
            access_token: access_token.into(),
        }
    }

    pub fn service_account(access_token: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::ServiceAccount,
            access_token: access_token.into(),
        }
    }
}

/// Business Profile client bound to one credential.
///
/// Built per request and never mutated; switching credentials means
/// building another client.
#[derive(Clone)]
pub struct GbpClient {
    http: reqwest::Client,
    endpoints: Arc<GbpEndpoints>,
    credential: Credential,
}

impl fmt::Debug for GbpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GbpClient")
            .field("endpoints", &self.endpoints)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl GbpClient {
    pub fn new(http: &HttpClient, endpoints: Arc<GbpEndpoints>, credential: Credential) -> Self {
        Self {
            http: http.inner().clone(),
            endpoints,
            credential,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.credential.mode
    }

    /// Run any [`GbpRequest`].
    pub async fn execute(&self, request: &GbpRequest) -> Result<Value> {
        match request {
            GbpRequest::ListAccounts => self.list_accounts().await,
            GbpRequest::ListLocations { account, read_mask } => {
                self.list_locations(account, read_mask.as_deref()).await
            }
            GbpRequest::GetLocation {
                location,
                read_mask,
            } => self.get_location(location, read_mask.as_deref()).await,
            GbpRequest::UpdateLocation {
                location,
                update_mask,
                body,
            } => self.update_location(location, update_mask, body).await,
            GbpRequest::ListReviews {
                account,
                location,
                page_token,
            } => {
                self.list_reviews(account, location, page_token.as_deref())
                    .await
            }
            GbpRequest::ReplyToReview {
                account,
                location,
                review,
                comment,
            } => {
                self.reply_to_review(account, location, review, comment)
                    .await
            }
            GbpRequest::ListPosts { account, location } => {
                self.list_posts(account, location).await
            }
            GbpRequest::CreatePost {
                account,
                location,
                body,
            } => self.create_post(account, location, body).await,
            GbpRequest::DeletePost {
                account,
                location,
                post,
            } => self.delete_post(account, location, post).await,
            GbpRequest::FetchPerformance(query) => self.fetch_performance(query).await,
            GbpRequest::ListNotifications { account } => self.list_notifications(account).await,
            GbpRequest::ListVerifications { location } => {
                self.list_verifications(location).await
            }
        }
    }

    // -- Accounts --------------------------------------------------------------

    pub async fn list_accounts(&self) -> Result<Value> {
        let url = format!("{}/v1/accounts", self.endpoints.account_management);
        self.send(Method::GET, url, &[], None).await
    }

    // -- Locations -------------------------------------------------------------

    pub async fn list_locations(&self, account: &str, read_mask: Option<&str>) -> Result<Value> {
        let url = format!(
            "{}/v1/accounts/{}/locations",
            self.endpoints.business_information,
            resource_id("accounts", account)?
        );
        let query = [("readMask", read_mask_or_default(read_mask))];
        self.send(Method::GET, url, &query, None).await
    }

    pub async fn get_location(&self, location: &str, read_mask: Option<&str>) -> Result<Value> {
        let url = format!(
            "{}/v1/locations/{}",
            self.endpoints.business_information,
            resource_id("locations", location)?
        );
        let query = [("readMask", read_mask_or_default(read_mask))];
        self.send(Method::GET, url, &query, None).await
    }

    pub async fn update_location(
        &self,
        location: &str,
        update_mask: &str,
        body: &Value,
    ) -> Result<Value> {
        if update_mask.trim().is_empty() {
            return Err(Error::invalid_request("updateMask is required"));
        }
        let url = format!(
            "{}/v1/locations/{}",
            self.endpoints.business_information,
            resource_id("locations", location)?
        );
        let query = [("updateMask", update_mask.trim().to_string())];
        self.send(Method::PATCH, url, &query, Some(body)).await
    }

    // -- Reviews ---------------------------------------------------------------

    pub async fn list_reviews(
        &self,
        account: &str,
        location: &str,
        page_token: Option<&str>,
    ) -> Result<Value> {
        let url = format!("{}/reviews", self.v4_location(account, location)?);
        let query: Vec<(&str, String)> = page_token
            .filter(|t| !t.is_empty())
            .map(|t| ("pageToken", t.to_string()))
            .into_iter()
            .collect();
        self.send(Method::GET, url, &query, None).await
    }

    pub async fn reply_to_review(
        &self,
        account: &str,
        location: &str,
        review: &str,
        comment: &str,
    ) -> Result<Value> {
        if comment.trim().is_empty() {
            return Err(Error::invalid_request("Reply comment is empty"));
        }
        let url = format!(
            "{}/reviews/{}/reply",
            self.v4_location(account, location)?,
            resource_id("reviews", review)?
        );
        let body = serde_json::json!({ "comment": comment });
        self.send(Method::PUT, url, &[], Some(&body)).await
    }

    // -- Local posts -----------------------------------------------------------

    pub async fn list_posts(&self, account: &str, location: &str) -> Result<Value> {
        let url = format!("{}/localPosts", self.v4_location(account, location)?);
        self.send(Method::GET, url, &[], None).await
    }

    pub async fn create_post(&self, account: &str, location: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/localPosts", self.v4_location(account, location)?);
        self.send(Method::POST, url, &[], Some(body)).await
    }

    pub async fn delete_post(&self, account: &str, location: &str, post: &str) -> Result<Value> {
        let url = format!(
            "{}/localPosts/{}",
            self.v4_location(account, location)?,
            resource_id("localPosts", post)?
        );
        self.send(Method::DELETE, url, &[], None).await
    }

    // -- Performance -----------------------------------------------------------

    pub async fn fetch_performance(&self, query: &PerformanceQuery) -> Result<Value> {
        let url = format!(
            "{}/v1/locations/{}:fetchMultiDailyMetricsTimeSeries",
            self.endpoints.performance,
            resource_id("locations", &query.location)?
        );

        let mut params: Vec<(&str, String)> = query
            .metrics
            .iter()
            .map(|m| ("dailyMetrics", m.clone()))
            .collect();
        params.extend([
            ("dailyRange.startDate.year", query.start.year().to_string()),
            ("dailyRange.startDate.month", query.start.month().to_string()),
            ("dailyRange.startDate.day", query.start.day().to_string()),
            ("dailyRange.endDate.year", query.end.year().to_string()),
            ("dailyRange.endDate.month", query.end.month().to_string()),
            ("dailyRange.endDate.day", query.end.day().to_string()),
        ]);

        self.send(Method::GET, url, &params, None).await
    }

    // -- Notifications / verifications -----------------------------------------

    pub async fn list_notifications(&self, account: &str) -> Result<Value> {
        let url = format!(
            "{}/v1/accounts/{}/notificationSetting",
            self.endpoints.notifications,
            resource_id("accounts", account)?
        );
        self.send(Method::GET, url, &[], None).await
    }

    pub async fn list_verifications(&self, location: &str) -> Result<Value> {
        let url = format!(
            "{}/v1/locations/{}/verifications",
            self.endpoints.verifications,
            resource_id("locations", location)?
        );
        self.send(Method::GET, url, &[], None).await
    }

    // -- Internals -------------------------------------------------------------

    fn v4_location(&self, account: &str, location: &str) -> Result<String> {
        Ok(format!(
            "{}/v4/accounts/{}/locations/{}",
            self.endpoints.my_business,
            resource_id("accounts", account)?,
            resource_id("locations", location)?
        ))
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        if self.credential.access_token.trim().is_empty() {
            return Err(Error::Unauthenticated);
        }

        debug!(method = %method, url = %url, mode = %self.credential.mode, "GBP request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.credential.access_token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                mode = %self.credential.mode,
                "GBP request failed"
            );
            return Err(Error::upstream(status.as_u16(), text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn read_mask_or_default(read_mask: Option<&str>) -> String {
    match read_mask.map(str::trim) {
        Some(mask) if !mask.is_empty() => mask.to_string(),
        _ => DEFAULT_LOCATION_READ_MASK.to_string(),
    }
}
