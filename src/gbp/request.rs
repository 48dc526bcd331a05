//! Typed descriptions of Business Profile operations.
//!
//! A [`GbpRequest`] is a plain value so the negotiation layer can replay the
//! same call under a different credential without knowing what it does.

use chrono::NaiveDate;
use serde_json::Value;

use super::error::{Error, Result};

/// Metrics requested when the caller does not name any.
pub const DEFAULT_DAILY_METRICS: &[&str] = &[
    "BUSINESS_IMPRESSIONS_DESKTOP_MAPS",
    "BUSINESS_IMPRESSIONS_DESKTOP_SEARCH",
    "BUSINESS_IMPRESSIONS_MOBILE_MAPS",
    "BUSINESS_IMPRESSIONS_MOBILE_SEARCH",
    "BUSINESS_DIRECTION_REQUESTS",
    "CALL_CLICKS",
    "WEBSITE_CLICKS",
];

/// One call against the Business Profile APIs.
#[derive(Debug, Clone, PartialEq)]
pub enum GbpRequest {
    ListAccounts,
    ListLocations {
        account: String,
        read_mask: Option<String>,
    },
    GetLocation {
        location: String,
        read_mask: Option<String>,
    },
    UpdateLocation {
        location: String,
        update_mask: String,
        body: Value,
    },
    ListReviews {
        account: String,
        location: String,
        page_token: Option<String>,
    },
    ReplyToReview {
        account: String,
        location: String,
        review: String,
        comment: String,
    },
    ListPosts {
        account: String,
        location: String,
    },
    CreatePost {
        account: String,
        location: String,
        body: Value,
    },
    DeletePost {
        account: String,
        location: String,
        post: String,
    },
    FetchPerformance(PerformanceQuery),
    ListNotifications {
        account: String,
    },
    ListVerifications {
        location: String,
    },
}

impl GbpRequest {
    /// Writes change provider state and are never replayed after an
    /// ambiguous failure.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            GbpRequest::UpdateLocation { .. }
                | GbpRequest::ReplyToReview { .. }
                | GbpRequest::CreatePost { .. }
                | GbpRequest::DeletePost { .. }
        )
    }

    /// Reject caller input no credential could make work: ids that would
    /// escape their path segment, an empty `updateMask` or reply comment.
    pub fn validate(&self) -> Result<()> {
        match self {
            GbpRequest::ListAccounts => {}
            GbpRequest::ListLocations { account, .. }
            | GbpRequest::ListNotifications { account } => {
                resource_id("accounts", account)?;
            }
            GbpRequest::GetLocation { location, .. }
            | GbpRequest::ListVerifications { location } => {
                resource_id("locations", location)?;
            }
            GbpRequest::UpdateLocation {
                location,
                update_mask,
                ..
            } => {
                resource_id("locations", location)?;
                if update_mask.trim().is_empty() {
                    return Err(Error::invalid_request("updateMask is required"));
                }
            }
            GbpRequest::ListReviews {
                account, location, ..
            }
            | GbpRequest::ListPosts { account, location }
            | GbpRequest::CreatePost {
                account, location, ..
            } => {
                resource_id("accounts", account)?;
                resource_id("locations", location)?;
            }
            GbpRequest::ReplyToReview {
                account,
                location,
                review,
                comment,
            } => {
                resource_id("accounts", account)?;
                resource_id("locations", location)?;
                resource_id("reviews", review)?;
                if comment.trim().is_empty() {
                    return Err(Error::invalid_request("Reply comment is empty"));
                }
            }
            GbpRequest::DeletePost {
                account,
                location,
                post,
            } => {
                resource_id("accounts", account)?;
                resource_id("locations", location)?;
                resource_id("localPosts", post)?;
            }
            GbpRequest::FetchPerformance(query) => {
                resource_id("locations", &query.location)?;
            }
        }
        Ok(())
    }

    /// Short name for logs.
    pub fn operation(&self) -> &'static str {
        match self {
            GbpRequest::ListAccounts => "list_accounts",
            GbpRequest::ListLocations { .. } => "list_locations",
            GbpRequest::GetLocation { .. } => "get_location",
            GbpRequest::UpdateLocation { .. } => "update_location",
            GbpRequest::ListReviews { .. } => "list_reviews",
            GbpRequest::ReplyToReview { .. } => "reply_to_review",
            GbpRequest::ListPosts { .. } => "list_posts",
            GbpRequest::CreatePost { .. } => "create_post",
            GbpRequest::DeletePost { .. } => "delete_post",
            GbpRequest::FetchPerformance(_) => "fetch_performance",
            GbpRequest::ListNotifications { .. } => "list_notifications",
            GbpRequest::ListVerifications { .. } => "list_verifications",
        }
    }
}

/// A validated daily-metrics query.
///
/// Dates are calendar dates. They are split into the year/month/day fields
/// the performance API expects and never shifted between time zones.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceQuery {
    pub location: String,
    pub metrics: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PerformanceQuery {
    /// Parse `YYYY-MM-DD` dates and fill in default metrics.
    pub fn new(
        location: impl Into<String>,
        metrics: Vec<String>,
        start_date: &str,
        end_date: &str,
    ) -> Result<Self> {
        let start = parse_date("startDate", start_date)?;
        let end = parse_date("endDate", end_date)?;
        if end < start {
            return Err(Error::invalid_request(format!(
                "endDate {end} is before startDate {start}"
            )));
        }

        let metrics: Vec<String> = metrics
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        let metrics = if metrics.is_empty() {
            DEFAULT_DAILY_METRICS.iter().map(|m| m.to_string()).collect()
        } else {
            metrics
        };

        Ok(Self {
            location: location.into(),
            metrics,
            start,
            end,
        })
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        Error::invalid_request(format!("{field} must be a YYYY-MM-DD date, got '{value}'"))
    })
}

/// Normalize a resource id for use as a single path segment.
///
/// Accepts either the bare id or the provider's resource name
/// (`accounts/123`, `locations/456`). Anything that would escape its path
/// segment is rejected.
pub(crate) fn resource_id(kind: &str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let id = trimmed
        .strip_prefix(kind)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(trimmed);

    if id.is_empty() || id.contains('/') || id == "." || id == ".." {
        return Err(Error::invalid_request(format!("Invalid {kind} id '{raw}'")));
    }
    Ok(urlencoding::encode(id).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_classification() {
        assert!(!GbpRequest::ListAccounts.is_write());
        assert!(
            !GbpRequest::ListVerifications {
                location: "1".into()
            }
            .is_write()
        );
        assert!(
            GbpRequest::DeletePost {
                account: "1".into(),
                location: "2".into(),
                post: "3".into(),
            }
            .is_write()
        );
        assert!(
            GbpRequest::UpdateLocation {
                location: "1".into(),
                update_mask: "title".into(),
                body: serde_json::json!({}),
            }
            .is_write()
        );
    }

    #[test]
    fn test_validate() {
        assert!(GbpRequest::ListAccounts.validate().is_ok());
        assert!(
            GbpRequest::GetLocation {
                location: "locations/77".into(),
                read_mask: None,
            }
            .validate()
            .is_ok()
        );

        let bad = [
            GbpRequest::GetLocation {
                location: "a/b".into(),
                read_mask: None,
            },
            GbpRequest::ListNotifications {
                account: "..".into(),
            },
            GbpRequest::DeletePost {
                account: "1".into(),
                location: "2".into(),
                post: "x/../y".into(),
            },
            GbpRequest::UpdateLocation {
                location: "1".into(),
                update_mask: " ".into(),
                body: serde_json::json!({}),
            },
            GbpRequest::ReplyToReview {
                account: "1".into(),
                location: "2".into(),
                review: "r9".into(),
                comment: "".into(),
            },
        ];
        for request in bad {
            let err = request.validate().unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)), "{request:?} accepted");
        }
    }

    #[test]
    fn test_performance_query_dates() {
        let query = PerformanceQuery::new("locations/9", vec![], "2024-01-31", "2024-02-29").unwrap();
        assert_eq!(query.start, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(query.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(query.metrics.len(), DEFAULT_DAILY_METRICS.len());
    }

    #[test]
    fn test_performance_query_rejects_bad_dates() {
        for (start, end) in [
            ("2024-13-01", "2024-12-31"),
            ("2024-02-30", "2024-03-01"),
            ("01/02/2024", "2024-03-01"),
            ("2024-01-01T00:00:00Z", "2024-03-01"),
        ] {
            let err = PerformanceQuery::new("1", vec![], start, end).unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)), "{start} accepted");
        }

        let err = PerformanceQuery::new("1", vec![], "2024-03-02", "2024-03-01").unwrap_err();
        assert!(err.to_string().contains("before"));
    }

    #[test]
    fn test_performance_query_keeps_named_metrics() {
        let query = PerformanceQuery::new(
            "1",
            vec!["CALL_CLICKS".into(), " ".into(), "WEBSITE_CLICKS".into()],
            "2024-01-01",
            "2024-01-07",
        )
        .unwrap();
        assert_eq!(query.metrics, vec!["CALL_CLICKS", "WEBSITE_CLICKS"]);
    }

    #[test]
    fn test_resource_id() {
        assert_eq!(resource_id("accounts", "123").unwrap(), "123");
        assert_eq!(resource_id("accounts", "accounts/123").unwrap(), "123");
        assert_eq!(resource_id("locations", " locations/456 ").unwrap(), "456");
        assert_eq!(resource_id("reviews", "a b").unwrap(), "a%20b");
        assert!(resource_id("accounts", "").is_err());
        assert!(resource_id("accounts", "accounts/").is_err());
        assert!(resource_id("accounts", "1/../2").is_err());
        assert!(resource_id("locations", "..").is_err());
    }
}
