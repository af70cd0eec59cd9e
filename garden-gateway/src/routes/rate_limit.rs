use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use garden_shared::errors::{AppResult, ErrorCode};
use garden_shared::middleware::route_family;
use garden_shared::ApiErrorResponse;

use crate::rate_limit::RateLimiter;

const LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Values for the `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u32,
    pub remaining: u32,
    pub reset: DateTime<Utc>,
}

impl RateLimitHeaders {
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT, HeaderValue::from(self.limit));
        headers.insert(REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RESET, HeaderValue::from(self.reset.timestamp()));
    }
}

/// Outcome of the per-request limit check.
pub enum Decision {
    /// Limiting is switched off; no headers are added.
    Unlimited,
    Allowed(RateLimitHeaders),
    Rejected(Response),
}

/// Check `(user_id, endpoint)` where the endpoint is the first two segments of `path`.
pub async fn enforce(
    limiter: &RateLimiter,
    user_id: Uuid,
    path: &str,
) -> AppResult<Decision> {
    let settings = limiter.settings();
    if !settings.enabled {
        return Ok(Decision::Unlimited);
    }

    let endpoint = route_family(path);
    let allowed = limiter.check(user_id, &endpoint).await?;
    let headers = RateLimitHeaders {
        limit: settings.max_requests,
        remaining: limiter.remaining_requests(user_id, &endpoint).await?,
        reset: limiter.reset_time(user_id, &endpoint).await?,
    };

    if allowed {
        return Ok(Decision::Allowed(headers));
    }

    metrics::counter!("rate_limit_rejections_total", "endpoint" => endpoint.clone()).increment(1);
    tracing::warn!(user_id = %user_id, endpoint = %endpoint, "rate limit exceeded");

    let retry_after = (headers.reset - limiter.now()).num_seconds().max(0);
    let mut response = (
        ErrorCode::RateLimited.status_code(),
        Json(ApiErrorResponse::new(ErrorCode::RateLimited.code(), "rate limit exceeded")),
    )
        .into_response();
    headers.apply(response.headers_mut());
    response
        .headers_mut()
        .insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));

    Ok(Decision::Rejected(response))
}
