use std::sync::Arc;

use axum::body::Body;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use garden_shared::ApiErrorResponse;

use super::auth::authenticate;
use super::rate_limit::{enforce, Decision};
use crate::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Headers that must not be forwarded (hop-by-hop).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.to_ascii_lowercase().as_str())
}

/// Upstream path for a gateway path: `/api/sensors/1` becomes `/sensors/1`.
pub fn upstream_path(path: &str) -> &str {
    match path.strip_prefix("/api") {
        Some("") => "/",
        Some(rest) => rest,
        None => path,
    }
}

fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ApiErrorResponse::new(code, message))).into_response()
}

/// The catch-all proxy handler.
///
/// Resolves the upstream, authenticates the caller, applies the per-endpoint
/// rate limit, forwards the request and stamps the rate-limit headers on the
/// upstream response. Account routes skip authentication and limiting.
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    OriginalUri(original_uri): OriginalUri,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let path = original_uri.path();
    let query = original_uri.query();

    let Some(upstream_base) = state.config.resolve_upstream(path) else {
        return error(StatusCode::NOT_FOUND, "E0003", "no upstream service for this path");
    };

    let limit_headers = if state.config.is_public(path) {
        None
    } else {
        let user = match authenticate(&headers, &state.config.jwt_secret) {
            Ok(user) => user,
            Err(e) => return e.into_response(),
        };

        match enforce(&state.limiter, user.id, path).await {
            Ok(Decision::Unlimited) => None,
            Ok(Decision::Allowed(h)) => Some(h),
            Ok(Decision::Rejected(response)) => return response,
            Err(e) => {
                tracing::error!(error = %e, user_id = %user.id, "rate limit check failed");
                return e.into_response();
            }
        }
    };

    let upstream_url = match query {
        Some(q) => format!("{upstream_base}{}?{q}", upstream_path(path)),
        None => format!("{upstream_base}{}", upstream_path(path)),
    };

    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(_) => {
            return error(StatusCode::PAYLOAD_TOO_LARGE, "E0009", "request body too large (max 2MB)");
        }
    };

    let mut upstream_req = state
        .http_client
        .request(method, &upstream_url)
        .body(body_bytes.to_vec());

    for (name, value) in headers.iter() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        if let Ok(val) = value.to_str() {
            upstream_req = upstream_req.header(name.as_str(), val);
        }
    }

    let upstream_resp = match upstream_req.send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, upstream = %upstream_url, "upstream request failed");
            return error(StatusCode::BAD_GATEWAY, "E0007", "upstream unavailable");
        }
    };

    let status = StatusCode::from_u16(upstream_resp.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream_resp.headers().iter() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        if let (Ok(hn), Ok(hv)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            response_headers.append(hn, hv);
        }
    }
    if let Some(h) = limit_headers {
        h.apply(&mut response_headers);
    }

    let resp_body = match upstream_resp.bytes().await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "failed to read upstream response body");
            return error(StatusCode::BAD_GATEWAY, "E0007", "failed to read upstream response");
        }
    };

    (status, response_headers, resp_body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_the_api_prefix() {
        assert_eq!(upstream_path("/api/sensors/42/readings"), "/sensors/42/readings");
        assert_eq!(upstream_path("/api/notifications"), "/notifications");
        assert_eq!(upstream_path("/api"), "/");
        assert_eq!(upstream_path("/other"), "/other");
    }

    #[test]
    fn hop_by_hop_is_case_insensitive() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("transfer-encoding"));
        assert!(!is_hop_by_hop("authorization"));
    }
}
