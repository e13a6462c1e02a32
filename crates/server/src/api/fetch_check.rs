//! Diagnostic URL fetch endpoint.
//!
//! Bug reports about unfetchable icons and manifests usually come down to
//! the developer's web server blocking our published IP range. This
//! endpoint reproduces the fetch from the service's vantage point so the
//! problem can be confirmed without running a whole build.
//!
//! The URL is user-supplied, so it is validated against SSRF before any
//! fetch: http(s) only, and never localhost or private address ranges.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchCheckParams {
    pub url: String,
}

/// Fetch a user-supplied URL and relay status and body.
pub async fn fetch_check(
    State(_state): State<Arc<AppState>>,
    Query(params): Query<FetchCheckParams>,
) -> Response {
    let parsed = match reqwest::Url::parse(&params.url) {
        Ok(url) => url,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "Invalid URL").into_response();
        }
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return (
            StatusCode::BAD_REQUEST,
            "Only HTTP/HTTPS URLs are allowed",
        )
            .into_response();
    }

    let Some(host) = parsed.host_str() else {
        return (StatusCode::BAD_REQUEST, "URL has no host").into_response();
    };

    if is_forbidden_host(host) {
        return (
            StatusCode::FORBIDDEN,
            "Access to localhost and private address ranges is forbidden",
        )
            .into_response();
    }

    info!("Fetch check for {}", parsed);
    let result = match reqwest::get(parsed.clone()).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Fetch check for {} failed: {}", parsed, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Unable to initiate fetch for {}. Error: {}", params.url, e),
            )
                .into_response();
        }
    };

    let status =
        StatusCode::from_u16(result.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = result
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    match result.bytes().await {
        Ok(body) => (
            status,
            [(axum::http::header::CONTENT_TYPE, content_type)],
            body.to_vec(),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unable to read body from {}. Error: {}", params.url, e),
        )
            .into_response(),
    }
}

/// Rejects localhost names and IPs in private/internal ranges.
fn is_forbidden_host(host: &str) -> bool {
    let normalized = host.trim_start_matches('[').trim_end_matches(']');

    if matches!(
        normalized.to_ascii_lowercase().as_str(),
        "localhost" | "127.0.0.1" | "0.0.0.0" | "::1"
    ) {
        return true;
    }

    match normalized.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            ip.is_loopback()
                || ip.is_private()
                || ip.is_unspecified()
                || ip.is_link_local()
        }
        Ok(IpAddr::V6(ip)) => {
            // fc00::/7 unique-local addresses have no stable std helper.
            ip.is_loopback() || ip.is_unspecified() || (ip.segments()[0] & 0xfe00) == 0xfc00
        }
        Err(_) => false,
    }
}
