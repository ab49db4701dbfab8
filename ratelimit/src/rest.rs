// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! HTTP middleware to enforce rate limits.
//!
//! The middleware determines who is making the request as follows:
//!
//! 1.  A `ClientId` placed in the request extensions by an earlier layer, typically the one that
//!     authenticates the caller.
//! 1.  The peer address from `ConnectInfo`, which is only available when the server is started
//!     with connection information.
//! 1.  A fixed identifier shared by all remaining requests.

use crate::{ClientId, RateLimiter};
use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hexusers_core::rest::RestError;
use log::debug;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Header carrying the maximum number of requests per window.
pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// Header carrying the number of requests left in the current window.
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Header carrying the time, in seconds since the epoch, at which the quota frees up.
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// State of the `rate_limit` middleware.
#[derive(Clone)]
pub struct RateLimitState {
    /// The limiter that decides whether requests go through.
    limiter: Arc<RateLimiter>,

    /// Whether to scope the client identifiers to the route being accessed.
    per_route: bool,
}

impl RateLimitState {
    /// Creates the middleware state backed by `limiter`.
    pub fn new(limiter: Arc<RateLimiter>, per_route: bool) -> Self {
        Self { limiter, per_route }
    }
}

/// Determines the identifier to account `request` against.
fn client_id(request: &Request, per_route: bool) -> ClientId {
    let extensions = request.extensions();
    let id = match extensions.get::<ClientId>() {
        Some(id) => id.clone(),
        None => match extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => ClientId::for_ip(addr.ip()),
            None => ClientId::unknown(),
        },
    };

    if per_route {
        match extensions.get::<MatchedPath>() {
            Some(path) => id.with_route(path.as_str()),
            None => id.with_route(request.uri().path()),
        }
    } else {
        id
    }
}

/// Rounds `duration` up to whole seconds, returning at least 1.
fn retry_after_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

/// Adds the informational rate limit headers about `client` to `headers`.
fn add_headers(headers: &mut HeaderMap, limiter: &RateLimiter, client: &ClientId) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.limit()));
    headers.insert(REMAINING_HEADER, HeaderValue::from(limiter.remaining(client)));
    headers.insert(RESET_HEADER, HeaderValue::from(limiter.reset_time(client).unix_timestamp()));
}

/// Middleware that rejects requests from clients that exceeded their quota.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_id(&request, state.per_route);

    if !state.limiter.allow(&client) {
        let retry_after_secs = retry_after_secs(state.limiter.retry_after(&client));
        debug!("Rate limit exceeded for {}; retry in {}s", client, retry_after_secs);
        let mut response = RestError::TooManyRequests { retry_after_secs }.into_response();
        add_headers(response.headers_mut(), &state.limiter, &client);
        return response;
    }

    let mut response = next.run(request).await;
    add_headers(response.headers_mut(), &state.limiter, &client);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{Method, StatusCode};
    use axum::routing::get;
    use hexusers_core::clocks::Clock;
    use hexusers_core::clocks::testutils::SettableClock;
    use hexusers_core::rest::testutils::OneShotBuilder;
    use std::net::{IpAddr, Ipv4Addr};
    use time::macros::datetime;

    /// State of a running test.
    struct TestContext {
        /// Clock shared with the limiter.
        clock: Arc<SettableClock>,

        /// Router with the middleware installed.
        app: Router,
    }

    /// Middleware that copies the `x-test-user` header, if present, into a `ClientId` extension
    /// the way the authentication layer does.
    async fn fake_auth(mut request: Request, next: Next) -> Response {
        if let Some(user) = request.headers().get("x-test-user").and_then(|v| v.to_str().ok()) {
            let id = ClientId::for_user(user);
            request.extensions_mut().insert(id);
        }
        next.run(request).await
    }

    /// Initializes a router with two routes limited to `limit` requests per 10 seconds.
    fn setup(limit: usize, per_route: bool) -> TestContext {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let clock = Arc::from(SettableClock::new(datetime!(2024-03-10 12:00:00 UTC)));
        let limiter = Arc::from(RateLimiter::new(clock.clone(), limit, Duration::from_secs(10)));
        let state = RateLimitState::new(limiter, per_route);
        let app = Router::new()
            .route("/a", get(|| async { "a" }))
            .route("/b/:id", get(|| async { "b" }))
            .layer(axum::middleware::from_fn_with_state(state, rate_limit))
            .layer(axum::middleware::from_fn(fake_auth));
        TestContext { clock, app }
    }

    /// Returns a peer address for the host whose last octet is `i`.
    fn peer(i: u8) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 0, i)), 5000)
    }

    #[test]
    fn test_retry_after_secs_rounding() {
        assert_eq!(1, retry_after_secs(Duration::ZERO));
        assert_eq!(1, retry_after_secs(Duration::from_millis(1)));
        assert_eq!(1, retry_after_secs(Duration::from_secs(1)));
        assert_eq!(2, retry_after_secs(Duration::from_millis(1001)));
        assert_eq!(10, retry_after_secs(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_allowed_requests_carry_headers() {
        let context = setup(2, false);
        let reset = (context.clock.now_utc() + Duration::from_secs(10)).unix_timestamp();

        OneShotBuilder::new(context.app.clone(), (Method::GET, "/a"))
            .with_peer(peer(1))
            .send_empty()
            .await
            .expect_header("x-ratelimit-limit", "2")
            .expect_header("x-ratelimit-remaining", "1")
            .expect_header("x-ratelimit-reset", &reset.to_string())
            .expect_text("a")
            .await;
    }

    #[tokio::test]
    async fn test_denied_request() {
        let context = setup(2, false);
        let reset = (context.clock.now_utc() + Duration::from_secs(10)).unix_timestamp();

        for _ in 0..2 {
            OneShotBuilder::new(context.app.clone(), (Method::GET, "/a"))
                .with_peer(peer(1))
                .send_empty()
                .await
                .expect_text("a")
                .await;
        }

        context.clock.advance(Duration::from_millis(2500));
        OneShotBuilder::new(context.app.clone(), (Method::GET, "/a"))
            .with_peer(peer(1))
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_header("retry-after", "8")
            .expect_header("x-ratelimit-limit", "2")
            .expect_header("x-ratelimit-remaining", "0")
            .expect_header("x-ratelimit-reset", &reset.to_string())
            .expect_error("Too many requests")
            .await;

        context.clock.advance(Duration::from_millis(7500));
        OneShotBuilder::new(context.app, (Method::GET, "/a"))
            .with_peer(peer(1))
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_header("retry-after", "1")
            .expect_error("Too many requests")
            .await;
    }

    #[tokio::test]
    async fn test_peers_are_independent() {
        let context = setup(1, false);

        for i in 1..=3 {
            OneShotBuilder::new(context.app.clone(), (Method::GET, "/a"))
                .with_peer(peer(i))
                .send_empty()
                .await
                .expect_text("a")
                .await;
        }

        OneShotBuilder::new(context.app, (Method::GET, "/a"))
            .with_peer(peer(2))
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_error("Too many requests")
            .await;
    }

    #[tokio::test]
    async fn test_client_id_extension_takes_precedence_over_peer() {
        let context = setup(1, false);

        // Same user from different addresses shares a single quota.
        OneShotBuilder::new(context.app.clone(), (Method::GET, "/a"))
            .with_peer(peer(1))
            .with_header("x-test-user", "jane")
            .send_empty()
            .await
            .expect_text("a")
            .await;
        OneShotBuilder::new(context.app.clone(), (Method::GET, "/a"))
            .with_peer(peer(2))
            .with_header("x-test-user", "jane")
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_error("Too many requests")
            .await;

        // The anonymous quota of the peer is untouched.
        OneShotBuilder::new(context.app, (Method::GET, "/a"))
            .with_peer(peer(1))
            .send_empty()
            .await
            .expect_text("a")
            .await;
    }

    #[tokio::test]
    async fn test_unknown_clients_share_quota() {
        let context = setup(1, false);

        OneShotBuilder::new(context.app.clone(), (Method::GET, "/a"))
            .send_empty()
            .await
            .expect_text("a")
            .await;
        OneShotBuilder::new(context.app, (Method::GET, "/b/1"))
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_error("Too many requests")
            .await;
    }

    #[tokio::test]
    async fn test_per_route_quotas() {
        let context = setup(1, true);

        OneShotBuilder::new(context.app.clone(), (Method::GET, "/a"))
            .with_peer(peer(1))
            .send_empty()
            .await
            .expect_text("a")
            .await;
        OneShotBuilder::new(context.app.clone(), (Method::GET, "/b/1"))
            .with_peer(peer(1))
            .send_empty()
            .await
            .expect_text("b")
            .await;

        // Different paths matching the same route share the quota.
        OneShotBuilder::new(context.app, (Method::GET, "/b/2"))
            .with_peer(peer(1))
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_error("Too many requests")
            .await;
    }
}
