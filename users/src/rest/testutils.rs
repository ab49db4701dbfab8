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

//! Test utilities for the REST API.

use crate::driver::testutils::TestContext as DriverTestContext;
use crate::model::{AccessToken, Role, User};
use crate::rest::{app, cors_layer};
use axum::Router;
use hexusers_core::clocks::testutils::SettableClock;
use hexusers_core::db::{Db, Executor};
use hexusers_ratelimit::RateLimiter;
use hexusers_ratelimit::rest::RateLimitState;
use std::sync::Arc;
use std::time::Duration;

/// Quota used by tests that do not care about rate limiting.
const GENEROUS_LIMIT: usize = 10_000;

/// State of a running test.
pub(crate) struct TestContext {
    /// Context of the driver backing the app.
    inner: DriverTestContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app with a rate limit high enough to not interfere with the test.
    pub(crate) async fn setup() -> Self {
        Self::setup_with_limit(GENEROUS_LIMIT).await
    }

    /// Initializes the app so that clients can issue at most `limit` requests per minute.
    pub(crate) async fn setup_with_limit(limit: usize) -> Self {
        let inner = DriverTestContext::setup().await;
        let limiter = Arc::new(RateLimiter::new(inner.clock_arc(), limit, Duration::from_secs(60)));
        let app = app(
            inner.driver(),
            RateLimitState::new(limiter, false),
            cors_layer(None).unwrap(),
        );
        Self { inner, app }
    }

    /// Gets a copy of the app.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Gets the clock shared by the driver and the rate limiter.
    pub(crate) fn clock(&self) -> &SettableClock {
        self.inner.clock()
    }

    /// Gets access to the database backing the app.
    pub(crate) fn db(&self) -> &dyn Db {
        self.inner.db()
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.inner.ex().await
    }

    /// Creates a user with `email` and `role`.  See the driver's `TestContext::create_user`.
    pub(crate) async fn create_user(&self, email: &str, role: Role) -> User {
        self.inner.create_user(email, role).await
    }

    /// Logs in a user previously created with `create_user`.
    pub(crate) async fn login(&self, email: &str) -> AccessToken {
        self.inner.login(email).await
    }

    /// Creates a user with `email` and `role` and logs it in.
    pub(crate) async fn create_and_login(&self, email: &str, role: Role) -> (User, AccessToken) {
        let user = self.create_user(email, role).await;
        let token = self.login(email).await;
        (user, token)
    }
}
