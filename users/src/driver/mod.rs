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

//! Business logic for the user management service.

use crate::driver::tokens::TokenKeys;
use derivative::Derivative;
use hexusers_core::clocks::Clock;
use hexusers_core::db::{self, Db};
use hexusers_core::driver::DriverResult;
use hexusers_core::env::{get_optional_var, get_required_var};
use std::sync::Arc;
use std::time::Duration;

mod admin;
mod auth;
mod tokens;
#[cfg(test)]
pub(crate) mod testutils;
mod user;
mod users;

pub use users::{Page, UsersPage};

/// Minimum length in bytes of the secret used to sign access tokens.
const MIN_SECRET_LENGTH: usize = 16;

/// Default value for the `TTL` setting when not specified.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default value for the `ISSUER` setting when not specified.
const DEFAULT_ISSUER: &str = "hexusers";

/// Configuration options for the access tokens issued by the driver.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct TokenOptions {
    /// Secret used to sign and verify access tokens with HMAC-SHA256.
    #[derivative(Debug = "ignore")]
    pub secret: String,

    /// Amount of time during which an access token is valid after being issued.
    pub ttl: Duration,

    /// Name of the issuer recorded in and required from access tokens.
    pub issuer: String,
}

impl TokenOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with
    /// `prefix`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let secret = get_required_var::<String>(prefix, "SECRET")?;
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(format!(
                "{}_SECRET must be at least {} bytes long",
                prefix, MIN_SECRET_LENGTH
            ));
        }

        let ttl = get_optional_var::<Duration>(prefix, "TTL")?.unwrap_or(DEFAULT_TTL);
        if ttl.is_zero() {
            return Err(format!("{}_TTL must be positive", prefix));
        }

        Ok(Self {
            secret,
            ttl,
            issuer: get_optional_var::<String>(prefix, "ISSUER")?
                .unwrap_or_else(|| DEFAULT_ISSUER.to_owned()),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub struct UsersDriver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Keys to sign and verify access tokens.
    tokens: Arc<TokenKeys>,

    /// Options for the access tokens.
    opts: TokenOptions,
}

impl UsersDriver {
    /// Creates a new driver backed by the given injected components.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        opts: TokenOptions,
    ) -> Self {
        let tokens = Arc::from(TokenKeys::new(&opts));
        Self { db, clock, tokens, opts }
    }

    /// Returns the token options provided at creation time.
    pub fn opts(&self) -> &TokenOptions {
        &self.opts
    }

    /// Checks that the service is able to serve requests by reaching out to the database.
    pub async fn health(self) -> DriverResult<()> {
        let mut ex = self.db.ex().await?;
        db::ping(&mut ex).await?;
        Ok(())
    }
}
