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

//! User management service with per-client rate limiting.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use axum::Router;
use derivative::Derivative;
use hexusers_core::clocks::{Clock, SystemClock};
use hexusers_core::db::Db;
use hexusers_core::env::get_optional_var;
use hexusers_core::model::EmailAddress;
use hexusers_ratelimit::rest::RateLimitState;
use hexusers_ratelimit::{RateLimitOptions, RateLimiter};
use log::{error, info};
use std::error::Error;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

pub mod db;
pub mod driver;
use driver::{TokenOptions, UsersDriver};
pub mod model;
use model::{DisplayName, Password};
mod rest;

/// Default address to listen on when none is configured.
const DEFAULT_BIND_ADDR: (Ipv4Addr, u16) = (Ipv4Addr::LOCALHOST, 8080);

/// Display name given to the bootstrap administrator when it has to be created.
const ADMIN_NAME: &str = "Administrator";

/// Credentials of the administrator to bootstrap at startup.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct AdminOptions {
    /// Email address of the administrator.
    pub email: String,

    /// Password of the administrator, only used if the account has to be created.
    #[derivative(Debug = "ignore")]
    pub password: String,
}

/// Configuration options for the whole service.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ServiceOptions {
    /// Address to listen on.
    pub bind_addr: SocketAddr,

    /// Comma-separated list of origins allowed by CORS, or `None` to allow any origin.
    pub cors_origins: Option<String>,

    /// Configuration of the rate limiter.
    pub ratelimit: RateLimitOptions,

    /// Configuration of the access tokens.
    pub tokens: TokenOptions,

    /// Administrator to bootstrap at startup, if any.
    pub admin: Option<AdminOptions>,
}

impl ServiceOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_BIND_ADDR`, `<prefix>_CORS_ORIGINS`,
    /// `<prefix>_ADMIN_EMAIL` and `<prefix>_ADMIN_PASSWORD`, plus those read by
    /// `RateLimitOptions` under `<prefix>_RATELIMIT` and `TokenOptions` under `<prefix>_JWT`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let bind_addr = get_optional_var::<SocketAddr>(prefix, "BIND_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND_ADDR));
        let cors_origins = get_optional_var::<String>(prefix, "CORS_ORIGINS")?;
        let ratelimit = RateLimitOptions::from_env(&format!("{}_RATELIMIT", prefix))?;
        let tokens = TokenOptions::from_env(&format!("{}_JWT", prefix))?;

        let admin = match (
            get_optional_var::<String>(prefix, "ADMIN_EMAIL")?,
            get_optional_var::<String>(prefix, "ADMIN_PASSWORD")?,
        ) {
            (Some(email), Some(password)) => Some(AdminOptions { email, password }),
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                return Err(format!(
                    "{}_ADMIN_EMAIL and {}_ADMIN_PASSWORD must be set together",
                    prefix, prefix
                ));
            }
        };

        Ok(Self { bind_addr, cors_origins, ratelimit, tokens, admin })
    }
}

/// Prepares the database and builds the router that serves the application.
async fn setup(
    db: Arc<dyn Db + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    opts: ServiceOptions,
) -> Result<Router, Box<dyn Error>> {
    db::init_schema(&mut db.ex().await?).await?;

    let cors = rest::cors_layer(opts.cors_origins.as_deref())?;
    let driver = UsersDriver::new(db, clock.clone(), opts.tokens);

    if let Some(admin) = opts.admin {
        let email = EmailAddress::new(admin.email)?;
        let password = Password::new(admin.password)?;
        driver.clone().ensure_admin(email, password, DisplayName::new(ADMIN_NAME)?).await?;
    }

    let limiter = Arc::new(RateLimiter::new(clock, opts.ratelimit.limit, opts.ratelimit.window));
    if limiter.spawn_sweeper(opts.ratelimit.sweep_interval).is_none() {
        info!("Rate limiter sweeping disabled");
    }

    Ok(rest::app(driver, RateLimitState::new(limiter, opts.ratelimit.per_route), cors))
}

/// Waits until the process is asked to terminate.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received termination request; shutting down"),
        Err(e) => {
            error!("Cannot listen for termination requests: {}", e);
            std::future::pending::<()>().await
        }
    }
}

/// Instantiates all resources to serve the application backed by `db` with `opts`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    db: Arc<dyn Db + Send + Sync>,
    opts: ServiceOptions,
) -> Result<(), Box<dyn Error>> {
    let bind_addr = opts.bind_addr;
    let app = setup(db.clone(), Arc::new(SystemClock::default()), opts).await?;

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}
