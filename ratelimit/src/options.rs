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

//! Configuration of the rate limiter.

use hexusers_core::env::get_optional_var;
use std::time::Duration;

/// Default value for the `limit` configuration property.
const DEFAULT_LIMIT: usize = 100;

/// Default value for the `window` configuration property.
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default value for the `sweep_interval` configuration property.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Largest accepted value for the `window` configuration property.
const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Options to configure rate limiting.
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitOptions {
    /// Maximum number of requests accepted per client within `window`.
    pub limit: usize,

    /// Length of the trailing window.
    pub window: Duration,

    /// How often to forget clients with no recent requests.  Zero disables sweeping.
    pub sweep_interval: Duration,

    /// Whether each route gets its own quota instead of sharing one across the whole service.
    pub per_route: bool,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            per_route: false,
        }
    }
}

impl RateLimitOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_LIMIT`, `<prefix>_WINDOW`,
    /// `<prefix>_SWEEP_INTERVAL` and `<prefix>_PER_ROUTE`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let opts = Self {
            limit: get_optional_var::<usize>(prefix, "LIMIT")?.unwrap_or(DEFAULT_LIMIT),
            window: get_optional_var::<Duration>(prefix, "WINDOW")?.unwrap_or(DEFAULT_WINDOW),
            sweep_interval: get_optional_var::<Duration>(prefix, "SWEEP_INTERVAL")?
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
            per_route: get_optional_var::<bool>(prefix, "PER_ROUTE")?.unwrap_or(false),
        };
        if opts.limit == 0 {
            return Err(format!("{}_LIMIT must be positive", prefix));
        }
        if opts.window.is_zero() {
            return Err(format!("{}_WINDOW must be positive", prefix));
        }
        if opts.window > MAX_WINDOW {
            return Err(format!("{}_WINDOW must be at most 365d", prefix));
        }
        Ok(opts)
    }
}
