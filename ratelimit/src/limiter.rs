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

//! Sliding log rate limiter.

use crate::ClientId;
use hexusers_core::clocks::Clock;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio::task::JoinHandle;

/// Timestamps of the accepted requests of a single client, oldest first.
type ClientLog = VecDeque<OffsetDateTime>;

/// Drops from `log` all timestamps strictly older than `cutoff`.
fn prune(log: &mut ClientLog, cutoff: OffsetDateTime) {
    while log.front().is_some_and(|ts| *ts < cutoff) {
        log.pop_front();
    }
}

/// Returns the index of the first timestamp in `log` that is not older than `cutoff`.
fn first_in_window(log: &ClientLog, cutoff: OffsetDateTime) -> usize {
    log.partition_point(|ts| *ts < cutoff)
}

/// Limits every client to a maximum number of accepted requests within a trailing window.
///
/// A request made at `now` is accounted against all requests accepted in `[now - window, now]`.
/// Note that the lower bound is inclusive: a request accepted exactly `window` ago still counts.
///
/// All operations are safe to call concurrently.  `allow` is the only authoritative answer: the
/// values returned by `remaining` and `reset_time` may be stale by the time the caller uses them.
pub struct RateLimiter {
    /// Clock to obtain the current time from.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Maximum number of requests accepted per client within `window`.
    limit: usize,

    /// Length of the trailing window.
    window: Duration,

    /// Accepted requests per client.
    clients: RwLock<HashMap<ClientId, ClientLog>>,
}

impl RateLimiter {
    /// Creates a new limiter that accepts up to `limit` requests per client every `window`.
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, limit: usize, window: Duration) -> Self {
        Self { clock, limit, window, clients: RwLock::default() }
    }

    /// Returns the oldest time that still falls within the window ending at `now`.
    ///
    /// Windows reaching past the earliest representable time include everything.
    fn window_start(&self, now: OffsetDateTime) -> OffsetDateTime {
        time::Duration::try_from(self.window)
            .ok()
            .and_then(|window| now.checked_sub(window))
            .unwrap_or_else(|| PrimitiveDateTime::MIN.assume_utc())
    }

    /// Returns the time at which a request accepted at `ts` stops counting against its client.
    fn window_end(&self, ts: OffsetDateTime) -> OffsetDateTime {
        time::Duration::try_from(self.window)
            .ok()
            .and_then(|window| ts.checked_add(window))
            .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
    }

    /// Returns the maximum number of requests accepted per window.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records a request from `client` at the current time if the client has not yet exhausted
    /// its quota.  Returns whether the request was accepted.
    pub fn allow(&self, client: &ClientId) -> bool {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);

        // Query the time with the lock held so that concurrent callers append in order.
        let now = self.clock.now_utc();

        let log = clients.entry(client.clone()).or_default();
        prune(log, self.window_start(now));
        if log.len() >= self.limit {
            return false;
        }
        log.push_back(now);
        true
    }

    /// Returns how many more requests `client` can make right now.
    pub fn remaining(&self, client: &ClientId) -> usize {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now_utc();

        let used = match clients.get(client) {
            Some(log) => log.len() - first_in_window(log, self.window_start(now)),
            None => 0,
        };
        self.limit.saturating_sub(used)
    }

    /// Returns the time at which the oldest request of `client` that still counts against its
    /// quota leaves the window.  Clients with no requests in the window get the current time.
    pub fn reset_time(&self, client: &ClientId) -> OffsetDateTime {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now_utc();

        clients
            .get(client)
            .and_then(|log| log.get(first_in_window(log, self.window_start(now))))
            .map(|oldest| self.window_end(*oldest))
            .unwrap_or(now)
    }

    /// Returns how long `client` has to wait until `reset_time`.
    pub fn retry_after(&self, client: &ClientId) -> Duration {
        let reset = self.reset_time(client);
        let now = self.clock.now_utc();
        Duration::try_from(reset - now).unwrap_or(Duration::ZERO)
    }

    /// Forgets all clients that have no requests left in the window and returns how many were
    /// removed.
    pub fn sweep(&self) -> usize {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        let cutoff = self.window_start(self.clock.now_utc());

        let before = clients.len();
        clients.retain(|_, log| {
            prune(log, cutoff);
            !log.is_empty()
        });
        before - clients.len()
    }

    /// Returns the number of clients currently being tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Starts a background task that calls `sweep` every `interval`.
    ///
    /// The task stops on its own once the limiter is dropped.  Returns `None` and starts nothing
    /// if `interval` is zero.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            return None;
        }

        let clock = self.clock.clone();
        let limiter = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            loop {
                clock.sleep(interval).await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!(
                        "Rate limiter sweep removed {} idle clients; {} remain",
                        removed,
                        limiter.tracked_clients()
                    );
                }
            }
        }))
    }
}
