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

//! Identifiers for the clients whose requests are counted.

use std::fmt;
use std::net::IpAddr;

/// Opaque identifier of a client for rate limiting purposes.
///
/// The limiter does not interpret these in any way: two requests share a quota if and only if
/// their identifiers are equal.  The constructors below give the identifiers a consistent shape
/// across the service.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ClientId(String);

impl ClientId {
    /// Creates an identifier from a raw string.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Creates the identifier for an authenticated user.
    pub fn for_user<T: fmt::Display>(user_id: T) -> Self {
        Self(format!("user:{}", user_id))
    }

    /// Creates the identifier for an anonymous client connecting from `addr`.
    pub fn for_ip(addr: IpAddr) -> Self {
        Self(format!("ip:{}", addr))
    }

    /// Creates the identifier shared by all clients whose origin cannot be determined.
    pub fn unknown() -> Self {
        Self("ip:unknown".to_owned())
    }

    /// Scopes this identifier to a single `route` so that each endpoint gets its own quota.
    pub fn with_route(self, route: &str) -> Self {
        Self(format!("{}@{}", self.0, route))
    }

    /// Returns the textual form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
