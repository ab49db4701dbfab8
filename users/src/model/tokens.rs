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

//! The `AccessToken` and `Claims` data types.

use crate::model::Role;
use hexusers_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contents of the signed access tokens handed out at login.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct Claims {
    /// Identifier of the user the token was issued to.
    pub sub: String,

    /// Role of the user when the token was issued.
    pub role: Role,

    /// Issuer of the token.
    pub iss: String,

    /// Issue time, in seconds since the epoch.
    pub iat: i64,

    /// Expiration time, in seconds since the epoch.
    pub exp: i64,
}

/// An opaque type representing a user's access token.
#[derive(Clone, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a new access token from an untrusted string.
    ///
    /// This only validates the shape of the token.  Its signature and claims are only known to be
    /// valid once the driver has verified it.
    pub fn new<S: Into<String>>(token: S) -> ModelResult<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(ModelError("Access token cannot be empty".to_owned()));
        }
        if !token.chars().all(|ch| ch.is_ascii_alphanumeric() || "-_.".contains(ch)) {
            return Err(ModelError("Invalid access token".to_owned()));
        }
        Ok(Self(token))
    }

    /// Returns the string representation of the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed access token")
    }
}
