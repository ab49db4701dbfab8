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

//! Utilities to deal with HTTP authorization.

use crate::model::AccessToken;
use axum::http::HeaderMap;
use hexusers_core::rest::{AUTH_SCHEME, RestError, RestResult, get_unique_header};

/// Extracts the bearer token from the `Authorization` header in `headers`, if any.
///
/// A missing header is not an error because many APIs accept anonymous requests.  A malformed
/// header is, as it signals a confused client.
pub(crate) fn get_bearer_token(headers: &HeaderMap) -> RestResult<Option<AccessToken>> {
    let authz = match get_unique_header(headers, "Authorization") {
        Ok(Some(value)) => value,
        Ok(None) => return Ok(None),
        Err(e) => return Err(RestError::unauthorized(e.to_string())),
    };

    let authz = authz.to_str().map_err(|e| {
        RestError::unauthorized(format!("Bad encoding in Authorization header: {}", e))
    })?;

    let (scheme, payload) = match authz.split_once(' ') {
        Some((scheme, payload)) if !scheme.is_empty() => (scheme, payload.trim()),
        _ => {
            return Err(RestError::unauthorized("Bad Authorization header: missing payload"));
        }
    };
    if !scheme.eq_ignore_ascii_case(AUTH_SCHEME) {
        return Err(RestError::unauthorized("Unsupported scheme"));
    }

    match AccessToken::new(payload) {
        Ok(token) => Ok(Some(token)),
        Err(e) => Err(RestError::unauthorized(e.to_string())),
    }
}
