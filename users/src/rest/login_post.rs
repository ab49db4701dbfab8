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

//! API to obtain an access token for an existing user.

use crate::driver::UsersDriver;
use crate::model::{AccessToken, Password};
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use hexusers_core::model::EmailAddress;
use hexusers_core::rest::{AUTH_SCHEME, RestError};
use serde::{Deserialize, Serialize};

/// Message sent to the server to log in.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct LoginRequest {
    /// Email address of the user.
    pub(crate) email: String,

    /// Password of the user.
    pub(crate) password: String,
}

/// Message returned by the server after a successful login attempt.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct LoginResponse {
    /// Access token to present in the `Authorization` header of later requests.
    pub(crate) access_token: AccessToken,

    /// Scheme to use when presenting the access token.
    pub(crate) token_type: String,

    /// Number of seconds during which the access token is valid.
    pub(crate) expires_in: u64,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, RestError> {
    let email = EmailAddress::new(request.email)?;
    let password = Password::new(request.password)?;

    let expires_in = driver.opts().ttl.as_secs();
    let access_token = driver.login(email, password).await?;

    Ok(Json(LoginResponse { access_token, token_type: AUTH_SCHEME.to_owned(), expires_in }))
}
