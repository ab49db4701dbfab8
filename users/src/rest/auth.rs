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

//! Authentication of incoming requests.

use crate::driver::UsersDriver;
use crate::model::Caller;
use crate::rest::httputils::get_bearer_token;
use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use hexusers_core::rest::RestError;
use hexusers_ratelimit::ClientId;

/// Authentication failure recorded by `authenticate` and reported by `reject_unauthenticated`.
#[derive(Clone)]
pub(crate) struct AuthFailure(String);

/// Resolves the bearer token in `headers`, if any, into the `Caller` that owns it.
async fn identify(
    driver: UsersDriver,
    headers: &HeaderMap,
) -> Result<Option<Caller>, RestError> {
    match get_bearer_token(headers)? {
        Some(token) => Ok(Some(driver.authenticate(token).await?)),
        None => Ok(None),
    }
}

/// Middleware that authenticates the bearer token of the request, if any.
///
/// Valid tokens result in a `Caller` and a `ClientId` for the user being attached to the request
/// so that later layers can identify who is behind it.  Invalid tokens result in an `AuthFailure`
/// instead, which `reject_unauthenticated` turns into an error once the request has been
/// accounted for by the rate limiter.
pub(crate) async fn authenticate(
    State(driver): State<UsersDriver>,
    mut request: Request,
    next: Next,
) -> Result<Response, RestError> {
    let identity = identify(driver, request.headers()).await;
    match identity {
        Ok(Some(caller)) => {
            request.extensions_mut().insert(ClientId::for_user(caller.user_id()));
            request.extensions_mut().insert(caller);
        }
        Ok(None) => (),
        Err(RestError::Unauthorized { message, .. }) => {
            request.extensions_mut().insert(AuthFailure(message));
        }
        Err(e) => return Err(e),
    }
    Ok(next.run(request).await)
}

/// Middleware that fails requests whose credentials were rejected by `authenticate`.
pub(crate) async fn reject_unauthenticated(
    request: Request,
    next: Next,
) -> Result<Response, RestError> {
    if let Some(AuthFailure(message)) = request.extensions().get::<AuthFailure>() {
        return Err(RestError::unauthorized(message.clone()));
    }
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Caller>() {
            Some(caller) => Ok(*caller),
            None => Err(RestError::unauthorized("Missing access token")),
        }
    }
}
