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

//! API to check that the service is alive.

use axum::Json;
use axum::response::IntoResponse;
use hexusers_core::rest::{EmptyBody, RestError};
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;

/// Message returned by the health checks.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize, PartialEq))]
pub(crate) struct HealthResponse {
    /// Overall status of the service.
    pub(crate) status: String,

    /// Status of the database, only reported by the readiness check.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(test, serde(default))]
    pub(crate) database: Option<String>,
}

/// GET handler for this API.
pub(crate) async fn handler(_: EmptyBody) -> Result<impl IntoResponse, RestError> {
    Ok(Json(HealthResponse { status: "ok".to_owned(), database: None }))
}
