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

//! API to check that the service is ready to serve requests.

use crate::driver::UsersDriver;
use crate::rest::health_get::HealthResponse;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use hexusers_core::rest::{EmptyBody, RestError};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    driver.health().await.map_err(|e| RestError::Unavailable(format!("database: {}", e)))?;
    Ok(Json(HealthResponse { status: "ok".to_owned(), database: Some("ok".to_owned()) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use axum::http;
    use hexusers_core::rest::testutils::OneShotBuilder;
    use hexusers_core::test_payload_must_be_empty;

    fn route() -> (http::Method, String) {
        (http::Method::GET, "/api/v1/health/ready".to_owned())
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.into_app(), route())
            .send_empty()
            .await
            .expect_json::<HealthResponse>()
            .await;
        assert_eq!(
            HealthResponse { status: "ok".to_owned(), database: Some("ok".to_owned()) },
            response
        );
    }

    #[tokio::test]
    async fn test_database_down() {
        let context = TestContext::setup().await;
        context.db().close().await;

        OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_status(http::StatusCode::SERVICE_UNAVAILABLE)
            .expect_error("Service unavailable: database")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
