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

//! API to list the users registered in the service.

use crate::driver::{Page, UsersDriver};
use crate::model::Caller;
use crate::rest::UserResponse;
use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use hexusers_core::rest::{EmptyBody, RestError};
use serde::{Deserialize, Serialize};

/// Query parameters accepted by this API.
#[derive(Deserialize)]
pub(crate) struct ListUsersQuery {
    /// Maximum number of users to return.
    pub(crate) limit: Option<u32>,

    /// Number of users to skip.
    pub(crate) offset: Option<u32>,
}

/// Message returned by the server with a page of users.
#[derive(Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize))]
pub(crate) struct UsersResponse {
    /// Users in the page.
    pub(crate) users: Vec<UserResponse>,

    /// Total number of users registered in the service.
    pub(crate) total: u64,

    /// Maximum number of users that were requested.
    pub(crate) limit: u32,

    /// Position of the first user in the page.
    pub(crate) offset: u32,
}

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    caller: Caller,
    Query(query): Query<ListUsersQuery>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let page = Page::new(query.limit, query.offset)?;
    let result = driver.list_users(caller, page).await?;
    Ok(Json(UsersResponse {
        users: result.users.into_iter().map(UserResponse::from).collect(),
        total: result.total,
        limit: result.page.limit(),
        offset: result.page.offset(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::rest::testutils::*;
    use axum::http;
    use hexusers_core::rest::testutils::OneShotBuilder;
    use std::time::Duration;

    fn route(query: &str) -> (http::Method, String) {
        (http::Method::GET, format!("/api/v1/users{}", query))
    }

    #[tokio::test]
    async fn test_pagination() {
        let context = TestContext::setup().await;
        let (admin, token) = context.create_and_login("admin@example.com", Role::Admin).await;
        let mut emails = vec![admin.email().as_str().to_owned()];
        for i in 0..4 {
            context.clock().advance(Duration::from_secs(1));
            let email = format!("user{}@example.com", i);
            context.create_user(&email, Role::User).await;
            emails.push(email);
        }

        let response = OneShotBuilder::new(context.app(), route("?limit=2&offset=1"))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_json::<UsersResponse>()
            .await;
        assert_eq!(5, response.total);
        assert_eq!(2, response.limit);
        assert_eq!(1, response.offset);
        let got: Vec<&str> = response.users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(&emails[1..3], got.as_slice());

        let response = OneShotBuilder::new(context.app(), route(""))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_json::<UsersResponse>()
            .await;
        assert_eq!(5, response.users.len());
        assert_eq!(20, response.limit);
        assert_eq!(0, response.offset);
    }

    #[tokio::test]
    async fn test_bad_limit() {
        let context = TestContext::setup().await;
        let (_, token) = context.create_and_login("admin@example.com", Role::Admin).await;

        for limit in [0, 101] {
            OneShotBuilder::new(context.app(), route(&format!("?limit={}", limit)))
                .with_bearer_auth(token.as_str())
                .send_empty()
                .await
                .expect_status(http::StatusCode::BAD_REQUEST)
                .expect_error("limit must be between 1 and 100")
                .await;
        }
    }

    #[tokio::test]
    async fn test_not_admin() {
        let context = TestContext::setup().await;
        let (_, token) = context.create_and_login("user@example.com", Role::User).await;

        OneShotBuilder::new(context.app(), route(""))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("Only administrators can list users")
            .await;
    }

    #[tokio::test]
    async fn test_anonymous() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route(""))
            .send_empty()
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("Missing access token")
            .await;
    }

    #[tokio::test]
    async fn test_payload_must_be_empty() {
        let context = TestContext::setup().await;
        let (_, token) = context.create_and_login("admin@example.com", Role::Admin).await;

        OneShotBuilder::new(context.app(), route(""))
            .with_bearer_auth(token.as_str())
            .send_text("should not be here")
            .await
            .expect_status(http::StatusCode::PAYLOAD_TOO_LARGE)
            .expect_error("should be empty")
            .await;
    }
}
