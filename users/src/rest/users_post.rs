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

//! API to create a new user.

use crate::driver::UsersDriver;
use crate::model::{Caller, DisplayName, Document, NewUser, Password, Phone, Role};
use crate::rest::UserResponse;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use hexusers_core::model::{EmailAddress, ModelResult};
use hexusers_core::rest::RestError;
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to create a user.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Default, Serialize))]
pub(crate) struct CreateUserRequest {
    /// Display name of the new user.
    pub(crate) name: String,

    /// Email address of the new user.
    pub(crate) email: String,

    /// Password of the new user.
    pub(crate) password: String,

    /// Role of the new user.  Defaults to a regular user.
    #[serde(default)]
    pub(crate) role: Option<String>,

    /// Contact phone of the new user.
    #[serde(default)]
    pub(crate) phone: Option<String>,

    /// Taxpayer document of the new user.
    #[serde(default)]
    pub(crate) document: Option<String>,
}

impl CreateUserRequest {
    /// Validates the untrusted contents of the request.
    fn into_new_user(self) -> ModelResult<NewUser> {
        Ok(NewUser {
            name: DisplayName::new(self.name)?,
            email: EmailAddress::new(self.email)?,
            password: Password::new(self.password)?,
            role: self.role.map(|r| r.parse::<Role>()).transpose()?,
            phone: self.phone.map(Phone::new).transpose()?,
            document: self.document.map(Document::new).transpose()?,
        })
    }
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    caller: Option<Caller>,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, RestError> {
    let new_user = request.into_new_user()?;
    let user = driver.create_user(caller, new_user).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::rest::testutils::*;
    use axum::http;
    use hexusers_core::rest::testutils::OneShotBuilder;
    use hexusers_core::test_payload_must_be_json;

    fn route() -> (http::Method, String) {
        (http::Method::POST, "/api/v1/users".to_owned())
    }

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "  New User ".to_owned(),
            email: email.to_owned(),
            password: "new0password".to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_anonymous_ok() {
        let context = TestContext::setup().await;

        let mut request = request("new@example.com");
        request.phone = Some("(11) 3333-4444".to_owned());
        request.document = Some("529.982.247-25".to_owned());
        let response = OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<UserResponse>()
            .await;

        assert_eq!("New User", response.name);
        assert_eq!("new@example.com", response.email);
        assert_eq!(Role::User, response.role);
        assert_eq!(Some("1133334444"), response.phone.as_deref());
        assert_eq!(Some("52998224725"), response.document.as_deref());

        let user = db::get_user(&mut context.ex().await, &response.id).await.unwrap();
        assert_eq!(UserResponse::from(user), response);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let context = TestContext::setup().await;
        context.create_user("taken@example.com", Role::User).await;

        OneShotBuilder::new(context.app(), route())
            .send_json(request("taken@example.com"))
            .await
            .expect_status(http::StatusCode::CONFLICT)
            .expect_error("already registered")
            .await;
    }

    #[tokio::test]
    async fn test_admin_role_requires_admin() {
        let context = TestContext::setup().await;
        let (_, user_token) = context.create_and_login("user@example.com", Role::User).await;
        let (_, admin_token) = context.create_and_login("admin@example.com", Role::Admin).await;

        let mut admin_request = request("new@example.com");
        admin_request.role = Some("admin".to_owned());

        OneShotBuilder::new(context.app(), route())
            .send_json(&admin_request)
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("Only administrators can create administrators")
            .await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(user_token.as_str())
            .send_json(&admin_request)
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("Only administrators can create administrators")
            .await;

        let response = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(admin_token.as_str())
            .send_json(&admin_request)
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<UserResponse>()
            .await;
        assert_eq!(Role::Admin, response.role);
    }

    #[tokio::test]
    async fn test_invalid_fields() {
        let context = TestContext::setup().await;

        let mut bad_role = request("new@example.com");
        bad_role.role = Some("root".to_owned());
        let mut bad_phone = request("new@example.com");
        bad_phone.phone = Some("(10) 3333-4444".to_owned());
        let mut bad_document = request("new@example.com");
        bad_document.document = Some("111.111.111-11".to_owned());
        let mut weak_password = request("new@example.com");
        weak_password.password = "password".to_owned();
        let mut empty_name = request("new@example.com");
        empty_name.name = "   ".to_owned();

        for (request, exp_error) in [
            (bad_role, "Unknown role"),
            (bad_phone, "area code"),
            (bad_document, "Document"),
            (weak_password, "Weak password"),
            (empty_name, "Name"),
            (request("not-an-email"), "valid address"),
        ] {
            OneShotBuilder::new(context.app(), route())
                .send_json(request)
                .await
                .expect_status(http::StatusCode::BAD_REQUEST)
                .expect_error(exp_error)
                .await;
        }
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route());
}
