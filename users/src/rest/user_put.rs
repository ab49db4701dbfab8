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

//! API to modify an existing user.

use crate::driver::UsersDriver;
use crate::model::{Caller, DisplayName, Document, Password, Phone, Role, UserUpdate};
use crate::rest::{UserResponse, parse_user_id};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use hexusers_core::model::{EmailAddress, ModelResult};
use hexusers_core::rest::RestError;
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to modify a user.  Absent fields are left unchanged.
#[derive(Default, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct UpdateUserRequest {
    /// New display name.
    #[serde(default)]
    pub(crate) name: Option<String>,

    /// New email address.
    #[serde(default)]
    pub(crate) email: Option<String>,

    /// New password.
    #[serde(default)]
    pub(crate) password: Option<String>,

    /// New role.
    #[serde(default)]
    pub(crate) role: Option<String>,

    /// New contact phone.
    #[serde(default)]
    pub(crate) phone: Option<String>,

    /// New taxpayer document.
    #[serde(default)]
    pub(crate) document: Option<String>,
}

impl UpdateUserRequest {
    /// Validates the untrusted contents of the request.
    fn into_update(self) -> ModelResult<UserUpdate> {
        Ok(UserUpdate {
            name: self.name.map(DisplayName::new).transpose()?,
            email: self.email.map(EmailAddress::new).transpose()?,
            password: self.password.map(Password::new).transpose()?,
            role: self.role.map(|r| r.parse::<Role>()).transpose()?,
            phone: self.phone.map(Phone::new).transpose()?,
            document: self.document.map(Document::new).transpose()?,
        })
    }
}

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    caller: Caller,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, RestError> {
    let id = parse_user_id(&id)?;
    let update = request.into_update()?;
    let user = driver.update_user(caller, id, update).await?;
    Ok(Json(UserResponse::from(user)))
}
