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

//! API to get the details of a single user.

use crate::driver::UsersDriver;
use crate::model::Caller;
use crate::rest::{UserResponse, parse_user_id};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use hexusers_core::rest::{EmptyBody, RestError};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    caller: Caller,
    Path(id): Path<String>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let id = parse_user_id(&id)?;
    let user = driver.get_user(caller, id).await?;
    Ok(Json(UserResponse::from(user)))
}
