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

//! Extends the driver with the `login` and `authenticate` methods.

use crate::db;
use crate::driver::UsersDriver;
use crate::model::{AccessToken, Caller, Password, UserId};
use hexusers_core::db::DbError;
use hexusers_core::driver::{DriverError, DriverResult};
use hexusers_core::model::EmailAddress;
use log::info;

/// Message returned for any login failure so that callers cannot probe for registered emails.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

impl UsersDriver {
    /// Logs the user that owns `email` in with `password` and issues a new access token.
    pub async fn login(self, email: EmailAddress, password: Password) -> DriverResult<AccessToken> {
        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();

        let user = match db::get_user_by_email(tx.ex(), &email).await {
            Ok(user) => user,
            Err(DbError::NotFound) => {
                return Err(DriverError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        if !password.verify(user.password())? {
            return Err(DriverError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
        }

        let token = self.issue_token(&user, now)?;
        tx.commit().await?;
        info!("User {} logged in", user.id());
        Ok(token)
    }

    /// Validates `token` and returns the identity of the user that owns it.
    ///
    /// The role of the caller is the one currently stored in the database, not the one recorded
    /// in the token, so that role changes take effect immediately.
    pub async fn authenticate(self, token: AccessToken) -> DriverResult<Caller> {
        let now = self.clock.now_utc();
        let claims = self.decode_token(&token, now)?;

        let invalid = || DriverError::Unauthorized("Invalid access token".to_owned());
        let user_id = claims.sub.parse::<UserId>().map_err(|_| invalid())?;

        let mut ex = self.db.ex().await?;
        let user = match db::get_user(&mut ex, &user_id).await {
            Ok(user) => user,
            Err(DbError::NotFound) => return Err(invalid()),
            Err(e) => return Err(e.into()),
        };

        Ok(Caller::new(user_id, user.role()))
    }
}
