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

//! Extends the driver with the `ensure_admin` method.

use crate::db;
use crate::driver::UsersDriver;
use crate::model::{DisplayName, NewUser, Password, Role, User, UserId, UserUpdate};
use hexusers_core::db::DbError;
use hexusers_core::driver::DriverResult;
use hexusers_core::model::EmailAddress;
use log::{info, warn};

impl UsersDriver {
    /// Makes sure that an administrator owning `email` exists.
    ///
    /// If no user owns `email`, a new administrator is created with `password` and `name`.  If a
    /// regular user owns `email`, it is promoted to administrator and keeps its password.  This is
    /// meant to be called at startup and can be called any number of times.
    pub async fn ensure_admin(
        self,
        email: EmailAddress,
        password: Password,
        name: DisplayName,
    ) -> DriverResult<User> {
        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();

        let user = match db::get_user_by_email(tx.ex(), &email).await {
            Ok(user) if user.role() == Role::Admin => {
                info!("Administrator {} already exists", email.as_str());
                return Ok(user);
            }
            Ok(user) => {
                let update = UserUpdate { role: Some(Role::Admin), ..Default::default() };
                let user = user.apply(update, now)?;
                db::update_user(tx.ex(), &user).await?;
                warn!("Promoted existing user {} to administrator", email.as_str());
                user
            }
            Err(DbError::NotFound) => {
                let new_user = NewUser {
                    name,
                    email,
                    password,
                    role: Some(Role::Admin),
                    phone: None,
                    document: None,
                };
                let user = new_user.into_user(UserId::generate(), now)?;
                db::create_user(tx.ex(), &user).await?;
                info!("Created administrator {}", user.email().as_str());
                user
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;

    #[tokio::test]
    async fn test_ensure_admin_creates_once() {
        let context = TestContext::setup().await;

        let admin = context
            .driver()
            .ensure_admin(
                EmailAddress::from("root@example.com"),
                Password::from("root0password"),
                DisplayName::from("Root"),
            )
            .await
            .unwrap();
        assert_eq!(Role::Admin, admin.role());
        assert_eq!("Root", admin.name().as_str());

        let again = context
            .driver()
            .ensure_admin(
                EmailAddress::from("root@example.com"),
                Password::from("other0password"),
                DisplayName::from("Other"),
            )
            .await
            .unwrap();
        assert_eq!(admin, again);
        assert_eq!(1, db::count_users(&mut context.ex().await).await.unwrap());

        context
            .driver()
            .login(EmailAddress::from("root@example.com"), Password::from("root0password"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_admin_promotes_existing_user() {
        let context = TestContext::setup().await;
        let user = context.create_user("someone@example.com", Role::User).await;

        let admin = context
            .driver()
            .ensure_admin(
                EmailAddress::from("someone@example.com"),
                Password::from("ignored0password"),
                DisplayName::from("Ignored"),
            )
            .await
            .unwrap();
        assert_eq!(user.id(), admin.id());
        assert_eq!(Role::Admin, admin.role());
        assert_eq!(user.password(), admin.password());
        assert_eq!(admin, db::get_user(&mut context.ex().await, user.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_admin_weak_password() {
        let context = TestContext::setup().await;

        context
            .driver()
            .ensure_admin(
                EmailAddress::from("root@example.com"),
                Password::from("weak"),
                DisplayName::from("Root"),
            )
            .await
            .unwrap_err();
        assert_eq!(0, db::count_users(&mut context.ex().await).await.unwrap());
    }
}
