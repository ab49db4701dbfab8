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

//! Operations on one user.

use crate::db;
use crate::driver::UsersDriver;
use crate::model::{Caller, User, UserId, UserUpdate};
use hexusers_core::db::DbError;
use hexusers_core::driver::{DriverError, DriverResult};
use log::info;

/// Converts a database error that happened while accessing user `id` into a driver error.
fn map_user_error(e: DbError, id: &UserId) -> DriverError {
    match e {
        DbError::NotFound => DriverError::NotFound(format!("User {} not found", id)),
        e => e.into(),
    }
}

/// Ensures that `caller` can view or modify the account of user `id`.
fn check_access(caller: &Caller, id: &UserId) -> DriverResult<()> {
    if !caller.can_access(id) {
        return Err(DriverError::Forbidden("Cannot access another user's account".to_owned()));
    }
    Ok(())
}

impl UsersDriver {
    /// Gets the details of user `id`.
    pub async fn get_user(self, caller: Caller, id: UserId) -> DriverResult<User> {
        check_access(&caller, &id)?;

        let mut ex = self.db.ex().await?;
        db::get_user(&mut ex, &id).await.map_err(|e| map_user_error(e, &id))
    }

    /// Modifies user `id` by applying the fields set in `update`.
    ///
    /// Users can modify their own accounts but only administrators can change roles.
    pub async fn update_user(
        self,
        caller: Caller,
        id: UserId,
        update: UserUpdate,
    ) -> DriverResult<User> {
        check_access(&caller, &id)?;

        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();

        let user = db::get_user(tx.ex(), &id).await.map_err(|e| map_user_error(e, &id))?;
        if let Some(role) = update.role {
            if role != user.role() && !caller.is_admin() {
                return Err(DriverError::Forbidden(
                    "Only administrators can change roles".to_owned(),
                ));
            }
        }

        let user = user.apply(update, now)?;
        match db::update_user(tx.ex(), &user).await {
            Ok(()) => (),
            Err(DbError::AlreadyExists) => {
                return Err(DriverError::AlreadyExists(format!(
                    "Email {} is already registered",
                    user.email().as_str()
                )));
            }
            Err(e) => return Err(map_user_error(e, &id)),
        }
        tx.commit().await?;

        info!("Updated user {}", id);
        Ok(user)
    }

    /// Deletes user `id`.  Only administrators can delete users, and never themselves.
    pub async fn delete_user(self, caller: Caller, id: UserId) -> DriverResult<()> {
        if !caller.is_admin() {
            return Err(DriverError::Forbidden("Only administrators can delete users".to_owned()));
        }
        if caller.user_id() == &id {
            return Err(DriverError::Forbidden(
                "Administrators cannot delete their own account".to_owned(),
            ));
        }

        let mut tx = self.db.begin().await?;
        db::delete_user(tx.ex(), &id).await.map_err(|e| map_user_error(e, &id))?;
        tx.commit().await?;

        info!("Deleted user {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use crate::model::{DisplayName, Document, Password, Role};
    use hexusers_core::model::EmailAddress;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_user_self_and_admin() {
        let context = TestContext::setup().await;
        let user = context.create_user("user@example.com", Role::User).await;
        let admin = context.create_user("admin@example.com", Role::Admin).await;

        assert_eq!(user, context.driver().get_user(caller_for(&user), *user.id()).await.unwrap());
        assert_eq!(user, context.driver().get_user(caller_for(&admin), *user.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_user_other_forbidden() {
        let context = TestContext::setup().await;
        let user = context.create_user("user@example.com", Role::User).await;
        let other = context.create_user("other@example.com", Role::User).await;

        assert_eq!(
            DriverError::Forbidden("Cannot access another user's account".to_owned()),
            context.driver().get_user(caller_for(&user), *other.id()).await.unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let context = TestContext::setup().await;
        let admin = context.create_user("admin@example.com", Role::Admin).await;

        let id = UserId::generate();
        assert_eq!(
            DriverError::NotFound(format!("User {} not found", id)),
            context.driver().get_user(caller_for(&admin), id).await.unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_update_user_self() {
        let context = TestContext::setup().await;
        let user = context.create_user("user@example.com", Role::User).await;

        context.clock().advance(Duration::from_secs(60));
        let update = UserUpdate {
            name: Some(DisplayName::from("Renamed")),
            password: Some(Password::from("other0password")),
            document: Some(Document::new("11222333000181").unwrap()),
            ..Default::default()
        };
        let updated =
            context.driver().update_user(caller_for(&user), *user.id(), update).await.unwrap();

        assert_eq!("Renamed", updated.name().as_str());
        assert_eq!("11222333000181", updated.document().unwrap().as_str());
        assert_eq!(user.created_at(), updated.created_at());
        assert_eq!(user.created_at() + Duration::from_secs(60), updated.updated_at());
        assert_eq!(updated, db::get_user(&mut context.ex().await, user.id()).await.unwrap());

        context
            .driver()
            .login(EmailAddress::from("user@example.com"), Password::from("other0password"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_user_role_requires_admin() {
        let context = TestContext::setup().await;
        let user = context.create_user("user@example.com", Role::User).await;
        let admin = context.create_user("admin@example.com", Role::Admin).await;

        let update = UserUpdate { role: Some(Role::Admin), ..Default::default() };
        assert_eq!(
            DriverError::Forbidden("Only administrators can change roles".to_owned()),
            context.driver().update_user(caller_for(&user), *user.id(), update).await.unwrap_err()
        );

        let update = UserUpdate { role: Some(Role::User), ..Default::default() };
        context.driver().update_user(caller_for(&user), *user.id(), update).await.unwrap();

        let update = UserUpdate { role: Some(Role::Admin), ..Default::default() };
        let updated =
            context.driver().update_user(caller_for(&admin), *user.id(), update).await.unwrap();
        assert_eq!(Role::Admin, updated.role());
    }

    #[tokio::test]
    async fn test_update_user_email_taken() {
        let context = TestContext::setup().await;
        let user = context.create_user("user@example.com", Role::User).await;
        context.create_user("other@example.com", Role::User).await;

        let update = UserUpdate {
            email: Some(EmailAddress::from("other@example.com")),
            ..Default::default()
        };
        assert_eq!(
            DriverError::AlreadyExists("Email other@example.com is already registered".to_owned()),
            context.driver().update_user(caller_for(&user), *user.id(), update).await.unwrap_err()
        );
        assert_eq!(user, db::get_user(&mut context.ex().await, user.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_user_other_forbidden() {
        let context = TestContext::setup().await;
        let user = context.create_user("user@example.com", Role::User).await;
        let other = context.create_user("other@example.com", Role::User).await;

        assert_eq!(
            DriverError::Forbidden("Cannot access another user's account".to_owned()),
            context
                .driver()
                .update_user(caller_for(&user), *other.id(), UserUpdate::default())
                .await
                .unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_delete_user_ok() {
        let context = TestContext::setup().await;
        let user = context.create_user("user@example.com", Role::User).await;
        let admin = context.create_user("admin@example.com", Role::Admin).await;

        context.driver().delete_user(caller_for(&admin), *user.id()).await.unwrap();
        assert_eq!(
            DbError::NotFound,
            db::get_user(&mut context.ex().await, user.id()).await.unwrap_err()
        );

        assert_eq!(
            DriverError::NotFound(format!("User {} not found", user.id())),
            context.driver().delete_user(caller_for(&admin), *user.id()).await.unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_delete_user_restrictions() {
        let context = TestContext::setup().await;
        let user = context.create_user("user@example.com", Role::User).await;
        let admin = context.create_user("admin@example.com", Role::Admin).await;

        assert_eq!(
            DriverError::Forbidden("Only administrators can delete users".to_owned()),
            context.driver().delete_user(caller_for(&user), *user.id()).await.unwrap_err()
        );
        assert_eq!(
            DriverError::Forbidden("Administrators cannot delete their own account".to_owned()),
            context.driver().delete_user(caller_for(&admin), *admin.id()).await.unwrap_err()
        );
    }
}
