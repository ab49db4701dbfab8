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

//! Operations on the collection of users.

use crate::db;
use crate::driver::UsersDriver;
use crate::model::{Caller, NewUser, Role, User, UserId};
use hexusers_core::db::DbError;
use hexusers_core::driver::{DriverError, DriverResult};
use log::info;

/// Number of users returned per page when the caller does not specify a limit.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Maximum number of users that can be requested in a single page.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Window into the list of users.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Page {
    /// Maximum number of users to return.
    limit: u32,

    /// Number of users to skip from the start of the list.
    offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: DEFAULT_PAGE_LIMIT, offset: 0 }
    }
}

impl Page {
    /// Creates a new page from untrusted values, using the defaults for missing values.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> DriverResult<Self> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(DriverError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        Ok(Self { limit, offset: offset.unwrap_or(0) })
    }

    /// Gets the maximum number of users in the page.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Gets the position of the first user in the page.
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

/// A page of users along with the information needed to fetch more.
#[derive(Debug)]
pub struct UsersPage {
    /// Users in this page, sorted by creation time.
    pub users: Vec<User>,

    /// Total number of users that exist.
    pub total: u64,

    /// The window used to compute this page.
    pub page: Page,
}

impl UsersDriver {
    /// Creates a new user on behalf of `caller`, which is `None` for anonymous sign ups.
    ///
    /// Only administrators can create other administrators.
    pub async fn create_user(
        self,
        caller: Option<Caller>,
        new_user: NewUser,
    ) -> DriverResult<User> {
        let is_admin = caller.as_ref().is_some_and(Caller::is_admin);
        if new_user.role == Some(Role::Admin) && !is_admin {
            return Err(DriverError::Forbidden(
                "Only administrators can create administrators".to_owned(),
            ));
        }

        let now = self.clock.now_utc();
        let user = new_user.into_user(UserId::generate(), now)?;

        let mut tx = self.db.begin().await?;
        match db::create_user(tx.ex(), &user).await {
            Ok(()) => (),
            Err(DbError::AlreadyExists) => {
                return Err(DriverError::AlreadyExists(format!(
                    "Email {} is already registered",
                    user.email().as_str()
                )));
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;

        info!("Created user {} with role {}", user.id(), user.role());
        Ok(user)
    }

    /// Lists a `page` of users.  Only administrators can list users.
    pub async fn list_users(self, caller: Caller, page: Page) -> DriverResult<UsersPage> {
        if !caller.is_admin() {
            return Err(DriverError::Forbidden("Only administrators can list users".to_owned()));
        }

        let mut tx = self.db.begin().await?;
        let total = db::count_users(tx.ex()).await?;
        let users = db::list_users(tx.ex(), page.limit, page.offset).await?;
        tx.commit().await?;

        Ok(UsersPage { users, total, page })
    }
}
