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

//! Test utilities for the business logic.

use crate::db;
use crate::driver::{TokenOptions, UsersDriver};
use crate::model::{AccessToken, Caller, DisplayName, NewUser, Password, Role, User, UserId};
use hexusers_core::clocks::Clock;
use hexusers_core::clocks::testutils::SettableClock;
use hexusers_core::db::{Db, Executor};
use hexusers_core::model::EmailAddress;
use std::sync::Arc;
use std::time::Duration;
use time::macros::datetime;

/// Password assigned to all users created via `TestContext::create_user`.
pub(crate) const TEST_PASSWORD: &str = "test0password";

/// Returns token options suitable for tests.
pub(crate) fn test_token_options() -> TokenOptions {
    TokenOptions {
        secret: "test-secret-0123456789".to_owned(),
        ttl: Duration::from_secs(3600),
        issuer: "hexusers-tests".to_owned(),
    }
}

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock backing the driver, which tests can move at will.
    clock: Arc<SettableClock>,

    /// The driver under test.
    driver: UsersDriver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and a settable clock.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> =
            Arc::new(hexusers_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();

        let clock = Arc::new(SettableClock::new(datetime!(2024-06-01 12:00:00 UTC)));
        let driver = UsersDriver::new(db.clone(), clock.clone(), test_token_options());
        Self { db, clock, driver }
    }

    /// Gets access to the database used by this test context.
    pub(crate) fn db(&self) -> &dyn Db {
        self.db.as_ref()
    }

    /// Gets a shareable reference to the database used by this test context.
    pub(crate) fn db_arc(&self) -> Arc<dyn Db + Send + Sync> {
        self.db.clone()
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Gets the clock used by the driver.
    pub(crate) fn clock(&self) -> &SettableClock {
        &self.clock
    }

    /// Gets a shareable reference to the clock used by the driver.
    pub(crate) fn clock_arc(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> UsersDriver {
        self.driver.clone()
    }

    /// Syntactic sugar to insert a user with `email` and `role` directly into the database.
    ///
    /// The user's password is `TEST_PASSWORD`.
    pub(crate) async fn create_user(&self, email: &str, role: Role) -> User {
        let new_user = NewUser {
            name: DisplayName::from("Test User"),
            email: EmailAddress::from(email),
            password: Password::from(TEST_PASSWORD),
            role: Some(role),
            phone: None,
            document: None,
        };
        let user = new_user.into_user(UserId::generate(), self.clock.now_utc()).unwrap();
        db::create_user(&mut self.ex().await, &user).await.unwrap();
        user
    }

    /// Syntactic sugar to log in a user previously created with `create_user`.
    pub(crate) async fn login(&self, email: &str) -> AccessToken {
        self.driver()
            .login(EmailAddress::from(email), Password::from(TEST_PASSWORD))
            .await
            .unwrap()
    }
}

/// Builds the `Caller` that represents `user` issuing a request.
pub(crate) fn caller_for(user: &User) -> Caller {
    Caller::new(*user.id(), user.role())
}
