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

//! Database abstraction to manipulate users.

use crate::model::{DisplayName, Document, HashedPassword, Phone, Role, User, UserId};
#[cfg(feature = "postgres")]
use hexusers_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use hexusers_core::db::sqlite::{self, build_timestamp, unpack_timestamp};
use hexusers_core::db::{DbError, DbResult, Executor};
use hexusers_core::model::EmailAddress;
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
#[cfg(any(feature = "sqlite", test))]
use std::str::FromStr;
use time::OffsetDateTime;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Builds a `User` from the raw values of a row that are common to all database backends.
#[allow(clippy::too_many_arguments)]
fn build_user(
    id: UserId,
    name: String,
    email: String,
    password: String,
    role: String,
    phone: Option<String>,
    document: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
) -> DbResult<User> {
    let phone = phone.map(Phone::new).transpose()?;
    let document = document.map(Document::new).transpose()?;
    let role = role.parse::<Role>()?;
    Ok(User::new(
        id,
        DisplayName::new(name)?,
        EmailAddress::new(email)?,
        HashedPassword::new(password),
        role,
        created_at,
    )
    .with_phone(phone)
    .with_document(document)
    .with_updated_at(updated_at))
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for User {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: uuid::Uuid = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(postgres::map_sqlx_error)?;
        let role: String = row.try_get("role").map_err(postgres::map_sqlx_error)?;
        let phone: Option<String> = row.try_get("phone").map_err(postgres::map_sqlx_error)?;
        let document: Option<String> =
            row.try_get("document").map_err(postgres::map_sqlx_error)?;
        let created_at: OffsetDateTime =
            row.try_get("created_at").map_err(postgres::map_sqlx_error)?;
        let updated_at: OffsetDateTime =
            row.try_get("updated_at").map_err(postgres::map_sqlx_error)?;

        build_user(
            UserId::from(id),
            name,
            email,
            password,
            role,
            phone,
            document,
            created_at,
            updated_at,
        )
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for User {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: String = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(sqlite::map_sqlx_error)?;
        let role: String = row.try_get("role").map_err(sqlite::map_sqlx_error)?;
        let phone: Option<String> = row.try_get("phone").map_err(sqlite::map_sqlx_error)?;
        let document: Option<String> = row.try_get("document").map_err(sqlite::map_sqlx_error)?;
        let created_at_secs: i64 =
            row.try_get("created_at_secs").map_err(sqlite::map_sqlx_error)?;
        let created_at_nsecs: i64 =
            row.try_get("created_at_nsecs").map_err(sqlite::map_sqlx_error)?;
        let updated_at_secs: i64 =
            row.try_get("updated_at_secs").map_err(sqlite::map_sqlx_error)?;
        let updated_at_nsecs: i64 =
            row.try_get("updated_at_nsecs").map_err(sqlite::map_sqlx_error)?;

        build_user(
            UserId::from_str(&id)?,
            name,
            email,
            password,
            role,
            phone,
            document,
            build_timestamp(created_at_secs, created_at_nsecs)?,
            build_timestamp(updated_at_secs, updated_at_nsecs)?,
        )
    }
}

/// Converts a row count returned by the database into an unsigned number.
fn count_to_u64(count: i64) -> DbResult<u64> {
    u64::try_from(count)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid row count {}: {}", count, e)))
}

/// Persists a new `user`.
///
/// Fails with `AlreadyExists` if the user's identifier or email address are already in use.
pub async fn create_user(ex: &mut Executor, user: &User) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO users
                    (id, name, email, password, role, phone, document, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";
            let done = sqlx::query(query_str)
                .bind(user.id().as_uuid())
                .bind(user.name().as_str())
                .bind(user.email().as_str())
                .bind(user.password().as_str())
                .bind(user.role().as_str())
                .bind(user.phone().map(Phone::as_str))
                .bind(user.document().map(Document::as_str))
                .bind(user.created_at())
                .bind(user.updated_at())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (created_at_secs, created_at_nsecs) = unpack_timestamp(user.created_at())?;
            let (updated_at_secs, updated_at_nsecs) = unpack_timestamp(user.updated_at())?;

            let query_str = "
                INSERT INTO users (
                    id, name, email, password, role, phone, document,
                    created_at_secs, created_at_nsecs, updated_at_secs, updated_at_nsecs
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(user.id().to_string())
                .bind(user.name().as_str())
                .bind(user.email().as_str())
                .bind(user.password().as_str())
                .bind(user.role().as_str())
                .bind(user.phone().map(Phone::as_str))
                .bind(user.document().map(Document::as_str))
                .bind(created_at_secs)
                .bind(created_at_nsecs)
                .bind(updated_at_secs)
                .bind(updated_at_nsecs)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected != 1 {
        return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
    }
    Ok(())
}

/// Gets information about an existing user identified by `id`.
pub async fn get_user(ex: &mut Executor, id: &UserId) -> DbResult<User> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users WHERE id = $1";
            let raw_user = sqlx::query(query_str)
                .bind(id.as_uuid())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM users WHERE id = ?";
            let raw_user = sqlx::query(query_str)
                .bind(id.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets information about an existing user that owns the `email` address.
pub async fn get_user_by_email(ex: &mut Executor, email: &EmailAddress) -> DbResult<User> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users WHERE email = $1";
            let raw_user = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM users WHERE email = ?";
            let raw_user = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets a page of at most `limit` users starting at position `offset`, sorted by creation time.
pub async fn list_users(ex: &mut Executor, limit: u32, offset: u32) -> DbResult<Vec<User>> {
    let mut users = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2";
            let rows = sqlx::query(query_str)
                .bind(i64::from(limit))
                .bind(i64::from(offset))
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            for row in rows {
                users.push(User::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT * FROM users
                ORDER BY created_at_secs, created_at_nsecs, id
                LIMIT ? OFFSET ?";
            let rows = sqlx::query(query_str)
                .bind(i64::from(limit))
                .bind(i64::from(offset))
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            for row in rows {
                users.push(User::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(users)
}

/// Counts the number of users in the database.
pub async fn count_users(ex: &mut Executor) -> DbResult<u64> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    count_to_u64(count)
}

/// Replaces all mutable fields of the stored user with the values in `user`.
pub async fn update_user(ex: &mut Executor, user: &User) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE users
                SET
                    name = $1, email = $2, password = $3, role = $4, phone = $5,
                    document = $6, updated_at = $7
                WHERE id = $8";
            let done = sqlx::query(query_str)
                .bind(user.name().as_str())
                .bind(user.email().as_str())
                .bind(user.password().as_str())
                .bind(user.role().as_str())
                .bind(user.phone().map(Phone::as_str))
                .bind(user.document().map(Document::as_str))
                .bind(user.updated_at())
                .bind(user.id().as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (updated_at_secs, updated_at_nsecs) = unpack_timestamp(user.updated_at())?;

            let query_str = "
                UPDATE users
                SET
                    name = ?, email = ?, password = ?, role = ?, phone = ?, document = ?,
                    updated_at_secs = ?, updated_at_nsecs = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(user.name().as_str())
                .bind(user.email().as_str())
                .bind(user.password().as_str())
                .bind(user.role().as_str())
                .bind(user.phone().map(Phone::as_str))
                .bind(user.document().map(Document::as_str))
                .bind(updated_at_secs)
                .bind(updated_at_nsecs)
                .bind(user.id().to_string())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the user identified by `id`.
pub async fn delete_user(ex: &mut Executor, id: &UserId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id.to_string())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Delete affected more than one row".to_owned())),
    }
}
