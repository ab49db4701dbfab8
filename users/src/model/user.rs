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

//! The `User` data type.

use crate::model::{
    DisplayName, Document, HashedPassword, Password, Phone, Role, UserId, password_validator,
};
use hexusers_core::model::{EmailAddress, ModelResult};
use time::OffsetDateTime;

/// Representation of a user's information.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// Unique identifier of the user.
    id: UserId,

    /// Human-readable name of the user.
    name: DisplayName,

    /// Email of the user, which is unique across all users and used to log in.
    email: EmailAddress,

    /// Hashed password.
    password: HashedPassword,

    /// Authorization level of the user.
    role: Role,

    /// Optional contact phone.
    phone: Option<Phone>,

    /// Optional taxpayer document.
    document: Option<Document>,

    /// Time when the user was created.
    created_at: OffsetDateTime,

    /// Time when the user was last modified.
    updated_at: OffsetDateTime,
}

impl User {
    /// Creates a new user with the given fields, created and last modified at `now`.
    pub fn new(
        id: UserId,
        name: DisplayName,
        email: EmailAddress,
        password: HashedPassword,
        role: Role,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            name,
            email,
            password,
            role,
            phone: None,
            document: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Modifies a user to set its phone number.
    pub fn with_phone(mut self, phone: Option<Phone>) -> Self {
        self.phone = phone;
        self
    }

    /// Modifies a user to set its taxpayer document.
    pub fn with_document(mut self, document: Option<Document>) -> Self {
        self.document = document;
        self
    }

    /// Modifies a user to record its last modification time.
    pub fn with_updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Applies all the fields set in `update` to this user and records `now` as the time of the
    /// modification.  A new password, if any, is validated and hashed before being stored.
    pub fn apply(mut self, update: UserUpdate, now: OffsetDateTime) -> ModelResult<Self> {
        if let Some(password) = update.password {
            self.password = password.validate_and_hash(password_validator)?;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }
        if let Some(document) = update.document {
            self.document = Some(document);
        }
        self.updated_at = now;
        Ok(self)
    }

    /// Gets the user's identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Gets the user's display name.
    pub fn name(&self) -> &DisplayName {
        &self.name
    }

    /// Gets the user's email address.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Gets the user's password as a hash.
    pub fn password(&self) -> &HashedPassword {
        &self.password
    }

    /// Gets the user's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Gets the user's phone number, if any.
    pub fn phone(&self) -> Option<&Phone> {
        self.phone.as_ref()
    }

    /// Gets the user's taxpayer document, if any.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Gets the user's creation time.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Gets the user's last modification time.
    pub fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }
}

/// Details of a user to be created.
#[derive(Debug)]
pub struct NewUser {
    /// Display name of the new user.
    pub name: DisplayName,

    /// Email address of the new user.
    pub email: EmailAddress,

    /// Password in plain text, not yet validated against the password policy.
    pub password: Password,

    /// Requested role, or `None` for the default role.
    pub role: Option<Role>,

    /// Optional contact phone.
    pub phone: Option<Phone>,

    /// Optional taxpayer document.
    pub document: Option<Document>,
}

impl NewUser {
    /// Converts the new user details into a `User` identified by `id` and created at `now`.
    ///
    /// This validates the password against the password policy and hashes it.
    pub fn into_user(self, id: UserId, now: OffsetDateTime) -> ModelResult<User> {
        let password = self.password.validate_and_hash(password_validator)?;
        Ok(User::new(id, self.name, self.email, password, self.role.unwrap_or_default(), now)
            .with_phone(self.phone)
            .with_document(self.document))
    }
}

/// Set of modifications to apply to an existing user.  Fields set to `None` are left untouched.
#[derive(Debug, Default)]
pub struct UserUpdate {
    /// New display name.
    pub name: Option<DisplayName>,

    /// New email address.
    pub email: Option<EmailAddress>,

    /// New password in plain text.
    pub password: Option<Password>,

    /// New role.
    pub role: Option<Role>,

    /// New phone number.
    pub phone: Option<Phone>,

    /// New taxpayer document.
    pub document: Option<Document>,
}
