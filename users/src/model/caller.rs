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

//! The `Caller` data type.

use crate::model::{Role, UserId};

/// Identity of the authenticated user issuing a request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Caller {
    /// Identifier of the user.
    user_id: UserId,

    /// Role of the user at the time the request was authenticated.
    role: Role,
}

impl Caller {
    /// Creates a new caller for `user_id` acting with `role`.
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Gets the identifier of the caller.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Gets the role of the caller.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns true if the caller has administrative privileges.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns true if the caller can view or modify the account of `user_id`.
    pub fn can_access(&self, user_id: &UserId) -> bool {
        self.is_admin() || self.user_id == *user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_access() {
        let me = UserId::generate();
        let other = UserId::generate();

        let user = Caller::new(me, Role::User);
        assert!(!user.is_admin());
        assert!(user.can_access(&me));
        assert!(!user.can_access(&other));

        let admin = Caller::new(me, Role::Admin);
        assert!(admin.is_admin());
        assert!(admin.can_access(&me));
        assert!(admin.can_access(&other));
    }
}
