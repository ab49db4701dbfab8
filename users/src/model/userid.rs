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

//! The `UserId` data type.

use hexusers_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of a user.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generates a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the identifier as a UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for UserId {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        Uuid::parse_str(s).map(Self).map_err(|_| ModelError(format!("Invalid user id '{}'", s)))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_userid_parse_and_display() {
        let raw = "6f2c9b0e-4c5d-4f4a-9c1e-1a2b3c4d5e6f";
        let id = UserId::from_str(raw).unwrap();
        assert_eq!(raw, id.to_string());
    }

    #[test]
    fn test_userid_parse_error() {
        assert_eq!(
            ModelError("Invalid user id 'not-a-uuid'".to_owned()),
            UserId::from_str("not-a-uuid").unwrap_err()
        );
    }

    #[test]
    fn test_userid_generate_unique() {
        let ids: HashSet<UserId> = (0..100).map(|_| UserId::generate()).collect();
        assert_eq!(100, ids.len());
    }
}
