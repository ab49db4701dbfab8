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

//! The `DisplayName` data type.

use hexusers_core::model::{ModelError, ModelResult};
use serde::Serialize;

/// Maximum length of a display name, in characters.
pub(crate) const MAX_NAME_LENGTH: usize = 100;

/// Human-readable name of a user.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Creates a new name from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        let s = s.trim();

        if s.is_empty() {
            return Err(ModelError("Name cannot be empty".to_owned()));
        }
        if s.chars().count() > MAX_NAME_LENGTH {
            return Err(ModelError(format!(
                "Name cannot be longer than {} characters",
                MAX_NAME_LENGTH
            )));
        }
        if s.chars().any(char::is_control) {
            return Err(ModelError("Name cannot contain control characters".to_owned()));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns a string view of the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
impl From<&str> for DisplayName {
    fn from(s: &str) -> Self {
        Self::new(s).expect("Hardcoded names must be valid")
    }
}
