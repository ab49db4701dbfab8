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

//! The `Phone` data type.

use hexusers_core::model::{ModelError, ModelResult};
use serde::Serialize;

/// A Brazilian phone number, stored as its area code followed by the subscriber number.
///
/// Input may contain the usual punctuation (spaces, dots, dashes and parenthesis) but only the
/// digits are kept.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Creates a new phone number from an untrusted string `s`, making sure it is valid.
    pub fn new<S: AsRef<str>>(s: S) -> ModelResult<Self> {
        let mut digits = String::new();
        for ch in s.as_ref().chars() {
            match ch {
                '0'..='9' => digits.push(ch),
                ' ' | '.' | '-' | '(' | ')' => (),
                _ => {
                    return Err(ModelError(format!(
                        "Phone number contains invalid character '{}'",
                        ch
                    )));
                }
            }
        }

        if digits.len() != 10 && digits.len() != 11 {
            return Err(ModelError("Phone number must have 10 or 11 digits".to_owned()));
        }

        let area_code: u8 = digits[0..2].parse().map_err(|_| invalid_area_code(&digits))?;
        if !(11..=99).contains(&area_code) || area_code % 10 == 0 {
            return Err(invalid_area_code(&digits));
        }

        if digits.len() == 11 && !digits[2..].starts_with('9') {
            return Err(ModelError("Mobile phone numbers must start with 9".to_owned()));
        }

        Ok(Self(digits))
    }

    /// Returns the digits of the phone number.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is a mobile phone number.
    pub fn is_mobile(&self) -> bool {
        self.0.len() == 11
    }
}

/// Builds the error for a phone number with an invalid area code.
fn invalid_area_code(digits: &str) -> ModelError {
    ModelError(format!("Invalid area code in phone number {}", digits))
}
