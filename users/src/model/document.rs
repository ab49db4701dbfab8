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

//! The `Document` data type.

use hexusers_core::model::{ModelError, ModelResult};
use serde::{Serialize, Serializer};

/// Check digit weights for the first CNPJ check digit.  The second digit uses a 6 prepended to
/// this same sequence.
const CNPJ_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// A Brazilian taxpayer document: CPF for individuals and CNPJ for companies.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    /// Individual taxpayer registry, 11 digits.
    Cpf(String),

    /// Company taxpayer registry, 14 digits.
    Cnpj(String),
}

/// Computes a CPF check digit over `digits` with weights descending from `digits.len() + 1`.
fn cpf_check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits.iter().zip((2..=top).rev()).map(|(d, w)| d * w).sum();
    match (sum * 10) % 11 {
        10 => 0,
        r => r,
    }
}

/// Computes a CNPJ check digit over `digits`, which must have 12 or 13 entries.
fn cnpj_check_digit(digits: &[u32]) -> u32 {
    let weights = &CNPJ_WEIGHTS[CNPJ_WEIGHTS.len() - digits.len()..];
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

/// Rejects documents made of a single repeated digit, which pass the check digit validation.
fn check_not_repeated(digits: &[u32]) -> ModelResult<()> {
    if digits.windows(2).all(|pair| pair[0] == pair[1]) {
        return Err(ModelError("Document cannot be a repeated sequence".to_owned()));
    }
    Ok(())
}

impl Document {
    /// Creates a new document from an untrusted string `s`, making sure its check digits are
    /// correct.  The type of document is determined by its number of digits.
    pub fn new<S: AsRef<str>>(s: S) -> ModelResult<Self> {
        let mut digits = vec![];
        for ch in s.as_ref().chars() {
            match ch.to_digit(10) {
                Some(d) => digits.push(d),
                None if matches!(ch, '.' | '-' | '/' | ' ') => (),
                None => {
                    return Err(ModelError(format!(
                        "Document contains invalid character '{}'",
                        ch
                    )));
                }
            }
        }

        let text: String = digits.iter().filter_map(|d| char::from_digit(*d, 10)).collect();
        match digits.len() {
            11 => {
                check_not_repeated(&digits)?;
                if cpf_check_digit(&digits[0..9]) != digits[9]
                    || cpf_check_digit(&digits[0..10]) != digits[10]
                {
                    return Err(ModelError("Invalid CPF check digits".to_owned()));
                }
                Ok(Document::Cpf(text))
            }
            14 => {
                check_not_repeated(&digits)?;
                if cnpj_check_digit(&digits[0..12]) != digits[12]
                    || cnpj_check_digit(&digits[0..13]) != digits[13]
                {
                    return Err(ModelError("Invalid CNPJ check digits".to_owned()));
                }
                Ok(Document::Cnpj(text))
            }
            _ => Err(ModelError(
                "Document must be a CPF (11 digits) or CNPJ (14 digits)".to_owned(),
            )),
        }
    }

    /// Returns the digits of the document.
    pub fn as_str(&self) -> &str {
        match self {
            Document::Cpf(s) => s,
            Document::Cnpj(s) => s,
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Token, assert_ser_tokens};

    #[test]
    fn test_document_cpf_ok() {
        let exp = Document::Cpf("52998224725".to_owned());
        assert_eq!(exp, Document::new("529.982.247-25").unwrap());
        assert_eq!(exp, Document::new("52998224725").unwrap());
    }

    #[test]
    fn test_document_cnpj_ok() {
        assert_eq!(
            Document::Cnpj("11222333000181".to_owned()),
            Document::new("11.222.333/0001-81").unwrap()
        );
    }

    #[test]
    fn test_document_bad_check_digits() {
        assert_eq!(
            ModelError("Invalid CPF check digits".to_owned()),
            Document::new("529.982.247-26").unwrap_err()
        );
        assert_eq!(
            ModelError("Invalid CPF check digits".to_owned()),
            Document::new("529.982.247-35").unwrap_err()
        );
        assert_eq!(
            ModelError("Invalid CNPJ check digits".to_owned()),
            Document::new("11.222.333/0001-82").unwrap_err()
        );
    }

    #[test]
    fn test_document_repeated_digits() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert_eq!(
                ModelError("Document cannot be a repeated sequence".to_owned()),
                Document::new(cpf).unwrap_err()
            );
        }
        assert!(Document::new("00000000000000").is_err());
    }

    #[test]
    fn test_document_bad_shape() {
        let exp = ModelError("Document must be a CPF (11 digits) or CNPJ (14 digits)".to_owned());
        assert_eq!(exp, Document::new("1234567890").unwrap_err());
        assert_eq!(exp, Document::new("529.982.247-251").unwrap_err());
        assert_eq!(exp, Document::new("11.222.333/0001-811").unwrap_err());
        assert_eq!(exp, Document::new("").unwrap_err());
        assert_eq!(exp, Document::new("1111111111").unwrap_err());
        assert_eq!(
            ModelError("Document contains invalid character 'x'".to_owned()),
            Document::new("123.456.789-0x").unwrap_err()
        );
    }

    #[test]
    fn test_document_ser() {
        assert_ser_tokens(&Document::new("52998224725").unwrap(), &[Token::Str("52998224725")]);
    }
}
