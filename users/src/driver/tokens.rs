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

//! Issuance and verification of signed access tokens.

use crate::driver::{TokenOptions, UsersDriver};
use crate::model::{AccessToken, Claims, User};
use hexusers_core::driver::{DriverError, DriverResult};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use time::OffsetDateTime;

/// Signing algorithm for all access tokens.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Precomputed keys and validation rules derived from the `TokenOptions`.
pub(super) struct TokenKeys {
    /// Key to sign new tokens with.
    encoding: EncodingKey,

    /// Key to verify token signatures with.
    decoding: DecodingKey,

    /// Rules to validate decoded tokens.
    validation: Validation,
}

impl TokenKeys {
    /// Derives the keys for the secret and issuer in `opts`.
    pub(super) fn new(opts: &TokenOptions) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiration is checked against the driver's clock, not the system time.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        validation.set_issuer(&[&opts.issuer]);

        Self {
            encoding: EncodingKey::from_secret(opts.secret.as_bytes()),
            decoding: DecodingKey::from_secret(opts.secret.as_bytes()),
            validation,
        }
    }
}

impl UsersDriver {
    /// Issues a new access token for `user` valid from `now` until the configured TTL elapses.
    pub(super) fn issue_token(
        &self,
        user: &User,
        now: OffsetDateTime,
    ) -> DriverResult<AccessToken> {
        let iat = now.unix_timestamp();
        let ttl = i64::try_from(self.opts.ttl.as_secs())
            .map_err(|e| DriverError::BackendError(format!("Invalid token TTL: {}", e)))?;
        let claims = Claims {
            sub: user.id().to_string(),
            role: user.role(),
            iss: self.opts.issuer.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        };

        let token = jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.tokens.encoding)
            .map_err(|e| DriverError::BackendError(format!("Cannot sign access token: {}", e)))?;
        Ok(AccessToken::new(token)?)
    }

    /// Verifies the signature and issuer of `token` and checks that it has not expired at `now`.
    pub(super) fn decode_token(
        &self,
        token: &AccessToken,
        now: OffsetDateTime,
    ) -> DriverResult<Claims> {
        let data = jsonwebtoken::decode::<Claims>(
            token.as_str(),
            &self.tokens.decoding,
            &self.tokens.validation,
        )
        .map_err(|e| {
            debug!("Rejecting access token: {}", e);
            DriverError::Unauthorized("Invalid access token".to_owned())
        })?;

        let claims = data.claims;
        if now.unix_timestamp() >= claims.exp {
            return Err(DriverError::Unauthorized("Access token has expired".to_owned()));
        }
        Ok(claims)
    }
}
