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

//! REST interface for the user management service.

use crate::driver::UsersDriver;
use crate::model::{Role, User, UserId};
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use hexusers_core::rest::{RestError, log_request};
use hexusers_ratelimit::rest::{
    LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER, RateLimitState, rate_limit,
};
use log::error;
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use std::any::Any;
use time::OffsetDateTime;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};

mod auth;
mod health_get;
mod health_ready_get;
mod httputils;
mod login_post;
#[cfg(test)]
mod testutils;
mod user_delete;
mod user_get;
mod user_put;
mod users_get;
mod users_me_get;
mod users_post;

/// Public representation of a user.  Never includes the password hash.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize, PartialEq))]
pub(crate) struct UserResponse {
    /// Identifier of the user.
    pub(crate) id: UserId,

    /// Display name of the user.
    pub(crate) name: String,

    /// Email address of the user.
    pub(crate) email: String,

    /// Role of the user.
    pub(crate) role: Role,

    /// Phone number of the user, as digits only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(test, serde(default))]
    pub(crate) phone: Option<String>,

    /// Taxpayer document of the user, as digits only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(test, serde(default))]
    pub(crate) document: Option<String>,

    /// Creation time of the user.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,

    /// Last modification time of the user.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) updated_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: *user.id(),
            name: user.name().as_str().to_owned(),
            email: user.email().as_str().to_owned(),
            role: user.role(),
            phone: user.phone().map(|p| p.as_str().to_owned()),
            document: user.document().map(|d| d.as_str().to_owned()),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

/// Parses a user identifier received in a request path.
fn parse_user_id(raw: &str) -> Result<UserId, RestError> {
    Ok(raw.parse::<UserId>()?)
}

/// Converts a panic raised by a handler into an internal error response.
fn handle_panic(details: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = details.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = details.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!("Request handler panicked: {}", message);
    RestError::InternalError("Internal server error".to_owned()).into_response()
}

/// Builds the CORS policy for the service.
///
/// `origins` is a comma-separated list of allowed origins, or `None` to allow any origin.
pub(crate) fn cors_layer(origins: Option<&str>) -> Result<CorsLayer, String> {
    let allow_origin = match origins {
        None => AllowOrigin::from(AnyOrigin),
        Some(origins) => {
            let mut values = vec![];
            for origin in origins.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                let value = HeaderValue::from_str(origin)
                    .map_err(|e| format!("Invalid CORS origin '{}': {}", origin, e))?;
                values.push(value);
            }
            if values.is_empty() {
                return Err("CORS origins list cannot be empty".to_owned());
            }
            AllowOrigin::list(values)
        }
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::RETRY_AFTER, LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER]))
}

/// Creates the router for the application.
///
/// Requests flow through panic recovery, request logging, CORS, authentication, rate limiting
/// and the rejection of bad credentials, in this order, before reaching the handlers.  Requests
/// with bad credentials are thus accounted against the quota of their peer.
pub(crate) fn app(
    driver: UsersDriver,
    rate_limit_state: RateLimitState,
    cors: CorsLayer,
) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/health", get(health_get::handler))
        .route("/health/ready", get(health_ready_get::handler))
        .route("/auth/login", post(login_post::handler))
        .route("/users", get(users_get::handler).post(users_post::handler))
        .route("/users/me", get(users_me_get::handler))
        .route(
            "/users/:id",
            get(user_get::handler).put(user_put::handler).delete(user_delete::handler),
        )
        .with_state(driver.clone());

    Router::new()
        .nest("/api/v1", api)
        .layer(from_fn(auth::reject_unauthenticated))
        .layer(from_fn_with_state(rate_limit_state, rate_limit))
        .layer(from_fn_with_state(driver, auth::authenticate))
        .layer(cors)
        .layer(from_fn(log_request))
        .layer(CatchPanicLayer::custom(handle_panic))
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use super::*;
    use crate::rest::login_post::LoginResponse;
    use axum::http::StatusCode;
    use hexusers_core::rest::testutils::OneShotBuilder;
    use serde_json::json;

    #[test]
    fn test_user_response_hides_password() {
        let user = User::new(
            UserId::generate(),
            crate::model::DisplayName::from("Jane"),
            hexusers_core::model::EmailAddress::from("jane@example.com"),
            crate::model::HashedPassword::new("$2b$04$secret-hash"),
            Role::User,
            time::macros::datetime!(2024-01-02 03:04:05 UTC),
        );
        let json = serde_json::to_value(UserResponse::from(user.clone())).unwrap();
        assert_eq!(
            json!({
                "id": user.id().to_string(),
                "name": "Jane",
                "email": "jane@example.com",
                "role": "user",
                "created_at": "2024-01-02T03:04:05Z",
                "updated_at": "2024-01-02T03:04:05Z",
            }),
            json
        );
        assert!(!json.to_string().contains("secret-hash"));
    }

    #[test]
    fn test_cors_layer() {
        cors_layer(None).unwrap();
        cors_layer(Some("https://a.example.com, https://b.example.com")).unwrap();
        assert_eq!("CORS origins list cannot be empty", cors_layer(Some(" , ")).unwrap_err());
        assert!(cors_layer(Some("bad\norigin")).unwrap_err().contains("Invalid CORS origin"));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), (Method::OPTIONS, "/api/v1/users"))
            .with_header(header::ORIGIN, "https://app.example.com")
            .with_header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .send_empty()
            .await
            .take_response()
            .await;
        assert_eq!(
            "*",
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap().to_str().unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected_everywhere() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/health"))
            .with_bearer_auth("not-a-real-token")
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_header("www-authenticate", "Bearer realm=\"hexusers\"")
            .expect_error("Invalid access token")
            .await;
    }

    #[tokio::test]
    async fn test_rate_limit_by_user_and_peer() {
        let context = TestContext::setup_with_limit(2).await;
        context.create_user("a@example.com", Role::User).await;
        let token = context.login("a@example.com").await;
        let peer = "192.0.2.10:5000".parse().unwrap();

        for _ in 0..2 {
            OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/users/me"))
                .with_bearer_auth(token.as_str())
                .with_peer(peer)
                .send_empty()
                .await
                .expect_json::<UserResponse>()
                .await;
        }
        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/users/me"))
            .with_bearer_auth(token.as_str())
            .with_peer(peer)
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_header("retry-after", "60")
            .expect_header("x-ratelimit-remaining", "0")
            .expect_error("Too many requests")
            .await;

        // The same peer without credentials is accounted separately from the user.
        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/health"))
            .with_peer(peer)
            .send_empty()
            .await
            .expect_header("x-ratelimit-limit", "2")
            .expect_header("x-ratelimit-remaining", "1")
            .verify();
    }

    #[tokio::test]
    async fn test_bad_credentials_count_against_peer_quota() {
        let context = TestContext::setup_with_limit(2).await;
        let (_, token) = context.create_and_login("a@example.com", Role::User).await;
        let peer = "192.0.2.10:5000".parse().unwrap();

        for exp_remaining in ["1", "0"] {
            OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/health"))
                .with_bearer_auth("garbage.token.value")
                .with_peer(peer)
                .send_empty()
                .await
                .expect_status(StatusCode::UNAUTHORIZED)
                .expect_header("x-ratelimit-remaining", exp_remaining)
                .expect_error("Invalid access token")
                .await;
        }
        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/health"))
            .with_bearer_auth("garbage.token.value")
            .with_peer(peer)
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_error("Too many requests")
            .await;

        // Malformed headers are accounted the same way.
        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/health"))
            .with_header(header::AUTHORIZATION, "Basic foo")
            .with_peer(peer)
            .send_empty()
            .await
            .expect_status(StatusCode::TOO_MANY_REQUESTS)
            .expect_error("Too many requests")
            .await;

        // A valid user behind the same peer keeps its own quota.
        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/users/me"))
            .with_bearer_auth(token.as_str())
            .with_peer(peer)
            .send_empty()
            .await
            .expect_json::<UserResponse>()
            .await;
    }

    #[tokio::test]
    async fn test_handler_panic_is_internal_error() {
        let app = Router::new()
            .route("/panic", axum::routing::get(|| async { let r: () = panic!("boom"); #[allow(unreachable_code)] r }))
            .layer(CatchPanicLayer::custom(handle_panic));

        OneShotBuilder::new(app, (Method::GET, "/panic"))
            .send_empty()
            .await
            .expect_status(StatusCode::INTERNAL_SERVER_ERROR)
            .expect_error("Internal server error")
            .await;
    }

    #[tokio::test]
    async fn test_e2e_user_lifecycle() {
        let context = TestContext::setup().await;
        context.create_user("admin@example.com", Role::Admin).await;
        let admin_token = context.login("admin@example.com").await;

        let created = OneShotBuilder::new(context.app(), (Method::POST, "/api/v1/users"))
            .send_json(json!({
                "name": "Jane Doe",
                "email": "Jane@Example.com",
                "password": "jane0password",
                "phone": "(21) 98888-7777",
            }))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<UserResponse>()
            .await;
        assert_eq!("jane@example.com", created.email);
        assert_eq!(Role::User, created.role);

        let login = OneShotBuilder::new(context.app(), (Method::POST, "/api/v1/auth/login"))
            .send_json(json!({"email": "jane@example.com", "password": "jane0password"}))
            .await
            .expect_json::<LoginResponse>()
            .await;

        let me = OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/users/me"))
            .with_bearer_auth(login.access_token.as_str())
            .send_empty()
            .await
            .expect_json::<UserResponse>()
            .await;
        assert_eq!(created, me);

        let path = format!("/api/v1/users/{}", created.id);
        let updated = OneShotBuilder::new(context.app(), (Method::PUT, &path))
            .with_bearer_auth(login.access_token.as_str())
            .send_json(json!({"name": "Jane Smith"}))
            .await
            .expect_json::<UserResponse>()
            .await;
        assert_eq!("Jane Smith", updated.name);

        OneShotBuilder::new(context.app(), (Method::DELETE, &path))
            .with_bearer_auth(login.access_token.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::FORBIDDEN)
            .expect_error("Only administrators")
            .await;

        OneShotBuilder::new(context.app(), (Method::DELETE, &path))
            .with_bearer_auth(admin_token.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/users/me"))
            .with_bearer_auth(login.access_token.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("Invalid access token")
            .await;
    }
}
