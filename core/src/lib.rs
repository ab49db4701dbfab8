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

//! Shared plumbing for the layers of the user management service.
//!
//! The service is split into layers that only talk to their immediate neighbors, and every
//! service crate in this workspace should define the same modules:
//!
//! 1.  `model`: High-level data types that represent concepts in the domain of the application.
//!     There should be no logic in here beyond input validation.  Newtypes are used to make
//!     invalid values unrepresentable once constructed.
//!
//! 1.  `db`: The persistence adapter.  Services provide free functions that take an `Executor`
//!     and issue queries against whichever database backend the executor wraps.
//!
//! 1.  `driver`: The use cases.  Services provide their own `Driver` type that holds the
//!     in-memory state needed by the app and coordinates access to the database.
//!
//! 1.  `rest`: The HTTP adapter.  Services provide an `axum::Router` and back every API with
//!     their `Driver`.
//!
//! 1.  `main`: The launcher.  Its sole purpose is to gather configuration from environment
//!     variables and hand it to the `serve` function of the service.
//!
//! Every layer has its own result and error types, such as `DbResult` and `DbError`.  Errors
//! float to the top of the app with the `?` operator and are translated to HTTP status codes
//! once they leave the REST layer.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod clocks;
pub mod db;
pub mod driver;
pub mod env;
pub mod model;
pub mod rest;
