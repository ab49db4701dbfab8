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

//! Per-client request rate limiting.
//!
//! The `RateLimiter` keeps, for every client, the timestamps of the requests it accepted during
//! the trailing window and refuses new requests once the client reaches its quota.  It is meant
//! to be created once at startup, shared behind an `Arc` and plugged into the HTTP layer via the
//! middleware in the `rest` module.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

mod client;
pub use client::ClientId;
mod limiter;
pub use limiter::RateLimiter;
mod options;
pub use options::RateLimitOptions;
pub mod rest;
