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

//! Entry point to the user management service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use hexusers::{ServiceOptions, serve};
use hexusers_core::db::Db;
use log::error;
use std::error::Error;
use std::process;
use std::sync::Arc;

/// Prefix of all environment variables that configure the service.
const ENV_PREFIX: &str = "HEXUSERS";

/// Connects to the production PostgreSQL database.
#[cfg(feature = "postgres")]
async fn connect_db() -> Result<Arc<dyn Db + Send + Sync>, Box<dyn Error>> {
    use hexusers_core::db::postgres::{PostgresDb, PostgresOptions};

    let opts = PostgresOptions::from_env("PGSQL_PROD")?;
    Ok(Arc::new(PostgresDb::connect(opts)?))
}

/// Connects to the SQLite database given in the environment, or to an in-memory one.
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
async fn connect_db() -> Result<Arc<dyn Db + Send + Sync>, Box<dyn Error>> {
    use hexusers_core::db::sqlite;
    use hexusers_core::env::get_optional_var;

    let url = get_optional_var::<String>(ENV_PREFIX, "DB_URL")?
        .unwrap_or_else(|| "sqlite::memory:".to_owned());
    Ok(Arc::new(sqlite::connect(&url).await?))
}

/// Gathers the configuration and runs the service until it is asked to stop.
async fn run() -> Result<(), Box<dyn Error>> {
    let opts = ServiceOptions::from_env(ENV_PREFIX)?;
    let db = connect_db().await?;
    serve(db, opts).await
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        error!("Service failed: {}", e);
        eprintln!("hexusers: {}", e);
        process::exit(1);
    }
}
