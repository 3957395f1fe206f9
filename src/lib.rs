//! # Roster
//!
//! Coroutine-native GraphQL user directory over PostgreSQL, on the `may` runtime.
//!
//! - [`UserService`]: `users` / `createUser` with input validation
//! - [`PersistenceGateway`]: the storage contract (Postgres, in-memory, timeout)
//! - [`graphql`]: schema and resolvers; [`http`]: `may_minihttp` transport
//!
//! ```no_run
//! use roster::{App, RosterConfig};
//!
//! let config = RosterConfig::load()?;
//! let app = App::from_config(&config)?;
//! let server = roster::http::serve(app.http(&config), &config.server.bind)?;
//! # let _ = server;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod definition;
pub mod executor;
pub mod gateway;
pub mod graphql;
pub mod http;
pub mod metrics;
pub mod migrate;
pub mod model;
pub mod service;

pub use bootstrap::{App, BootstrapError};
pub use config::RosterConfig;
pub use connection::{connect, ConnectionError};
pub use definition::{ValidationError, USER_INPUT_SCHEMA};
pub use executor::{DbError, PgExecutor, SqlExecutor};
pub use gateway::{GatewayError, MemoryGateway, PersistenceGateway, PostgresGateway, TimeoutGateway};
pub use graphql::{build_schema, RosterSchema};
pub use model::{User, UserId};
pub use service::{ServiceError, UserService};

/// Re-exported so binaries and tests use the same pinned version.
pub use async_graphql;
