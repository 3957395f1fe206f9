//! Persistence gateway: the storage contract behind the user service.
//!
//! The service only sees [`PersistenceGateway`]. A handle is built once at
//! startup (see [`crate::bootstrap`]) and passed in explicitly.
//!
//! - [`PostgresGateway`]: `users` table over any [`crate::SqlExecutor`]
//! - [`MemoryGateway`]: in-process store with an availability switch
//! - [`TimeoutGateway`]: bounds every call of an inner gateway

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::executor::DbError;
use crate::model::User;

pub mod memory;
pub mod postgres;
pub mod timeout;

pub use memory::MemoryGateway;
pub use postgres::PostgresGateway;
pub use timeout::TimeoutGateway;

/// Gateway failure. All variants surface to callers as `StorageUnavailable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The store cannot be reached.
    Unavailable(String),
    /// The call did not finish within the request timeout.
    Timeout(Duration),
    /// The store answered, but the statement or its result was unusable.
    Query(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Unavailable(msg) => write!(f, "storage unavailable: {}", msg),
            GatewayError::Timeout(after) => {
                write!(f, "storage timed out after {} ms", after.as_millis())
            }
            GatewayError::Query(msg) => write!(f, "storage query failed: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<DbError> for GatewayError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::PostgresError(e) => {
                let data_exception = e
                    .code()
                    .map_or(false, |state| is_data_exception(state.code()));
                if data_exception {
                    GatewayError::Query(e.to_string())
                } else {
                    GatewayError::Unavailable(e.to_string())
                }
            }
            other => GatewayError::Query(other.to_string()),
        }
    }
}

/// SQLSTATE class 22: the server rejected a value, not the connection.
fn is_data_exception(sqlstate: &str) -> bool {
    sqlstate.starts_with("22")
}

/// Create and list over `User` records.
///
/// Each call is independent; atomicity of a single insert is the store's job.
pub trait PersistenceGateway: Send + Sync {
    /// Insert one record and return it with its assigned id.
    fn insert(&self, name: &str, email: &str) -> Result<User, GatewayError>;

    /// All records, ascending by id (insertion order).
    fn list_all(&self) -> Result<Vec<User>, GatewayError>;

    /// Cheap reachability check for health endpoints.
    fn ping(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for Arc<G> {
    fn insert(&self, name: &str, email: &str) -> Result<User, GatewayError> {
        (**self).insert(name, email)
    }

    fn list_all(&self) -> Result<Vec<User>, GatewayError> {
        (**self).list_all()
    }

    fn ping(&self) -> Result<(), GatewayError> {
        (**self).ping()
    }
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for Box<G> {
    fn insert(&self, name: &str, email: &str) -> Result<User, GatewayError> {
        (**self).insert(name, email)
    }

    fn list_all(&self) -> Result<Vec<User>, GatewayError> {
        (**self).list_all()
    }

    fn ping(&self) -> Result<(), GatewayError> {
        (**self).ping()
    }
}
