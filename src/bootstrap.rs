//! Startup wiring: configuration in, a ready [`App`] out.
//!
//! This is the one place a gateway handle is created. Everything downstream
//! receives it explicitly.

use std::fmt;
use std::sync::Arc;

use crate::config::{DatabaseConfig, RosterConfig, StorageBackend};
use crate::connection::ConnectionError;
use crate::gateway::{GatewayError, MemoryGateway, PersistenceGateway, PostgresGateway, TimeoutGateway};
use crate::graphql::{build_schema, RosterSchema};
use crate::http::GraphQlHttp;
use crate::service::UserService;

#[derive(Debug)]
pub enum BootstrapError {
    /// Could not open the database connection.
    Connection(ConnectionError),
    /// Connected, but the schema bootstrap failed.
    Schema(GatewayError),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Connection(e) => write!(f, "database connection failed: {}", e),
            BootstrapError::Schema(e) => write!(f, "schema bootstrap failed: {}", e),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Connection(e) => Some(e),
            BootstrapError::Schema(e) => Some(e),
        }
    }
}

impl From<ConnectionError> for BootstrapError {
    fn from(err: ConnectionError) -> Self {
        BootstrapError::Connection(err)
    }
}

/// Open the configured store, create its schema when asked to, and bound
/// every call by the request timeout.
pub fn build_gateway(config: &DatabaseConfig) -> Result<Arc<dyn PersistenceGateway>, BootstrapError> {
    let inner: Arc<dyn PersistenceGateway> = match config.backend {
        StorageBackend::Memory => {
            log::info!("using in-memory storage; data is lost on exit");
            Arc::new(MemoryGateway::new())
        }
        StorageBackend::Postgres => {
            let gateway = PostgresGateway::connect(&config.url, config.request_timeout())?;
            if config.auto_migrate {
                gateway.ensure_schema().map_err(BootstrapError::Schema)?;
            }
            Arc::new(gateway)
        }
    };
    Ok(Arc::new(TimeoutGateway::new(inner, config.request_timeout())))
}

/// Only create the schema; used by the `migrate` command.
pub fn migrate(config: &DatabaseConfig) -> Result<(), BootstrapError> {
    match config.backend {
        StorageBackend::Memory => {
            log::info!("in-memory storage has no schema to migrate");
            Ok(())
        }
        StorageBackend::Postgres => {
            let gateway = PostgresGateway::connect(&config.url, config.request_timeout())?;
            gateway.ensure_schema().map_err(BootstrapError::Schema)
        }
    }
}

/// The assembled service: resolver logic, executable schema, HTTP front.
#[derive(Clone)]
pub struct App {
    pub service: UserService,
    pub schema: RosterSchema,
}

impl App {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        let service = UserService::new(gateway);
        let schema = build_schema(service.clone());
        Self { service, schema }
    }

    pub fn from_config(config: &RosterConfig) -> Result<Self, BootstrapError> {
        Ok(Self::new(build_gateway(&config.database)?))
    }

    pub fn http(&self, config: &RosterConfig) -> GraphQlHttp {
        GraphQlHttp::new(self.schema.clone(), self.service.clone())
            .with_graphiql(config.server.graphiql)
            .with_max_body_bytes(config.server.max_body_bytes)
    }
}
