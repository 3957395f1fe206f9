//! User service: validation in front of the persistence gateway.
//!
//! This is the resolver logic without the GraphQL layer. It owns an explicit
//! gateway handle; nothing here reaches for a global connection.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::definition::{ValidationError, USER_INPUT_SCHEMA};
use crate::gateway::{GatewayError, PersistenceGateway};
use crate::model::User;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Input failed a field rule. Never retried.
    Validation(ValidationError),
    /// The gateway failed or timed out. `listUsers` may be retried;
    /// `createUser` is not idempotent and must not be retried blindly.
    StorageUnavailable {
        operation: &'static str,
        cause: GatewayError,
    },
}

impl ServiceError {
    /// Stable machine-readable code, used in GraphQL error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(e) => write!(f, "Invalid input: {}", e),
            ServiceError::StorageUnavailable { operation, cause } => {
                write!(f, "Storage unavailable during {}: {}", operation, cause)
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Validation(e) => Some(e),
            ServiceError::StorageUnavailable { cause, .. } => Some(cause),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone)]
pub struct UserService {
    gateway: Arc<dyn PersistenceGateway>,
}

impl UserService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// All users in insertion order. Read-only.
    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::resolver_span("users").entered();

        let start = Instant::now();
        let result = self
            .gateway
            .list_all()
            .map_err(|cause| storage_error("users", cause));
        record("users", &result, start);
        result
    }

    /// Trim, validate, then insert exactly one user.
    pub fn create_user(&self, name: &str, email: &str) -> ServiceResult<User> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::resolver_span("createUser").entered();

        let start = Instant::now();
        let name = name.trim();
        let email = email.trim();

        let result = USER_INPUT_SCHEMA
            .validate(&[("name", name), ("email", email)])
            .map_err(ServiceError::from)
            .and_then(|()| {
                self.gateway
                    .insert(name, email)
                    .map_err(|cause| storage_error("createUser", cause))
            });
        if let Ok(user) = &result {
            log::info!("created user {}", user.id);
        }
        record("createUser", &result, start);
        result
    }

    /// Gateway reachability, for health checks.
    pub fn health(&self) -> ServiceResult<()> {
        self.gateway
            .ping()
            .map_err(|cause| storage_error("health", cause))
    }
}

fn storage_error(operation: &'static str, cause: GatewayError) -> ServiceError {
    log::warn!("{} failed: {}", operation, cause);
    #[cfg(feature = "metrics")]
    if let Some(metrics) = crate::metrics::METRICS.as_ref() {
        metrics.record_gateway_error(operation);
    }
    ServiceError::StorageUnavailable { operation, cause }
}

fn record<T>(operation: &'static str, result: &ServiceResult<T>, start: Instant) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(ServiceError::Validation(_)) => "invalid",
        Err(ServiceError::StorageUnavailable { .. }) => "unavailable",
    };
    log::debug!("{} -> {} in {:?}", operation, outcome, start.elapsed());
    #[cfg(feature = "metrics")]
    if let Some(metrics) = crate::metrics::METRICS.as_ref() {
        metrics.record_request(operation, outcome, start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::timeout::tests::SlowGateway;
    use crate::gateway::{MemoryGateway, TimeoutGateway};
    use std::time::Duration;

    fn service() -> (UserService, Arc<MemoryGateway>) {
        let memory = Arc::new(MemoryGateway::new());
        (UserService::new(memory.clone()), memory)
    }

    #[test]
    fn test_create_then_list_returns_the_record() {
        let (service, _) = service();
        let user = service.create_user("Alice", "alice@example.com").unwrap();

        let users = service.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0], user);
        assert_eq!(users[0].name, "Alice");
        assert_eq!(users[0].email, "alice@example.com");
    }

    #[test]
    fn test_empty_fields_fail_validation_without_insert() {
        let (service, _) = service();
        for (name, email) in [("", "alice@example.com"), ("Alice", ""), ("", ""), ("  ", "a@b.co")] {
            let err = service.create_user(name, email).unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{name:?}/{email:?}");
            assert_eq!(err.code(), "VALIDATION_ERROR");
        }
        assert!(service.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_email_fails_on_email_field() {
        let (service, _) = service();
        match service.create_user("Alice", "alice-at-example.com") {
            Err(ServiceError::Validation(e)) => assert_eq!(e.field, "email"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(service.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_two_users_get_distinct_ids() {
        let (service, _) = service();
        let alice = service.create_user("Alice", "alice@example.com").unwrap();
        let bob = service.create_user("Bob", "bob@example.com").unwrap();
        assert_ne!(alice.id, bob.id);

        let users = service.list_users().unwrap();
        assert_eq!(users, vec![alice, bob]);
    }

    #[test]
    fn test_list_on_empty_store_is_empty_and_repeatable() {
        let (service, _) = service();
        assert!(service.list_users().unwrap().is_empty());
        assert!(service.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_inputs_are_trimmed_before_storage() {
        let (service, _) = service();
        let user = service.create_user("  Alice ", " alice@example.com\n").unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
    }

    #[test]
    fn test_unavailable_store_fails_both_operations_and_keeps_nothing() {
        let (service, memory) = service();
        memory.set_available(false);

        let err = service.create_user("Alice", "alice@example.com").unwrap_err();
        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
        assert!(matches!(
            service.list_users(),
            Err(ServiceError::StorageUnavailable { operation: "users", .. })
        ));
        assert!(service.health().is_err());

        memory.set_available(true);
        assert!(service.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_validation_runs_before_storage() {
        let (service, memory) = service();
        memory.set_available(false);
        let err = service.create_user("", "alice@example.com").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_timeout_surfaces_as_storage_unavailable() {
        let slow = Arc::new(SlowGateway {
            delay: Duration::from_millis(500),
            inner: MemoryGateway::new(),
        });
        let gateway = Arc::new(TimeoutGateway::new(slow, Duration::from_millis(20)));
        let service = UserService::new(gateway);

        match service.list_users() {
            Err(ServiceError::StorageUnavailable { cause, .. }) => {
                assert_eq!(cause, GatewayError::Timeout(Duration::from_millis(20)));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_create_timeout_surfaces_as_storage_unavailable() {
        let slow = Arc::new(SlowGateway {
            delay: Duration::from_millis(500),
            inner: MemoryGateway::new(),
        });
        let gateway = Arc::new(TimeoutGateway::new(slow, Duration::from_millis(20)));
        let service = UserService::new(gateway);

        let err = service.create_user("Alice", "alice@example.com").unwrap_err();
        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
        assert!(matches!(
            err,
            ServiceError::StorageUnavailable {
                operation: "createUser",
                cause: GatewayError::Timeout(_),
            }
        ));
    }

    #[test]
    fn test_nul_in_name_fails_validation_without_insert() {
        let (service, memory) = service();
        match service.create_user("Al\u{0}ice", "alice@example.com") {
            Err(ServiceError::Validation(e)) => assert_eq!(e.field, "name"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(memory.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_error_display_names_the_operation() {
        let err = ServiceError::StorageUnavailable {
            operation: "createUser",
            cause: GatewayError::Unavailable("connection refused".into()),
        };
        let text = err.to_string();
        assert!(text.contains("createUser"));
        assert!(text.contains("connection refused"));
    }
}
