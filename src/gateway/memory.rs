//! In-process gateway for development and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{GatewayError, PersistenceGateway};
use crate::model::{User, UserId};

struct Store {
    users: Vec<User>,
    next_id: i64,
}

/// Keeps users in insertion order. Ids start at 1 and are never reused.
///
/// [`MemoryGateway::set_available`] simulates an outage: while unavailable,
/// every call fails with [`GatewayError::Unavailable`] and nothing is stored.
pub struct MemoryGateway {
    store: Mutex<Store>,
    available: AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                users: Vec::new(),
                next_id: 1,
            }),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(GatewayError::Unavailable(
                "in-memory store is offline".to_string(),
            ))
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Store>, GatewayError> {
        self.store
            .lock()
            .map_err(|_| GatewayError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn insert(&self, name: &str, email: &str) -> Result<User, GatewayError> {
        self.check_available()?;
        let mut store = self.lock()?;
        let user = User::new(UserId::new(store.next_id), name, email);
        store.next_id += 1;
        store.users.push(user.clone());
        Ok(user)
    }

    fn list_all(&self) -> Result<Vec<User>, GatewayError> {
        self.check_available()?;
        Ok(self.lock()?.users.clone())
    }

    fn ping(&self) -> Result<(), GatewayError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let gateway = MemoryGateway::new();
        let alice = gateway.insert("Alice", "alice@example.com").unwrap();
        let bob = gateway.insert("Bob", "bob@example.com").unwrap();

        assert_eq!(alice.id, UserId::new(1));
        assert_eq!(bob.id, UserId::new(2));
        assert_eq!(gateway.list_all().unwrap(), vec![alice, bob]);
    }

    #[test]
    fn test_offline_store_rejects_and_keeps_nothing() {
        let gateway = MemoryGateway::new();
        gateway.set_available(false);

        assert!(matches!(
            gateway.insert("Alice", "alice@example.com"),
            Err(GatewayError::Unavailable(_))
        ));
        assert!(gateway.ping().is_err());

        gateway.set_available(true);
        assert!(gateway.list_all().unwrap().is_empty());
        assert!(gateway.ping().is_ok());
    }
}
