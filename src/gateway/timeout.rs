//! Request timeout around any gateway.
//!
//! Each call runs on its own coroutine; the caller waits at most `timeout`
//! for the answer. A call that times out is not cancelled: an insert may
//! still commit after the caller has been told the store timed out.

use may::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use super::{GatewayError, PersistenceGateway};
use crate::model::User;

pub struct TimeoutGateway<G: ?Sized> {
    inner: Arc<G>,
    timeout: Duration,
}

impl<G: PersistenceGateway + ?Sized + 'static> TimeoutGateway<G> {
    /// A zero `timeout` disables the bound and calls `inner` directly.
    pub fn new(inner: Arc<G>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: FnOnce(&G) -> Result<T, GatewayError> + Send + 'static,
    {
        if self.timeout.is_zero() {
            return f(&*self.inner);
        }

        let inner = Arc::clone(&self.inner);
        let (tx, rx) = mpsc::channel();
        let _detached = may::go!(move || {
            // The receiver is gone once the caller timed out.
            let _ = tx.send(f(&*inner));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("gateway {} timed out after {:?}", operation, self.timeout);
                Err(GatewayError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(GatewayError::Unavailable(format!(
                "gateway {} aborted before answering",
                operation
            ))),
        }
    }
}

impl<G: PersistenceGateway + ?Sized + 'static> PersistenceGateway for TimeoutGateway<G> {
    fn insert(&self, name: &str, email: &str) -> Result<User, GatewayError> {
        let name = name.to_string();
        let email = email.to_string();
        self.run("insert", move |gateway| gateway.insert(&name, &email))
    }

    fn list_all(&self) -> Result<Vec<User>, GatewayError> {
        self.run("list_all", |gateway| gateway.list_all())
    }

    fn ping(&self) -> Result<(), GatewayError> {
        self.run("ping", |gateway| gateway.ping())
    }
}
