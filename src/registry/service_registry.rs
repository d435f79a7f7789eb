//! # Service Registry
//!
//! Name to handler directory used by listener components to publish services
//! and by the fan-out coordinator and request routers to find them.
//!
//! ## Key Features
//!
//! - **Explicit instance**: constructed and passed around by reference, no global state
//! - **Linearizable updates**: a single `RwLock` guards the map, so readers see an
//!   entry either fully registered or absent
//! - **Sorted listing**: names are kept in a `BTreeMap` and listed lexicographically
//! - **Last write wins**: re-registering a name replaces the handler with a warning;
//!   [`ServiceRegistry::register_unique`] is available where duplicates are a configuration error
//!
//! ## Usage
//!
//! ```rust
//! use async_trait::async_trait;
//! use fanout_core::dispatch::{HandlerError, RequestHandler};
//! use fanout_core::messaging::{DispatchContext, Message};
//! use fanout_core::registry::ServiceRegistry;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl RequestHandler for Echo {
//!     async fn handle(&self, request: &Message, _: &DispatchContext) -> Result<Message, HandlerError> {
//!         Ok(Message::text(request.to_string()))
//!     }
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let registry = ServiceRegistry::new();
//! registry.register("echo", Arc::new(Echo));
//!
//! let reply = registry
//!     .dispatch("echo", &Message::text("ping"), &DispatchContext::new("corr-1"))
//!     .await
//!     .unwrap();
//! assert_eq!(reply.as_str(), Some("ping"));
//! assert_eq!(registry.list(), vec!["echo".to_string()]);
//! # });
//! ```

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dispatch::handler::{HandlerError, RequestHandler};
use crate::logging::log_registry_operation;
use crate::messaging::{DispatchContext, Message};

/// Registry failures
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No handler is registered under the name
    #[error("Service '{name}' is not registered")]
    NotRegistered { name: String },

    /// A handler is already registered under the name and uniqueness was required
    #[error("Service '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// The handler was found but failed while processing the request
    #[error("Service '{name}' failed: {source}")]
    Handler {
        name: String,
        #[source]
        source: HandlerError,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Outcome of [`ServiceRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The name was free
    Registered,
    /// The name was bound; the previous handler has been replaced
    Replaced,
}

/// Introspection record for a registered service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub name: String,
    pub handler_name: String,
    pub registered_at: DateTime<Utc>,
}

struct RegisteredService {
    handler: Arc<dyn RequestHandler>,
    registered_at: DateTime<Utc>,
}

/// Concurrent name → handler directory
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<BTreeMap<String, RegisteredService>>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.list())
            .finish()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any existing binding for the name
    pub fn register(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) -> RegistrationOutcome {
        let name = name.into();
        let entry = RegisteredService {
            handler,
            registered_at: Utc::now(),
        };

        let previous = self.services.write().insert(name.clone(), entry);

        if previous.is_some() {
            warn!(service = %name, "Service already registered, replacing handler");
            log_registry_operation("register", &name, "replaced");
            RegistrationOutcome::Replaced
        } else {
            log_registry_operation("register", &name, "registered");
            RegistrationOutcome::Registered
        }
    }

    /// Register a handler, failing if the name is already bound
    pub fn register_unique(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) -> RegistryResult<()> {
        let name = name.into();
        let mut services = self.services.write();

        if services.contains_key(&name) {
            warn!(service = %name, "Refusing duplicate service registration");
            log_registry_operation("register_unique", &name, "rejected");
            return Err(RegistryError::AlreadyRegistered { name });
        }

        services.insert(
            name.clone(),
            RegisteredService {
                handler,
                registered_at: Utc::now(),
            },
        );
        drop(services);

        log_registry_operation("register_unique", &name, "registered");
        Ok(())
    }

    /// Remove a registration; returns whether the name was bound
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.services.write().remove(name).is_some();

        if removed {
            log_registry_operation("unregister", name, "unregistered");
        } else {
            warn!(service = %name, "Attempted to unregister a service that is not registered");
            log_registry_operation("unregister", name, "not_registered");
        }
        removed
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.services.read().contains_key(name)
    }

    /// Look up a handler without failing
    pub fn get(&self, name: &str) -> Option<Arc<dyn RequestHandler>> {
        self.services
            .read()
            .get(name)
            .map(|entry| Arc::clone(&entry.handler))
    }

    /// Look up a handler, failing with [`RegistryError::NotRegistered`]
    pub fn resolve(&self, name: &str) -> RegistryResult<Arc<dyn RequestHandler>> {
        self.get(name).ok_or_else(|| RegistryError::NotRegistered {
            name: name.to_string(),
        })
    }

    pub fn registration(&self, name: &str) -> Option<RegistrationInfo> {
        self.services.read().get(name).map(|entry| RegistrationInfo {
            name: name.to_string(),
            handler_name: entry.handler.name().to_string(),
            registered_at: entry.registered_at,
        })
    }

    /// Registered names in lexicographic order
    pub fn list(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }

    /// Invoke the handler registered under `name` and return its reply
    ///
    /// The registry lock is released before the handler runs, so a slow
    /// handler never blocks registration or other dispatches.
    pub async fn dispatch(
        &self,
        name: &str,
        request: &Message,
        context: &DispatchContext,
    ) -> RegistryResult<Message> {
        debug!(
            service = %name,
            correlation_id = %context.correlation_id(),
            "Dispatching request"
        );

        let handler = self.resolve(name).inspect_err(|_| {
            warn!(
                service = %name,
                correlation_id = %context.correlation_id(),
                "Dispatch to unregistered service"
            );
        })?;

        let reply = handler
            .handle(request, context)
            .await
            .map_err(|source| RegistryError::Handler {
                name: name.to_string(),
                source,
            })?;

        if reply.is_empty() {
            warn!(
                service = %name,
                correlation_id = %context.correlation_id(),
                "Service returned an empty result"
            );
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recording {
        label: &'static str,
        calls: AtomicUsize,
        last_request: parking_lot::Mutex<Option<String>>,
    }

    impl Recording {
        fn new(label: &'static str) -> Arc<Self> {
            Arc::new(Self {
                label,
                calls: AtomicUsize::new(0),
                last_request: parking_lot::Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl RequestHandler for Recording {
        async fn handle(
            &self,
            request: &Message,
            _context: &DispatchContext,
        ) -> Result<Message, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock() = request.as_str().map(str::to_string);
            Ok(Message::text(format!("{}:{}", self.label, request)))
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    struct Failing;

    #[async_trait]
    impl RequestHandler for Failing {
        async fn handle(&self, _: &Message, _: &DispatchContext) -> Result<Message, HandlerError> {
            Err(HandlerError::failed("failing", "downstream unavailable"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_dispatch_unknown_name_is_not_registered() {
        let registry = ServiceRegistry::new();
        let err = registry
            .dispatch("missing", &Message::text("x"), &DispatchContext::new("c"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotRegistered { name } if name == "missing"));
    }

    #[tokio::test]
    async fn test_dispatch_invokes_handler_once_with_request() {
        let registry = ServiceRegistry::new();
        let handler = Recording::new("x");
        registry.register("x", handler.clone());

        let reply = registry
            .dispatch("x", &Message::text("req"), &DispatchContext::new("c"))
            .await
            .unwrap();

        assert_eq!(reply.as_str(), Some("x:req"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.last_request.lock().as_deref(), Some("req"));
    }

    #[tokio::test]
    async fn test_handler_failure_propagates() {
        let registry = ServiceRegistry::new();
        registry.register("failing", Arc::new(Failing));

        let err = registry
            .dispatch("failing", &Message::text("x"), &DispatchContext::new("c"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Handler { ref name, .. } if name == "failing"));
    }

    #[test]
    fn test_reregistration_replaces_with_distinct_outcome() {
        let registry = ServiceRegistry::new();
        assert_eq!(
            registry.register("svc", Recording::new("first")),
            RegistrationOutcome::Registered
        );
        assert_eq!(
            registry.register("svc", Recording::new("second")),
            RegistrationOutcome::Replaced
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.registration("svc").map(|info| info.handler_name),
            Some("second".to_string())
        );
    }

    #[test]
    fn test_register_unique_rejects_duplicates() {
        let registry = ServiceRegistry::new();
        registry.register_unique("svc", Recording::new("a")).unwrap();
        let err = registry
            .register_unique("svc", Recording::new("b"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
        assert_eq!(registry.get("svc").map(|h| h.name().to_string()), Some("a".to_string()));
    }

    #[test]
    fn test_unregister_absent_name_is_noop() {
        let registry = ServiceRegistry::new();
        registry.register("present", Recording::new("p"));
        assert!(!registry.unregister("absent"));
        assert!(registry.unregister("present"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_is_lexicographic_and_case_sensitive() {
        let registry = ServiceRegistry::new();
        for name in ["beta", "Alpha", "alpha", "gamma"] {
            registry.register(name, Recording::new("h"));
        }
        assert_eq!(registry.list(), vec!["Alpha", "alpha", "beta", "gamma"]);
        assert!(!registry.is_registered("ALPHA"));
    }
}
