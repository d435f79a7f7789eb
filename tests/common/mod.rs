#![allow(dead_code)]

pub mod mock_handlers;
pub mod strategies;

pub use mock_handlers::*;
pub use strategies::*;

use fanout_core::config::DispatchConfig;
use fanout_core::dispatch::{FanOutCoordinator, RequestHandler};
use fanout_core::registry::ServiceRegistry;
use std::sync::Arc;

/// Registry populated with `(name, handler)` pairs
pub fn registry_with(services: Vec<(&str, Arc<dyn RequestHandler>)>) -> Arc<ServiceRegistry> {
    let registry = Arc::new(ServiceRegistry::new());
    for (name, handler) in services {
        registry.register(name, handler);
    }
    registry
}

/// Coordinator over `registry` with default dispatch settings
pub fn coordinator_for(registry: Arc<ServiceRegistry>) -> FanOutCoordinator {
    FanOutCoordinator::new(registry, DispatchConfig::default())
}
