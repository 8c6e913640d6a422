//! Flare Discovery
//!
//! In-memory service discovery client: lookups with a deadline, cancellable change subscriptions
//! and best-effort registration with a Consul-like HTTP registry.

pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod registry;
pub mod telemetry;

// Re-exports
pub use config::{BootstrapSettings, DiscoveryConfig};
pub use discovery::{
    CancellationToken, CompletionHandler, ConsulServiceDiscovery, DiscoveryBuilder,
    InstanceDirectory, LookupCallback, NextResultHandler, ServiceDiscovery, SubscriptionRegistry,
};
pub use error::{BootstrapError, CompletionReason, ConfigError, DiscoveryError, RegistryError, Result};
pub use registry::{
    ConsulRegistryClient, ConsulServiceDefinition, HttpCheckDefinition, HttpServiceCheck,
    NodeMeta, RegistryClient, ServiceDetail,
};
