//! Integration registry: capability traits, host context, and the
//! registry that starts integrations and drives the readiness barrier.

pub mod integration;
pub mod integration_registry;

pub use integration::{Awaitable, HostContext, Integration, Provides};
pub use integration_registry::IntegrationRegistry;
