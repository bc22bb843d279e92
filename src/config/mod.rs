pub mod schema;

pub use schema::{Config, MonitoringConfig, ProviderConfig, ReliabilityConfig};
