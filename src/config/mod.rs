pub mod schema;

pub use schema::{
    AdmissionConfig, Config, ObservabilityConfig, QueueConfig, ResetMode, SessionConfig,
    StorageConfig, TransportConfig,
};
