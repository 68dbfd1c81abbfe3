pub mod service;

pub use service::{ModelPaths, ScoringConstants, ServerConfig, ServiceConfig, UpstreamConfig};
