pub mod cli;
pub mod collector;
pub mod config;
pub mod decode;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod store;

pub use pipeline::{Envelope, Pipeline};
