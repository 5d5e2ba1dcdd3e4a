//! CLI command implementations.

mod agent;
mod ask;
mod config;
mod demo;
mod doctor;
mod graph;
mod serve;

pub use agent::run_agent;
pub use ask::run_ask;
pub use config::run_config;
pub use demo::run_demo;
pub use doctor::run_doctor;
pub use graph::run_graph;
pub use serve::run_serve;
