//! Credence Runtime
//!
//! Everything that runs an assessment end to end:
//! - **Orchestrator**: concurrent signal sub-tasks with per-task timeouts
//! - **Pipeline**: extraction, aggregation and persistence of each result
//! - **Store**: append-only credibility history (SQLite or in-memory)
//! - **Optimizer**: random-forest weight re-estimation over the history,
//!   published atomically to the shared active weight set

pub mod config;
pub mod forest;
pub mod orchestrator;
pub mod optimizer;
pub mod pipeline;
pub mod services;
pub mod store;

pub use config::Settings;
pub use forest::{ForestConfig, RandomForest};
pub use optimizer::*;
pub use orchestrator::*;
pub use pipeline::*;
pub use services::*;
pub use store::*;
