//! Pipeline assembly and supervision.

mod config;
mod error;
mod supervisor;

pub use config::{FrameSettings, OscSettings, ServiceConfig, WorkerSettings};
pub use error::ServiceError;
pub use supervisor::PipelineService;
