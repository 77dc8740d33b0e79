pub mod config;
pub mod error;
pub mod job;
pub mod queries;
pub mod template;

pub use config::RunConfig;
pub use error::CoreError;
pub use job::{JobStatus, QueryJob, StatusReport};
pub use queries::{render_queries, split_queries};
pub use template::{env_vars, PathContext, TemplateRenderer};
