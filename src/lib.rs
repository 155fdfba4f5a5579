pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::{cli::LocalStorage, DigestConfig};

pub use adapters::{HealthProbe, LmsBackend, OpenAiCompatClient, PromptFile, ReadinessPolicy};
pub use core::{
    crawler::Crawler,
    etl::DigestEngine,
    fetcher::{Fetcher, RetryPolicy},
    supervisor::ServiceSupervisor,
};
pub use utils::error::{DigestError, Result, ServiceError};
