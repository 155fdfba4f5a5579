pub mod crawler;
pub mod date_extractor;
pub mod etl;
pub mod fetcher;
pub mod grouping;
pub mod listing;
pub mod normalizer;
pub mod supervisor;

pub use crate::domain::model::{Post, PostGroup, PostStub, RunMode, RunSummary};
pub use crate::domain::ports::{ConfigProvider, ServiceBackend, Storage, TextGenerator};
pub use crate::utils::error::Result;
