// Adapters layer: concrete implementations for external systems (model server CLI, chat API, prompt files).

pub mod lms;
pub mod openai;
pub mod prompt;

pub use lms::{HealthProbe, LmsBackend, ReadinessPolicy};
pub use openai::OpenAiCompatClient;
pub use prompt::PromptFile;
