use thiserror::Error;

/// 外部模型服務生命週期錯誤
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{tool} CLI not installed")]
    ToolMissing { tool: String },

    #[error("server not ready after {elapsed_ms}ms ({attempts} attempts)")]
    ReadinessTimeout { elapsed_ms: u64, attempts: u32 },

    #[error("Model \"{model}\" not found")]
    ModelNotFound { model: String },

    #[error("`{command}` failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("supervised invocation cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Failed to fetch {url} after {attempts} attempts: {cause}")]
    FetchError {
        url: String,
        attempts: u32,
        cause: String,
    },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("LM Studio error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Text generation failed: {message}")]
    GenerationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Parsing,
    Service,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DigestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DigestError::FetchError { .. } | DigestError::HttpError(_) => ErrorCategory::Network,
            DigestError::ConfigError { .. }
            | DigestError::InvalidConfigValueError { .. }
            | DigestError::MissingConfigError { .. } => ErrorCategory::Configuration,
            DigestError::ParseError { .. } | DigestError::SerializationError(_) => {
                ErrorCategory::Parsing
            }
            DigestError::ServiceError(_) | DigestError::GenerationError { .. } => {
                ErrorCategory::Service
            }
            DigestError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DigestError::ParseError { .. } => ErrorSeverity::Low,
            DigestError::FetchError { .. }
            | DigestError::HttpError(_)
            | DigestError::GenerationError { .. } => ErrorSeverity::Medium,
            DigestError::ServiceError(ServiceError::Cancelled) => ErrorSeverity::Medium,
            DigestError::ServiceError(_)
            | DigestError::SerializationError(_)
            | DigestError::IoError(_) => ErrorSeverity::High,
            DigestError::ConfigError { .. }
            | DigestError::InvalidConfigValueError { .. }
            | DigestError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DigestError::FetchError { .. } | DigestError::HttpError(_) => {
                "Check your network connection and that the blog URL is reachable".to_string()
            }
            DigestError::ConfigError { .. }
            | DigestError::InvalidConfigValueError { .. }
            | DigestError::MissingConfigError { .. } => {
                "Fix parser.config.json (or pass --config) and run again".to_string()
            }
            DigestError::ParseError { .. } => {
                "The page markup may have changed; check the listing selectors".to_string()
            }
            DigestError::SerializationError(_) => "Make sure the file is valid JSON".to_string(),
            DigestError::IoError(_) => {
                "Check that the output directories exist and are writable".to_string()
            }
            DigestError::ServiceError(ServiceError::ToolMissing { .. }) => {
                "Install LM Studio from: https://lmstudio.ai/".to_string()
            }
            DigestError::ServiceError(ServiceError::ModelNotFound { .. }) => {
                "Run 'lms ls' to see available models".to_string()
            }
            DigestError::ServiceError(ServiceError::ReadinessTimeout { .. }) => {
                "Start the server manually with 'lms server start' and check its logs".to_string()
            }
            DigestError::ServiceError(ServiceError::Cancelled) => {
                "Run again to resume processing".to_string()
            }
            DigestError::ServiceError(ServiceError::CommandFailed { .. })
            | DigestError::GenerationError { .. } => {
                "Check the LM Studio logs ('lms log stream') for details".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DigestError::ServiceError(ServiceError::ToolMissing { tool }) => {
                format!("{} CLI not installed. Install from: https://lmstudio.ai/", tool)
            }
            DigestError::ServiceError(ServiceError::ModelNotFound { model }) => format!(
                "Model \"{}\" not found. Run 'lms ls' to see available models.",
                model
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;
