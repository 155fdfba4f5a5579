use crate::adapters::lms::ReadinessPolicy;
use crate::core::fetcher::RetryPolicy;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{DigestError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("ENV_VAR_RE: hardcoded regex is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestConfig {
    pub model_name: String,
    pub lm_studio_port: u16,
    pub patch_notes_dir: String,
    pub llm_output_dir: String,
    pub prompt_file: String,
    #[serde(default = "default_true")]
    pub detailed_skin: bool,
    pub wordpress: WordpressConfig,
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordpressConfig {
    pub base_url: String,
    pub page_append_url: String,
    /// 截止日期（不含），`YYYY-MM-DD`
    pub earliest_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceSettings {
    pub ready_attempts: u32,
    pub ready_delay_secs: u64,
    pub command_timeout_secs: u64,
    pub health_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            ready_attempts: 10,
            ready_delay_secs: 10,
            command_timeout_secs: 300,
            health_timeout_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchSettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

fn default_true() -> bool {
    true
}

impl DigestConfig {
    /// 依副檔名選擇格式：`.toml` 用 TOML，其餘一律視為 JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DigestError::ConfigError {
            message: format!("Cannot read {}: {}", path.display(), e),
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(&substitute_env_vars(content)).map_err(|e| {
            DigestError::ConfigError {
                message: format!("JSON parsing error: {}", e),
            }
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(&substitute_env_vars(content)).map_err(|e| DigestError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.fetch.attempts,
            base_delay: Duration::from_millis(self.fetch.base_delay_ms),
        }
    }

    pub fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            attempts: self.service.ready_attempts,
            delay: Duration::from_secs(self.service.ready_delay_secs),
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.service.command_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.service.health_timeout_secs)
    }
}

/// 替換環境變數 (例如 ${LMS_MODEL})；未設定的保留原字串
fn substitute_env_vars(content: &str) -> String {
    substitute_with(content, |name| std::env::var(name).ok())
}

fn substitute_with(content: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_VAR_RE
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
        })
        .into_owned()
}

impl Validate for DigestConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("wordpress.baseUrl", &self.wordpress.base_url)?;
        validation::validate_non_empty_string("wordpress.pageAppendUrl", &self.wordpress.page_append_url)?;
        validation::validate_non_empty_string("modelName", &self.model_name)?;
        validation::validate_range("lmStudioPort", self.lm_studio_port, 1, u16::MAX)?;
        validation::validate_path("patchNotesDir", &self.patch_notes_dir)?;
        validation::validate_path("llmOutputDir", &self.llm_output_dir)?;
        validation::validate_path("promptFile", &self.prompt_file)?;
        validation::validate_positive_number("fetch.attempts", self.fetch.attempts as usize, 1)?;
        validation::validate_positive_number(
            "service.readyAttempts",
            self.service.ready_attempts as usize,
            1,
        )?;
        validation::validate_positive_number(
            "service.commandTimeoutSecs",
            self.service.command_timeout_secs as usize,
            1,
        )?;
        Ok(())
    }
}

impl ConfigProvider for DigestConfig {
    fn base_url(&self) -> &str {
        &self.wordpress.base_url
    }

    fn page_append_url(&self) -> &str {
        &self.wordpress.page_append_url
    }

    fn earliest_date(&self) -> NaiveDate {
        self.wordpress.earliest_date
    }

    fn include_skins(&self) -> bool {
        self.detailed_skin
    }

    fn patch_notes_dir(&self) -> &str {
        &self.patch_notes_dir
    }

    fn llm_output_dir(&self) -> &str {
        &self.llm_output_dir
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn port(&self) -> u16 {
        self.lm_studio_port
    }
}
