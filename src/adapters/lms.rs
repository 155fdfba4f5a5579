use crate::domain::ports::{EnsureOutcome, ServiceBackend, TeardownOutcome};
use crate::utils::error::{DigestError, Result, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::process::Command;

pub const DEFAULT_HOST: &str = "http://localhost";

/// 就緒輪詢：最多 `attempts` 次，每次間隔 `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(10),
        }
    }
}

impl ReadinessPolicy {
    pub fn budget_ms(&self) -> u64 {
        self.delay.as_millis() as u64 * u64::from(self.attempts)
    }
}

/// `GET <host>:<port>/v1/models`，2xx 即視為健康
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
    host: String,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn health_url(&self, port: u16) -> String {
        format!("{}:{}/v1/models", self.host, port)
    }

    pub async fn is_healthy(&self, port: u16) -> bool {
        match self
            .client
            .get(self.health_url(port))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Health probe failed: {}", e);
                false
            }
        }
    }

    pub async fn wait_for_ready(&self, port: u16, policy: ReadinessPolicy) -> Result<()> {
        tracing::info!("  → Waiting for server to be ready...");
        let attempts = policy.attempts.max(1);

        for attempt in 0..attempts {
            if self.is_healthy(port).await {
                tracing::info!("  ✓ Server ready");
                return Ok(());
            }

            if attempt + 1 < attempts {
                tracing::info!("    → Retrying in {}s...", policy.delay.as_secs_f32());
                tokio::time::sleep(policy.delay).await;
            }
        }

        Err(ServiceError::ReadinessTimeout {
            elapsed_ms: policy.budget_ms(),
            attempts,
        }
        .into())
    }
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, Duration::from_secs(2))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// 依輸出內容判斷失敗原因
pub fn classify_output(command: &str, model: &str, output: &CommandOutput) -> Option<ServiceError> {
    let text = output.combined();
    let lower = text.to_lowercase();

    if lower.contains("command not found") {
        return Some(ServiceError::ToolMissing {
            tool: command.split_whitespace().next().unwrap_or(command).to_string(),
        });
    }
    if lower.contains("model not found") {
        return Some(ServiceError::ModelNotFound {
            model: model.to_string(),
        });
    }
    if lower.contains("error") || lower.contains("failed") || !output.success {
        return Some(ServiceError::CommandFailed {
            command: command.to_string(),
            output: text.trim().to_string(),
        });
    }
    None
}

/// 透過 `lms` CLI 控制 LM Studio
pub struct LmsBackend {
    program: String,
    probe: HealthProbe,
    readiness: ReadinessPolicy,
    command_timeout: Duration,
}

impl LmsBackend {
    pub fn new(probe: HealthProbe, readiness: ReadinessPolicy, command_timeout: Duration) -> Self {
        Self {
            program: "lms".to_string(),
            probe,
            readiness,
            command_timeout,
        }
    }

    /// 測試或非標準安裝路徑用
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    pub async fn exec(&self, args: &[&str]) -> Result<CommandOutput> {
        let command = self.describe(args);
        tracing::debug!("Running `{}`", command);

        let child = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.command_timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::ToolMissing {
                    tool: self.program.clone(),
                }
                .into());
            }
            Ok(Err(e)) => return Err(DigestError::IoError(e)),
            Err(_) => {
                return Err(ServiceError::CommandFailed {
                    command,
                    output: format!("timed out after {}s", self.command_timeout.as_secs()),
                }
                .into());
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn exec_checked(&self, args: &[&str], model: &str) -> Result<CommandOutput> {
        let output = self.exec(args).await?;
        match classify_output(&self.describe(args), model, &output) {
            Some(err) => Err(err.into()),
            None => Ok(output),
        }
    }

    async fn exec_teardown(&self, args: &[&str], already_done: &[&str]) -> Result<TeardownOutcome> {
        let output = self.exec(args).await?;
        let lower = output.combined().to_lowercase();

        if already_done.iter().any(|marker| lower.contains(marker)) {
            return Ok(TeardownOutcome::AlreadyDone);
        }
        if !output.success {
            return Err(ServiceError::CommandFailed {
                command: self.describe(args),
                output: output.combined().trim().to_string(),
            }
            .into());
        }
        Ok(TeardownOutcome::Done)
    }
}

#[async_trait]
impl ServiceBackend for LmsBackend {
    async fn ensure_loaded(&self, model: &str) -> Result<EnsureOutcome> {
        tracing::info!("  → Loading model: {}...", model);

        let loaded = self.exec_checked(&["ps"], model).await?;
        if loaded.stdout.contains(model) {
            tracing::info!("  ✓ Model already loaded");
            return Ok(EnsureOutcome::AlreadyInState);
        }

        self.exec_checked(&["load", model], model).await?;
        tracing::info!("  ✓ Model loaded");
        Ok(EnsureOutcome::Changed)
    }

    async fn ensure_serving(&self, port: u16) -> Result<EnsureOutcome> {
        tracing::info!("  → Starting server on port {}...", port);

        if self.probe.is_healthy(port).await {
            tracing::info!("  ✓ Server already running");
            return Ok(EnsureOutcome::AlreadyInState);
        }

        let port = port.to_string();
        self.exec_checked(&["server", "start", "--port", &port], "")
            .await?;
        tracing::info!("  ✓ Server started");
        Ok(EnsureOutcome::Changed)
    }

    async fn await_ready(&self, port: u16) -> Result<()> {
        self.probe.wait_for_ready(port, self.readiness).await
    }

    async fn unload(&self, model: &str) -> Result<TeardownOutcome> {
        tracing::info!("  → Unloading model...");
        self.exec_teardown(&["unload", model], &["no models", "not loaded"])
            .await
    }

    async fn stop(&self) -> Result<TeardownOutcome> {
        tracing::info!("  → Stopping LM Studio server...");
        self.exec_teardown(&["server", "stop"], &["not running", "no server"])
            .await
    }
}
