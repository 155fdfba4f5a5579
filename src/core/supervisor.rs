use crate::domain::ports::{ServiceBackend, TeardownOutcome};
use crate::utils::error::{Result, ServiceError};
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    ModelLoading,
    ServerStarting,
    ServerWaiting,
    Ready,
    Unloading,
    Stopping,
}

/// 模型服務生命週期：載入 → 啟動 → 就緒 → 執行工作 → 卸載 → 停止。
/// 任何失敗或取消都直接進入清理；清理每次只跑一次，失敗只記錄不覆蓋原本的錯誤。
pub struct ServiceSupervisor<B: ServiceBackend> {
    backend: B,
    model: String,
    port: u16,
    state: LifecycleState,
}

impl<B: ServiceBackend> ServiceSupervisor<B> {
    pub fn new(backend: B, model: impl Into<String>, port: u16) -> Self {
        Self {
            backend,
            model: model.into(),
            port,
            state: LifecycleState::Idle,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 在服務就緒後執行 `work`，Ctrl-C 視為取消
    pub async fn run<F, Fut, T>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_until(work, shutdown_signal()).await
    }

    /// 同 `run`，取消條件由呼叫端提供
    pub async fn run_until<F, Fut, T, C>(&mut self, work: F, cancel: C) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            result = self.start_and_invoke(work) => result,
            _ = cancel => {
                tracing::warn!("⚠️ Interrupted, cleaning up LM Studio");
                Err(ServiceError::Cancelled.into())
            }
        };

        if let Err(e) = &outcome {
            tracing::error!("❌ LM Studio Error: {}", e);
        }

        self.teardown().await;
        outcome
    }

    async fn start_and_invoke<F, Fut, T>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.transition(LifecycleState::ModelLoading);
        self.backend.ensure_loaded(&self.model).await?;

        self.transition(LifecycleState::ServerStarting);
        self.backend.ensure_serving(self.port).await?;

        self.transition(LifecycleState::ServerWaiting);
        self.backend.await_ready(self.port).await?;

        self.transition(LifecycleState::Ready);
        work().await
    }

    async fn teardown(&mut self) {
        self.transition(LifecycleState::Unloading);
        match self.backend.unload(&self.model).await {
            Ok(TeardownOutcome::Done) => tracing::info!("  ✓ Model unloaded"),
            Ok(TeardownOutcome::AlreadyDone) => tracing::info!("  ✓ Model was not loaded"),
            Err(e) => tracing::warn!("⚠️ Cleanup warning: {}", e),
        }

        self.transition(LifecycleState::Stopping);
        match self.backend.stop().await {
            Ok(TeardownOutcome::Done) => tracing::info!("  ✓ Server stopped"),
            Ok(TeardownOutcome::AlreadyDone) => tracing::info!("  ✓ Server was not running"),
            Err(e) => tracing::warn!("⚠️ Cleanup warning: {}", e),
        }

        self.transition(LifecycleState::Idle);
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!("lifecycle: {:?} → {:?}", self.state, next);
        self.state = next;
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // 無法註冊訊號處理時永不取消
        std::future::pending::<()>().await;
    }
}
