use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 列出目錄下的檔名（不含子目錄）；目錄不存在時回傳空清單
    fn list_files(&self, dir: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn page_append_url(&self) -> &str;
    fn earliest_date(&self) -> NaiveDate;
    fn include_skins(&self) -> bool;
    fn patch_notes_dir(&self) -> &str;
    fn llm_output_dir(&self) -> &str;
    fn model_name(&self) -> &str;
    fn port(&self) -> u16;
}

/// 服務已處於目標狀態，或這次呼叫才把它帶到目標狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyInState,
    Changed,
}

/// 清理步驟的結果；「本來就已卸載 / 已停止」不是錯誤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownOutcome {
    Done,
    AlreadyDone,
}

/// 模型服務的控制面。LM Studio CLI 是其中一種實作。
#[async_trait]
pub trait ServiceBackend: Send + Sync {
    async fn ensure_loaded(&self, model: &str) -> Result<EnsureOutcome>;
    async fn ensure_serving(&self, port: u16) -> Result<EnsureOutcome>;
    async fn await_ready(&self, port: u16) -> Result<()>;
    async fn unload(&self, model: &str) -> Result<TeardownOutcome>;
    async fn stop(&self) -> Result<TeardownOutcome>;
}

/// 文字生成：system 指令 + user 內容，串流片段寫到 sink，回傳完整結果
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        sink: &mut (dyn std::io::Write + Send),
    ) -> Result<String>;
}
