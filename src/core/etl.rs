use crate::adapters::prompt::PromptFile;
use crate::core::crawler::Crawler;
use crate::core::grouping::{format_post_group, group_posts_by_date};
use crate::core::supervisor::ServiceSupervisor;
use crate::domain::ports::{ConfigProvider, ServiceBackend, Storage, TextGenerator};
use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use regex::Regex;
use std::sync::LazyLock;

static CONTENT_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})_content\.md$")
        .expect("CONTENT_FILE_RE: hardcoded regex is valid")
});

const BANNER: &str = "==================================================";

/// 一天份、已格式化的內容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyContent {
    pub date: String,
    pub content: String,
}

/// 爬取 → 分組 → 寫檔 → 在受監管的模型服務內逐日摘要
pub struct DigestEngine<S: Storage, C: ConfigProvider> {
    storage: S,
    crawler: Crawler<C>,
}

impl<S: Storage, C: ConfigProvider> DigestEngine<S, C> {
    pub fn new(storage: S, crawler: Crawler<C>) -> Self {
        Self { storage, crawler }
    }

    fn config(&self) -> &C {
        self.crawler.config()
    }

    pub fn content_path(&self, date: &str) -> String {
        format!("{}/{}_content.md", self.config().patch_notes_dir(), date)
    }

    pub fn output_path(&self, folder: &str, date: &str) -> String {
        format!("{}/{}/{}.output.md", self.config().llm_output_dir(), folder, date)
    }

    /// 爬取並依日期分組，新到舊
    pub async fn collect_daily_content(&self) -> Result<Vec<DailyContent>> {
        tracing::info!("Crawling WordPress blog...");
        let posts = self.crawler.crawl_blog().await?;
        tracing::info!("Collected {} posts", posts.len());

        let groups = group_posts_by_date(posts);
        tracing::info!("Found {} unique dates", groups.len());

        Ok(groups
            .iter()
            .map(|group| DailyContent {
                date: group.date_key(),
                content: format_post_group(group),
            })
            .collect())
    }

    async fn write_content(&self, day: &DailyContent) -> Result<String> {
        let path = self.content_path(&day.date);
        self.storage
            .write_file(&path, day.content.as_bytes())
            .await?;
        tracing::info!("  ✓ Content saved to {}", path);
        Ok(path)
    }

    /// 只爬取並寫出每日內容檔，回傳寫出的日期
    pub async fn scrape(&self) -> Result<Vec<String>> {
        let days = self.collect_daily_content().await?;

        let mut dates = Vec::with_capacity(days.len());
        for day in &days {
            self.write_content(day).await?;
            dates.push(day.date.clone());
        }

        tracing::info!("✅ Scrape complete: {} dates saved", dates.len());
        Ok(dates)
    }

    /// 讀取 `patchNotesDir` 中既有的 `<date>_content.md`，新到舊
    pub async fn saved_content(&self) -> Result<Vec<DailyContent>> {
        let dir = self.config().patch_notes_dir();
        let mut days = Vec::new();

        for name in self.storage.list_files(dir).await? {
            let Some(caps) = CONTENT_FILE_RE.captures(&name) else {
                tracing::debug!("Ignoring {}", name);
                continue;
            };
            let date = caps[1].to_string();
            let data = self.storage.read_file(&self.content_path(&date)).await?;
            days.push(DailyContent {
                date,
                content: String::from_utf8_lossy(&data).into_owned(),
            });
        }

        days.sort_by(|a, b| b.date.cmp(&a.date));
        tracing::info!("Found {} saved content files", days.len());
        Ok(days)
    }

    /// 爬取後在同一次服務生命週期內處理所有日期
    pub async fn run_full<B, G>(
        &self,
        supervisor: &mut ServiceSupervisor<B>,
        generator: &G,
        prompt: &PromptFile,
    ) -> Result<RunSummary>
    where
        B: ServiceBackend,
        G: TextGenerator + ?Sized,
    {
        let days = self.collect_daily_content().await?;
        self.process(&days, true, supervisor, generator, prompt)
            .await
    }

    /// 處理先前 scrape 存下的內容檔
    pub async fn process_saved<B, G>(
        &self,
        supervisor: &mut ServiceSupervisor<B>,
        generator: &G,
        prompt: &PromptFile,
    ) -> Result<RunSummary>
    where
        B: ServiceBackend,
        G: TextGenerator + ?Sized,
    {
        let days = self.saved_content().await?;
        self.process(&days, false, supervisor, generator, prompt)
            .await
    }

    async fn process<B, G>(
        &self,
        days: &[DailyContent],
        persist_content: bool,
        supervisor: &mut ServiceSupervisor<B>,
        generator: &G,
        prompt: &PromptFile,
    ) -> Result<RunSummary>
    where
        B: ServiceBackend,
        G: TextGenerator + ?Sized,
    {
        if days.is_empty() {
            tracing::info!("Nothing to process, LM Studio not started");
            return Ok(RunSummary::default());
        }

        supervisor
            .run(|| self.process_days(days, persist_content, generator, prompt))
            .await
    }

    async fn process_days<G>(
        &self,
        days: &[DailyContent],
        persist_content: bool,
        generator: &G,
        prompt: &PromptFile,
    ) -> Result<RunSummary>
    where
        G: TextGenerator + ?Sized,
    {
        let mut summary = RunSummary {
            total: days.len(),
            ..Default::default()
        };

        for (index, day) in days.iter().enumerate() {
            tracing::info!("{}", BANNER);
            tracing::info!("Processing {} ({}/{})", day.date, index + 1, days.len());
            tracing::info!("{}", BANNER);

            match self.process_day(day, persist_content, generator, prompt).await {
                Ok(path) => {
                    summary.succeeded += 1;
                    tracing::info!("✓ Complete: {} → {}", day.date, path);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("❌ Failed: {}", day.date);
                    tracing::error!("   {}", e);
                }
            }
        }

        tracing::info!("{}", BANNER);
        tracing::info!(
            "Done! Processed {}/{} dates",
            summary.succeeded,
            summary.total
        );
        if summary.failed > 0 {
            tracing::warn!("Failed: {} dates", summary.failed);
        }
        tracing::info!("{}", BANNER);

        Ok(summary)
    }

    async fn process_day<G>(
        &self,
        day: &DailyContent,
        persist_content: bool,
        generator: &G,
        prompt: &PromptFile,
    ) -> Result<String>
    where
        G: TextGenerator + ?Sized,
    {
        if persist_content {
            self.write_content(day).await?;
        }

        tracing::info!("  → Analyzing with AI...");
        let mut stdout = std::io::stdout();
        let result = generator
            .generate(&prompt.text, &day.content, &mut stdout)
            .await?;

        let path = self.output_path(prompt.output_folder(), &day.date);
        self.storage.write_file(&path, result.as_bytes()).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use crate::core::fetcher::{Fetcher, RetryPolicy};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct TestConfig;

    impl ConfigProvider for TestConfig {
        fn base_url(&self) -> &str {
            "http://127.0.0.1:1/"
        }
        fn page_append_url(&self) -> &str {
            "page/"
        }
        fn earliest_date(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        }
        fn include_skins(&self) -> bool {
            true
        }
        fn patch_notes_dir(&self) -> &str {
            "notes"
        }
        fn llm_output_dir(&self) -> &str {
            "llm"
        }
        fn model_name(&self) -> &str {
            "qwen3-8b"
        }
        fn port(&self) -> u16 {
            1234
        }
    }

    fn engine(dir: &TempDir) -> DigestEngine<LocalStorage, TestConfig> {
        let crawler = Crawler::new(TestConfig, Fetcher::new(RetryPolicy::default()));
        DigestEngine::new(LocalStorage::new(dir.path()), crawler)
    }

    #[test]
    fn test_artifact_paths() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir);

        assert_eq!(engine.content_path("2024-03-10"), "notes/2024-03-10_content.md");
        assert_eq!(
            engine.output_path("default", "2024-03-10"),
            "llm/default/2024-03-10.output.md"
        );
    }

    #[tokio::test]
    async fn test_saved_content_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir);

        for name in [
            "notes/2024-03-01_content.md",
            "notes/2024-03-10_content.md",
            "notes/readme.md",
            "notes/2024-3-5_content.md",
        ] {
            engine.storage.write_file(name, name.as_bytes()).await.unwrap();
        }

        let days = engine.saved_content().await.unwrap();
        let dates: Vec<_> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-10", "2024-03-01"]);
        assert_eq!(days[0].content, "notes/2024-03-10_content.md");
    }

    #[tokio::test]
    async fn test_saved_content_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(engine(&temp_dir).saved_content().await.unwrap().is_empty());
    }
}
