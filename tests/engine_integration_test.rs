use anyhow::Result;
use async_trait::async_trait;
use httpmock::prelude::*;
use patch_digest::domain::ports::{EnsureOutcome, ServiceBackend, TeardownOutcome, TextGenerator};
use patch_digest::utils::error::DigestError;
use patch_digest::{
    Crawler, DigestConfig, DigestEngine, Fetcher, LocalStorage, PromptFile, RetryPolicy,
    ServiceSupervisor,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Clone, Default)]
struct RecordingBackend {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingBackend {
    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ServiceBackend for RecordingBackend {
    async fn ensure_loaded(&self, _model: &str) -> patch_digest::Result<EnsureOutcome> {
        self.record("load");
        Ok(EnsureOutcome::Changed)
    }

    async fn ensure_serving(&self, _port: u16) -> patch_digest::Result<EnsureOutcome> {
        self.record("serve");
        Ok(EnsureOutcome::Changed)
    }

    async fn await_ready(&self, _port: u16) -> patch_digest::Result<()> {
        self.record("ready");
        Ok(())
    }

    async fn unload(&self, _model: &str) -> patch_digest::Result<TeardownOutcome> {
        self.record("unload");
        Ok(TeardownOutcome::Done)
    }

    async fn stop(&self) -> patch_digest::Result<TeardownOutcome> {
        self.record("stop");
        Ok(TeardownOutcome::Done)
    }
}

/// 內容含有 "CORRUPT" 時失敗，其餘回傳固定摘要
#[derive(Default)]
struct FakeGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        _sink: &mut (dyn std::io::Write + Send),
    ) -> patch_digest::Result<String> {
        self.prompts.lock().unwrap().push(system.to_string());
        if user.contains("CORRUPT") {
            return Err(DigestError::GenerationError {
                message: "model crashed".to_string(),
            });
        }
        Ok(format!("summary ({} chars)", user.len()))
    }
}

fn config(base_url: &str) -> Result<DigestConfig> {
    let content = format!(
        r#"{{
            "modelName": "qwen3-8b",
            "lmStudioPort": 1234,
            "patchNotesDir": "notes",
            "llmOutputDir": "llm",
            "promptFile": "prompt.md",
            "wordpress": {{
                "baseUrl": "{}",
                "pageAppendUrl": "page/",
                "earliestDate": "2024-01-01"
            }}
        }}"#,
        base_url
    );
    Ok(DigestConfig::from_json_str(&content)?)
}

fn engine(temp_dir: &TempDir, config: DigestConfig) -> DigestEngine<LocalStorage, DigestConfig> {
    let fetcher = Fetcher::new(RetryPolicy {
        attempts: 1,
        base_delay: Duration::from_millis(1),
    });
    DigestEngine::new(LocalStorage::new(temp_dir.path()), Crawler::new(config, fetcher))
}

fn prompt() -> PromptFile {
    PromptFile::parse("---\nfolder: summaries\n---\nSummarize these patch notes.".to_string())
}

fn article(id: usize, title: &str, href: &str, date: &str) -> String {
    format!(
        r#"<article id="post-{id}"><header><h2><a href="{href}">{title}</a></h2><time datetime="{date}">{date}</time></header></article>"#
    )
}

fn mock_blog(server: &MockServer) {
    let listing = format!(
        "<html><body>{}{}{}</body></html>",
        article(1, "Maintenance Notice", &server.url("/posts/maint"), "2024-03-10T20:00:00"),
        article(2, "Event Preview", &server.url("/posts/event"), "2024-03-10T08:00:00"),
        article(3, "Broken Post", &server.url("/posts/broken"), "2024-02-01T12:00:00"),
    );

    server.mock(|when, then| {
        when.method(GET).path("/blog/");
        then.status(200).body(listing);
    });
    server.mock(|when, then| {
        when.method(GET).path("/blog/page/2");
        then.status(200).body("<html><body></body></html>");
    });
    for (path, body) in [
        ("/posts/maint", "Servers go down at 00:00."),
        ("/posts/event", "New event starts soon."),
        ("/posts/broken", "CORRUPT payload"),
    ] {
        server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(200).body(format!(
                r#"<html><body><div class="entry-content"><p>{body}</p></div></body></html>"#
            ));
        });
    }
}

#[tokio::test]
async fn test_full_run_processes_each_date_in_one_lifecycle() -> Result<()> {
    let server = MockServer::start();
    mock_blog(&server);

    let temp_dir = TempDir::new()?;
    let engine = engine(&temp_dir, config(&server.url("/blog/"))?);
    let backend = RecordingBackend::default();
    let mut supervisor = ServiceSupervisor::new(backend.clone(), "qwen3-8b", 1234);
    let generator = FakeGenerator::default();

    let summary = engine
        .run_full(&mut supervisor, &generator, &prompt())
        .await?;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        backend.calls(),
        vec!["load", "serve", "ready", "unload", "stop"]
    );

    // 兩天的內容都會寫出，包括摘要失敗的那天
    let march = std::fs::read_to_string(temp_dir.path().join("notes/2024-03-10_content.md"))?;
    assert!(temp_dir.path().join("notes/2024-02-01_content.md").exists());

    let maint = march.find("Maintenance Notice").unwrap();
    let event = march.find("Event Preview").unwrap();
    assert!(maint < event, "later post should come first");
    assert!(march.contains("Servers go down at 00:00."));

    let output = temp_dir.path().join("llm/summaries/2024-03-10.output.md");
    assert!(std::fs::read_to_string(output)?.starts_with("summary"));
    assert!(!temp_dir
        .path()
        .join("llm/summaries/2024-02-01.output.md")
        .exists());

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Summarize these patch notes."));
    Ok(())
}

#[tokio::test]
async fn test_scrape_only_never_touches_the_service() -> Result<()> {
    let server = MockServer::start();
    mock_blog(&server);

    let temp_dir = TempDir::new()?;
    let engine = engine(&temp_dir, config(&server.url("/blog/"))?);

    let dates = engine.scrape().await?;

    assert_eq!(dates, vec!["2024-03-10".to_string(), "2024-02-01".to_string()]);
    assert!(temp_dir.path().join("notes/2024-03-10_content.md").exists());
    assert!(!temp_dir.path().join("llm").exists());
    Ok(())
}

#[tokio::test]
async fn test_process_saved_content() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let notes = temp_dir.path().join("notes");
    std::fs::create_dir_all(&notes)?;
    std::fs::write(notes.join("2024-03-01_content.md"), "Day one notes")?;
    std::fs::write(notes.join("2024-03-02_content.md"), "Day two notes")?;
    std::fs::write(notes.join("todo.txt"), "not a content file")?;

    let engine = engine(&temp_dir, config("http://127.0.0.1:9/blog/")?);
    let backend = RecordingBackend::default();
    let mut supervisor = ServiceSupervisor::new(backend.clone(), "qwen3-8b", 1234);
    let generator = FakeGenerator::default();

    let summary = engine
        .process_saved(&mut supervisor, &generator, &prompt())
        .await?;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(backend.calls().iter().filter(|c| **c == "load").count(), 1);
    assert!(temp_dir
        .path()
        .join("llm/summaries/2024-03-01.output.md")
        .exists());
    assert!(temp_dir
        .path()
        .join("llm/summaries/2024-03-02.output.md")
        .exists());
    Ok(())
}

#[tokio::test]
async fn test_process_with_nothing_saved_skips_lifecycle() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let engine = engine(&temp_dir, config("http://127.0.0.1:9/blog/")?);
    let backend = RecordingBackend::default();
    let mut supervisor = ServiceSupervisor::new(backend.clone(), "qwen3-8b", 1234);

    let summary = engine
        .process_saved(&mut supervisor, &FakeGenerator::default(), &prompt())
        .await?;

    assert_eq!(summary.total, 0);
    assert!(backend.calls().is_empty());
    Ok(())
}
