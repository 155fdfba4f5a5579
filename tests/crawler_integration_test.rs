use anyhow::Result;
use httpmock::prelude::*;
use patch_digest::utils::error::DigestError;
use patch_digest::{Crawler, DigestConfig, Fetcher, RetryPolicy};
use std::time::Duration;

fn config_for(server: &MockServer, earliest_date: &str) -> Result<DigestConfig> {
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
                "earliestDate": "{}"
            }}
        }}"#,
        server.url("/blog/"),
        earliest_date
    );
    Ok(DigestConfig::from_json_str(&content)?)
}

fn fast_fetcher(attempts: u32) -> Fetcher {
    Fetcher::new(RetryPolicy {
        attempts,
        base_delay: Duration::from_millis(1),
    })
}

fn listing(entries: &[(&str, String, &str)]) -> String {
    let articles: String = entries
        .iter()
        .enumerate()
        .map(|(i, (title, href, date))| {
            format!(
                r#"<article id="post-{i}" class="post">
                    <header class="entry-header">
                        <h2 class="entry-title"><a href="{href}">{title}</a></h2>
                        <span class="posted-on">{date}</span>
                    </header>
                </article>"#
            )
        })
        .collect();
    format!("<html><body><main>{articles}</main></body></html>")
}

fn post_page(body: &str) -> String {
    format!(
        r#"<html><body><article>
            <div class="entry-content"><p>{body}</p><img src="banner.png"></div>
        </article></body></html>"#
    )
}

#[tokio::test]
async fn test_post_after_cutoff_is_included_and_crawl_continues() -> Result<()> {
    let server = MockServer::start();

    let page_one = server.mock(|when, then| {
        when.method(GET).path("/blog/");
        then.status(200)
            .body(listing(&[("Title A", server.url("/posts/a"), "03/10/2024")]));
    });
    let post_a = server.mock(|when, then| {
        when.method(GET).path("/posts/a");
        then.status(200).body(post_page("Fixed a crash."));
    });
    let page_two = server.mock(|when, then| {
        when.method(GET).path("/blog/page/2");
        then.status(200).body(listing(&[]));
    });

    let crawler = Crawler::new(config_for(&server, "2024-01-01")?, fast_fetcher(1));
    let posts = crawler.crawl_blog().await?;

    page_one.assert_hits(1);
    post_a.assert_hits(1);
    page_two.assert_hits(1);

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Title A");
    assert_eq!(posts[0].date.format("%Y-%m-%d").to_string(), "2024-03-10");
    assert!(posts[0].content.contains("Fixed a crash."));
    assert!(!posts[0].content.contains("banner.png"));
    Ok(())
}

#[tokio::test]
async fn test_post_at_or_before_cutoff_stops_everything() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/blog/");
        then.status(200)
            .body(listing(&[("Title A", server.url("/posts/a"), "03/10/2024")]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/posts/a");
        then.status(200).body(post_page("Event rerun."));
    });
    let page_two = server.mock(|when, then| {
        when.method(GET).path("/blog/page/2");
        then.status(200).body(listing(&[
            ("Old News", server.url("/posts/old"), "12/15/2023"),
            ("Out Of Order", server.url("/posts/newer"), "02/01/2024"),
        ]));
    });
    let old_post = server.mock(|when, then| {
        when.method(GET).path("/posts/old");
        then.status(200).body(post_page("old"));
    });
    let newer_post = server.mock(|when, then| {
        when.method(GET).path("/posts/newer");
        then.status(200).body(post_page("newer"));
    });
    let page_three = server.mock(|when, then| {
        when.method(GET).path("/blog/page/3");
        then.status(200).body(listing(&[]));
    });

    let crawler = Crawler::new(config_for(&server, "2024-01-01")?, fast_fetcher(1));
    let posts = crawler.crawl_blog().await?;

    page_two.assert_hits(1);
    old_post.assert_hits(0);
    newer_post.assert_hits(0);
    page_three.assert_hits(0);

    let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Title A"]);
    Ok(())
}

#[tokio::test]
async fn test_results_are_sorted_newest_first_across_pages() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/blog/");
        then.status(200).body(listing(&[
            ("Older", server.url("/posts/older"), "02/01/2024"),
            ("Newer", server.url("/posts/newer"), "March 5, 2024"),
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/blog/page/2");
        then.status(200).body(listing(&[]));
    });
    server.mock(|when, then| {
        when.method(GET).path_contains("/posts/");
        then.status(200).body(post_page("Notes"));
    });

    let crawler = Crawler::new(config_for(&server, "2024-01-01")?, fast_fetcher(1));
    let posts = crawler.crawl_blog().await?;

    let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Newer", "Older"]);
    Ok(())
}

#[tokio::test]
async fn test_undated_posts_are_skipped() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/blog/");
        then.status(200).body(listing(&[
            ("Mystery", server.url("/posts/mystery"), "sometime soon"),
            ("Dated", server.url("/posts/dated"), "03/10/2024"),
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/blog/page/2");
        then.status(200).body(listing(&[]));
    });
    let mystery = server.mock(|when, then| {
        when.method(GET).path("/posts/mystery");
        then.status(200).body(post_page("?"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/posts/dated");
        then.status(200).body(post_page("Dated notes"));
    });

    let crawler = Crawler::new(config_for(&server, "2024-01-01")?, fast_fetcher(1));
    let posts = crawler.crawl_blog().await?;

    mystery.assert_hits(0);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Dated");
    Ok(())
}

#[tokio::test]
async fn test_post_fetch_failure_aborts_crawl() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/blog/");
        then.status(200)
            .body(listing(&[("Broken", server.url("/posts/broken"), "03/10/2024")]));
    });
    let broken = server.mock(|when, then| {
        when.method(GET).path("/posts/broken");
        then.status(500);
    });

    let crawler = Crawler::new(config_for(&server, "2024-01-01")?, fast_fetcher(2));
    let result = crawler.crawl_blog().await;

    broken.assert_hits(2);
    assert!(matches!(
        result,
        Err(DigestError::FetchError { attempts: 2, .. })
    ));
    Ok(())
}
