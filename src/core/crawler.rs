use crate::core::fetcher::Fetcher;
use crate::core::listing::parse_listing_page;
use crate::core::normalizer::{extract_main_content, NormalizeOptions};
use crate::domain::model::Post;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};

/// 依序抓取文章列表，直到遇到截止日期或空白頁
pub struct Crawler<C: ConfigProvider> {
    config: C,
    fetcher: Fetcher,
}

impl<C: ConfigProvider> Crawler<C> {
    pub fn new(config: C, fetcher: Fetcher) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// 第 1 頁是 base URL，之後是 base + 分頁後綴 + 頁碼
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            self.config.base_url().to_string()
        } else {
            format!(
                "{}{}{}",
                self.config.base_url(),
                self.config.page_append_url(),
                page
            )
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.config.earliest_date().and_time(NaiveTime::MIN))
    }

    /// 回傳截止日期之後的文章，新到舊排序。
    /// 列表頁或文章頁抓取失敗（重試用盡）都會中止整個爬取。
    pub async fn crawl_blog(&self) -> Result<Vec<Post>> {
        let cutoff = self.cutoff();
        let options = NormalizeOptions {
            include_skins: self.config.include_skins(),
        };
        let mut posts = Vec::new();
        let mut page = 1;

        'pages: loop {
            tracing::info!("📰 Crawling page {}...", page);

            let html = self.fetcher.fetch_text(&self.page_url(page)).await?;
            let stubs = parse_listing_page(&html);

            if stubs.is_empty() {
                tracing::info!("✓ No more posts found");
                break;
            }

            for stub in stubs {
                let Some(date) = stub.date else {
                    tracing::warn!("⚠️ Skipping post without date: {}", stub.title);
                    continue;
                };

                if date <= cutoff {
                    tracing::info!("✓ Date cutoff reached: {}", date.format("%Y-%m-%d"));
                    break 'pages;
                }

                tracing::info!("  → Fetching: {}", stub.title);
                let content = self.fetch_post_content(&stub.url, options).await?;
                posts.push(Post::from_stub(stub, date, content));
            }

            page += 1;
        }

        // 單頁內順序不一定單調，最後統一排序
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(posts)
    }

    pub async fn fetch_post_content(&self, url: &str, options: NormalizeOptions) -> Result<String> {
        let html = self.fetcher.fetch_text(url).await?;
        Ok(extract_main_content(&html, options))
    }
}
