use chrono::{DateTime, NaiveDate, Utc};

/// 列表頁上的文章摘要，尚未抓取內文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStub {
    pub title: String,
    pub url: String,
    pub date: Option<DateTime<Utc>>,
}

/// 已抓取內文（markdown）的文章
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub title: String,
    pub url: String,
    pub date: DateTime<Utc>,
    pub content: String,
}

impl Post {
    pub fn from_stub(stub: PostStub, date: DateTime<Utc>, content: String) -> Self {
        Self {
            title: stub.title,
            url: stub.url,
            date,
            content,
        }
    }

    pub fn calendar_date(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

/// 同一天的文章，新到舊排序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostGroup {
    pub date: NaiveDate,
    pub posts: Vec<Post>,
}

impl PostGroup {
    /// `YYYY-MM-DD`
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// 執行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Full,
    ScrapeOnly,
    ProcessOnly,
}

/// 一次執行的統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}
