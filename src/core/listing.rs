use crate::core::date_extractor::{extract_latest_date, MONTHS};
use crate::domain::model::PostStub;
use crate::utils::error::{DigestError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static POST_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"article[id^="post-"]"#).expect("POST_SELECTOR: hardcoded selector is valid")
});

static HEADER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("header").expect("HEADER_SELECTOR: hardcoded selector is valid")
});

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("LINK_SELECTOR: hardcoded selector is valid"));

// WordPress 主題常把日期連結和標題連結放在同一個 header，連結文字會黏在一起
static TITLE_DATE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    let months = MONTHS.join("|");
    Regex::new(&format!(
        r"(?i)^(?:Posted on )?(?:{months}) \d{{1,2}}, \d{{4}}(?:(?:{months}) \d{{1,2}}, \d{{4}})?"
    ))
    .expect("TITLE_DATE_PREFIX_RE: hardcoded regex is valid")
});

/// 解析一頁文章列表。沒有標題或連結的項目直接略過。
pub fn parse_listing_page(html: &str) -> Vec<PostStub> {
    let document = Html::parse_document(html);

    document
        .select(&POST_SELECTOR)
        .filter_map(|article| match parse_post_container(article) {
            Ok(stub) => Some(stub),
            Err(e) => {
                tracing::debug!("Skipping listing entry: {}", e);
                None
            }
        })
        .collect()
}

fn parse_post_container(article: ElementRef<'_>) -> Result<PostStub> {
    let id = article.value().attr("id").unwrap_or_default();
    let header = article
        .select(&HEADER_SELECTOR)
        .next()
        .ok_or_else(|| DigestError::ParseError {
            message: format!("{}: no header", id),
        })?;
    let links: Vec<ElementRef<'_>> = header.select(&LINK_SELECTOR).collect();

    let raw_title: String = links.iter().flat_map(|link| link.text()).collect();
    let title = clean_title(&raw_title);
    let url = links
        .first()
        .and_then(|link| link.value().attr("href"))
        .map(str::trim)
        .unwrap_or_default();

    if title.is_empty() || url.is_empty() {
        return Err(DigestError::ParseError {
            message: format!("{}: missing title or link", id),
        });
    }

    let date = extract_latest_date(&header.inner_html());
    if date.is_none() {
        tracing::warn!("⚠️ Could not extract date from header: {}", title);
    }

    Ok(PostStub {
        title,
        url: url.to_string(),
        date,
    })
}

/// 去掉標題開頭黏著的日期文字（可能重複兩次，可能帶 "Posted on"）
pub fn clean_title(raw: &str) -> String {
    TITLE_DATE_PREFIX_RE
        .replace(raw.trim(), "")
        .trim()
        .to_string()
}
