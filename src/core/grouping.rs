use crate::domain::model::{Post, PostGroup};
use chrono::NaiveDate;
use std::collections::BTreeMap;

const RULE_WIDTH: usize = 40;

/// 依日曆日期（忽略時間）分組；組與組內文章都是新到舊
pub fn group_posts_by_date(posts: Vec<Post>) -> Vec<PostGroup> {
    let mut buckets: BTreeMap<NaiveDate, Vec<Post>> = BTreeMap::new();
    for post in posts {
        buckets.entry(post.calendar_date()).or_default().push(post);
    }

    buckets
        .into_iter()
        .rev()
        .map(|(date, mut posts)| {
            posts.sort_by(|a, b| b.date.cmp(&a.date));
            PostGroup { date, posts }
        })
        .collect()
}

/// 一天的文章排成純文字區塊，相同輸入必得相同輸出
pub fn format_post_group(group: &PostGroup) -> String {
    let rule = "─".repeat(RULE_WIDTH);
    let date = group.date_key();
    let mut content = String::new();

    let date_line = format!("DATE: {}", date);

    for post in &group.posts {
        let title_line = format!("TITLE: {}", post.title);
        let block = [
            "",
            rule.as_str(),
            date_line.as_str(),
            title_line.as_str(),
            rule.as_str(),
            "",
            post.content.as_str(),
            "",
            "",
        ]
        .join("\n");
        content.push_str(&block);
    }

    content
}
